use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{file_names, input_value, json_to_nu, resolve_config};
use crate::ops;
use crate::FoldersPlugin;

pub struct Misc;

impl PluginCommand for Misc {
    type Plugin = FoldersPlugin;

    fn name(&self) -> &str {
        "folders misc"
    }

    fn description(&self) -> &str {
        "Bucket filenames by extension category"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_types(vec![
                (Type::List(Box::new(Type::String)), Type::record()),
                (Type::table(), Type::record()),
            ])
            .named(
                "config",
                SyntaxShape::Filepath,
                "Path to a JSON config file with an extension_map",
                Some('c'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["extension", "category", "bucket", "misc"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: r#"["photo.jpg" "song.mp3" "model.stl"] | folders misc"#,
                description: "Bucket three files by extension",
                result: None,
            },
            Example {
                example: "ls | where type == file | folders misc",
                description: "Bucket the files of the current directory",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &FoldersPlugin,
        engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let head = call.head;
        let config = resolve_config(engine, call)?;
        let files = file_names(&input_value(input, head))?;

        let buckets = ops::op_classify_misc(&files, &config.extension_map);
        Ok(PipelineData::Value(json_to_nu(&buckets, head), None))
    }
}
