use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{json_to_nu, load_models, resolve_config, shell_path};
use crate::ops;
use crate::FoldersPlugin;

pub struct Plan;

impl PluginCommand for Plan {
    type Plugin = FoldersPlugin;

    fn name(&self) -> &str {
        "folders plan"
    }

    fn description(&self) -> &str {
        "Flatten a directory and plan topic-named folders for its files (no files are sorted yet)"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::Nothing, Type::record())
            .required("path", SyntaxShape::Directory, "Directory to organize")
            .named(
                "threshold",
                SyntaxShape::Int,
                "Similarity threshold in percent (default: 50)",
                Some('t'),
            )
            .named(
                "reading-limit",
                SyntaxShape::Int,
                "Words read from each file (default: 200)",
                Some('r'),
            )
            .named(
                "folder-words",
                SyntaxShape::Int,
                "Words per folder name (default: 3)",
                Some('w'),
            )
            .named(
                "config",
                SyntaxShape::Filepath,
                "Path to a JSON config file",
                Some('c'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["organize", "folders", "group", "topics", "sort", "preview"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "folders plan ~/Downloads",
                description: "Plan folders for Downloads and show the tree",
                result: None,
            },
            Example {
                example: "folders plan ~/Downloads --threshold 70 | get tree",
                description: "Preview a stricter grouping",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &FoldersPlugin,
        engine: &EngineInterface,
        call: &EvaluatedCall,
        _input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let path: String = call.req(0)?;
        let path = shell_path(engine, &path)?.display().to_string();
        let config = resolve_config(engine, call)?;
        let models = load_models(&config)?;
        let head = call.head;

        match ops::op_plan(&path, &config, &models) {
            Ok(json_val) => Ok(PipelineData::Value(json_to_nu(&json_val, head), None)),
            Err(e) => Err(LabeledError::new(e)),
        }
    }
}
