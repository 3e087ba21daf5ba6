use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{json_to_nu, load_models, normalize_input, nu_to_json, resolve_config};
use crate::ops;
use crate::FoldersPlugin;

pub struct Group;

impl PluginCommand for Group {
    type Plugin = FoldersPlugin;

    fn name(&self) -> &str {
        "folders group"
    }

    fn description(&self) -> &str {
        "Group rows by text similarity, the way folders are formed"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_types(vec![
                (Type::table(), Type::table()),
                (Type::List(Box::new(Type::String)), Type::table()),
            ])
            .named(
                "field",
                SyntaxShape::String,
                "Field containing text (default: content)",
                Some('f'),
            )
            .named(
                "name-field",
                SyntaxShape::String,
                "Field naming each row (default: name, falls back to row index)",
                Some('n'),
            )
            .named(
                "threshold",
                SyntaxShape::Int,
                "Similarity threshold in percent (default: 50)",
                Some('t'),
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
        vec!["similar", "cluster", "group", "embedding"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"[[name content]; [a "alpha beta"] [b "alpha beta gamma"] [c "other"]] | folders group"#,
            description: "Group near-duplicate rows",
            result: None,
        }]
    }

    fn run(
        &self,
        _plugin: &FoldersPlugin,
        engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let field: String = call
            .get_flag::<String>("field")?
            .unwrap_or_else(|| "content".into());
        let name_field: String = call
            .get_flag::<String>("name-field")?
            .unwrap_or_else(|| "name".into());
        let head = call.head;
        let config = resolve_config(engine, call)?;
        let models = load_models(&config)?;

        let rows = normalize_input(input, head)
            .iter()
            .map(nu_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        match ops::op_group(
            &rows,
            &name_field,
            &field,
            config.parameters.similarity_threshold,
            &config,
            &models,
        ) {
            Ok(json_val) => Ok(PipelineData::Value(json_to_nu(&json_val, head), None)),
            Err(e) => Err(LabeledError::new(e)),
        }
    }
}
