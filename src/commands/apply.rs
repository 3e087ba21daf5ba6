use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{input_value, json_to_nu, nu_to_json, shell_path};
use crate::ops;
use crate::FoldersPlugin;

pub struct Apply;

impl PluginCommand for Apply {
    type Plugin = FoldersPlugin;

    fn name(&self) -> &str {
        "folders apply"
    }

    fn description(&self) -> &str {
        "Move files into the folders of a plan produced by `folders plan`"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::record(), Type::record())
            .optional(
                "path",
                SyntaxShape::Directory,
                "Directory the plan was built for (default: the plan's root)",
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["organize", "move", "execute", "commit"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: "folders plan ~/Downloads | folders apply",
            description: "Plan and immediately sort Downloads",
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
        let head = call.head;
        let plan = nu_to_json(&input_value(input, head))?;

        let root = match call.opt::<String>(0)? {
            Some(path) => path,
            None => plan
                .get("root")
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| LabeledError::new("No path given and the plan has no 'root'"))?,
        };
        let root = shell_path(engine, &root)?.display().to_string();

        match ops::op_apply(&root, &plan) {
            Ok(json_val) => Ok(PipelineData::Value(json_to_nu(&json_val, head), None)),
            Err(e) => Err(LabeledError::new(e)),
        }
    }
}
