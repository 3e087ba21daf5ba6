use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, LabeledError, PipelineData, Signature, SyntaxShape, Type, Value};

use super::util::{input_value, nu_to_json};
use crate::ops;
use crate::FoldersPlugin;

pub struct Render;

impl PluginCommand for Render {
    type Plugin = FoldersPlugin;

    fn name(&self) -> &str {
        "folders render"
    }

    fn description(&self) -> &str {
        "Render a folder plan as a tree"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::record(), Type::String)
            .named(
                "root",
                SyntaxShape::String,
                "Name printed on the first line (default: the plan's root or '.')",
                None,
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["tree", "preview", "show"]
    }

    fn run(
        &self,
        _plugin: &FoldersPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let head = call.head;
        let plan = nu_to_json(&input_value(input, head))?;
        let root = call.get_flag::<String>("root")?.unwrap_or_else(|| {
            plan.get("root")
                .and_then(|v| v.as_str())
                .unwrap_or(".")
                .to_string()
        });

        match ops::op_render(&root, &plan) {
            Ok(tree) => Ok(PipelineData::Value(
                Value::string(tree.as_str().unwrap_or_default(), head),
                None,
            )),
            Err(e) => Err(LabeledError::new(e)),
        }
    }
}
