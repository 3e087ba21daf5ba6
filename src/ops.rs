//! Shared operation wrappers for all interfaces (CLI, plugin).
//!
//! Each `op_*` function is a synchronous wrapper around the planning modules.
//! Input and output are `serde_json::Value` so no front end depends on
//! another's types. Errors are flattened to strings for display.

use std::path::Path;

use serde_json::Value;

use crate::algo::clustering::{group_files, FileEntry};
use crate::algo::misc::{classify_misc, ExtensionMap};
use crate::algo::tokenizer::preprocess;
use crate::apply::apply;
use crate::config::Config;
use crate::plan::{build_plan, FolderPlan, ModelContext};
use crate::tree;

/// Extract a text field from a JSON object, returning "" if missing.
pub fn get_text(row: &Value, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Flatten, read and plan `dir`. Nothing is moved into folders.
///
/// Output: `{root, tree, plan}` where `plan` is the serialized [`FolderPlan`].
pub fn op_plan(dir: &str, config: &Config, models: &ModelContext) -> Result<Value, String> {
    let (plan, preview) = build_plan(Path::new(dir), config, models).map_err(|e| e.to_string())?;
    let plan = serde_json::to_value(&plan).map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "root": dir,
        "tree": preview,
        "plan": plan,
    }))
}

/// Parse a plan from either a bare plan object or an [`op_plan`] result.
pub fn parse_plan(value: &Value) -> Result<FolderPlan, String> {
    let plan = value.get("plan").unwrap_or(value);
    serde_json::from_value(plan.clone()).map_err(|e| format!("Invalid folder plan: {e}"))
}

/// Execute a plan under `dir`, returning the apply report.
pub fn op_apply(dir: &str, plan: &Value) -> Result<Value, String> {
    let plan = parse_plan(plan)?;
    let report = apply(Path::new(dir), &plan).map_err(|e| e.to_string())?;
    serde_json::to_value(report).map_err(|e| e.to_string())
}

/// Render a plan as a tree string below `root_name`.
pub fn op_render(root_name: &str, plan: &Value) -> Result<Value, String> {
    let plan = parse_plan(plan)?;
    Ok(Value::String(tree::render(root_name, &plan)))
}

/// Bucket filenames by extension category.
pub fn op_classify_misc(files: &[String], ext_map: &ExtensionMap) -> Value {
    let buckets = classify_misc(files, ext_map);
    serde_json::to_value(buckets).unwrap_or(Value::Null)
}

/// Group records by text similarity.
///
/// Each row needs a name in `name_field` and text in `field`; text is
/// preprocessed with the configured stop words before embedding. `threshold`
/// is a percentage. Output: one `{representative, members}` object per group.
pub fn op_group(
    rows: &[Value],
    name_field: &str,
    field: &str,
    threshold: u32,
    config: &Config,
    models: &ModelContext,
) -> Result<Value, String> {
    if threshold > 100 {
        return Err(format!("threshold must be between 0 and 100, got {threshold}"));
    }
    let stop_words = config.stop_word_set();
    let entries: Vec<FileEntry> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let name = match get_text(row, name_field) {
                n if n.is_empty() => i.to_string(),
                n => n,
            };
            FileEntry::new(name, preprocess(&get_text(row, field), &stop_words))
        })
        .collect();

    let groups = group_files(&entries, models.embedder.as_ref(), threshold as f64 / 100.0)
        .map_err(|e| e.to_string())?;
    serde_json::to_value(groups).map_err(|e| e.to_string())
}

/// The effective configuration as JSON.
pub fn op_config(config: &Config) -> Value {
    serde_json::to_value(config).unwrap_or(Value::Null)
}
