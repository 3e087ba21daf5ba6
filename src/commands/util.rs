use std::path::{Path, PathBuf};

use nu_plugin::{EngineInterface, EvaluatedCall};
use nu_protocol::{LabeledError, PipelineData, Record, Span, Value};

use crate::config::{self, Config};
use crate::plan::ModelContext;

/// A path argument as the user meant it: relative paths are taken from the
/// shell's current directory, not from the plugin process's.
pub fn shell_path(engine: &EngineInterface, path: &str) -> Result<PathBuf, LabeledError> {
    if Path::new(path).is_absolute() {
        return Ok(Path::new(path).components().collect());
    }
    let cwd = engine.get_current_dir()?;
    Ok(join_relative(Path::new(&cwd), path))
}

/// `cwd/path` without `.` components.
fn join_relative(cwd: &Path, path: &str) -> PathBuf {
    cwd.join(path).components().collect()
}

/// Resolve the configuration for a call: `--config <path>` if given (errors
/// reported), otherwise the usual env/XDG/embedded lookup. Parameter flags
/// present on the call override the file.
pub fn resolve_config(engine: &EngineInterface, call: &EvaluatedCall) -> Result<Config, LabeledError> {
    let mut config = match call.get_flag::<String>("config")? {
        Some(path) => config::load_config(&shell_path(engine, &path)?).map_err(|e| LabeledError::new(e.to_string()))?,
        None => config::default_config(),
    };

    if let Some(threshold) = get_count(call, "threshold")? {
        config.parameters.similarity_threshold = threshold as u32;
    }
    if let Some(limit) = get_count(call, "reading-limit")? {
        config.parameters.reading_word_limit = limit;
    }
    if let Some(words) = get_count(call, "folder-words")? {
        config.parameters.folder_word_limit = words;
    }
    config
        .parameters
        .validate()
        .map_err(|e| LabeledError::new(e.to_string()))?;
    Ok(config)
}

/// Read a non-negative integer flag.
fn get_count(call: &EvaluatedCall, name: &str) -> Result<Option<usize>, LabeledError> {
    match call.get_flag::<i64>(name)? {
        Some(n) if n < 0 => Err(LabeledError::new(format!("--{name} must not be negative"))),
        Some(n) => Ok(Some(n as usize)),
        None => Ok(None),
    }
}

pub fn load_models(config: &Config) -> Result<ModelContext, LabeledError> {
    ModelContext::from_settings(config.model.clone()).map_err(|e| LabeledError::new(e.to_string()))
}

/// Collect pipeline input into a single value: a lone value passes through,
/// a stream becomes a list.
pub fn input_value(input: PipelineData, span: Span) -> Value {
    match input {
        PipelineData::Value(value, _) => value,
        other => Value::list(other.into_iter().collect(), span),
    }
}

/// Normalize any PipelineData into a Vec<Value> of records.
///
/// Handles:
///   - Table (list of records) → pass through
///   - Single record → [record]
///   - List of strings → [{content: s1}, {content: s2}, ...]
///   - Single string → [{content: s}]
///   - Empty/Nothing → []
pub fn normalize_input(input: PipelineData, span: Span) -> Vec<Value> {
    match input_value(input, span) {
        Value::List { vals, .. } => vals.into_iter().map(|v| wrap_value(v, span)).collect(),
        Value::Nothing { .. } => vec![],
        other => vec![wrap_value(other, span)],
    }
}

/// Wrap a non-record value into a record.
/// Strings get `{content: s}`, everything else gets `{value: v}`.
fn wrap_value(v: Value, span: Span) -> Value {
    if matches!(v, Value::Record { .. }) {
        return v;
    }
    let mut record = Record::new();
    match &v {
        Value::String { .. } => record.push("content", v),
        _ => record.push("value", v),
    }
    Value::record(record, span)
}

/// Convert a serde_json::Value to a nu_protocol::Value
pub fn json_to_nu(val: &serde_json::Value, span: Span) -> Value {
    match val {
        serde_json::Value::Null => Value::nothing(span),
        serde_json::Value::Bool(b) => Value::bool(*b, span),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::int(i, span)
            } else if let Some(f) = n.as_f64() {
                Value::float(f, span)
            } else {
                Value::string(n.to_string(), span)
            }
        }
        serde_json::Value::String(s) => Value::string(s, span),
        serde_json::Value::Array(arr) => {
            Value::list(arr.iter().map(|v| json_to_nu(v, span)).collect(), span)
        }
        serde_json::Value::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.push(k, json_to_nu(v, span));
            }
            Value::record(record, span)
        }
    }
}

/// Convert a nu_protocol::Value to a serde_json::Value
pub fn nu_to_json(val: &Value) -> Result<serde_json::Value, LabeledError> {
    Ok(match val {
        Value::Nothing { .. } => serde_json::Value::Null,
        Value::Bool { val, .. } => serde_json::Value::Bool(*val),
        Value::Int { val, .. } => serde_json::json!(val),
        Value::Float { val, .. } => serde_json::json!(val),
        Value::String { val, .. } => serde_json::Value::String(val.clone()),
        Value::List { vals, .. } => {
            serde_json::Value::Array(vals.iter().map(nu_to_json).collect::<Result<_, _>>()?)
        }
        Value::Record { val, .. } => {
            let mut map = serde_json::Map::new();
            for (k, v) in val.iter() {
                map.insert(k.clone(), nu_to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
        other => {
            return Err(LabeledError::new(format!(
                "Unsupported value of type {}",
                other.get_type()
            )))
        }
    })
}

/// Filenames from a list of strings or a table with a `name` column.
pub fn file_names(value: &Value) -> Result<Vec<String>, LabeledError> {
    let items = match value {
        Value::List { vals, .. } => vals.as_slice(),
        Value::Nothing { .. } => &[],
        single => std::slice::from_ref(single),
    };
    items
        .iter()
        .map(|item| match item {
            Value::String { val, .. } => Ok(val.clone()),
            Value::Record { val, .. } => val
                .get("name")
                .and_then(|v| v.coerce_str().ok())
                .map(|s| s.into_owned())
                .ok_or_else(|| LabeledError::new("Record input needs a 'name' column")),
            other => Err(LabeledError::new(format!(
                "Expected filenames, got {}",
                other.get_type()
            ))),
        })
        .collect()
}
