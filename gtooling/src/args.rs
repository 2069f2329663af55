//! JSON argument parsing and schema `required` checks.
//!
//! ```rust
//! use gtooling::{check_required, parse_json_object};
//!
//! let schema = serde_json::json!({"type":"object","required":["query"]});
//! let args = parse_json_object(r#"{"query":"rust"}"#).expect("object should parse");
//! assert!(check_required(&schema, &args).is_ok());
//! ```

use serde_json::{Map, Value};

use crate::ToolError;

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

/// Empty argument text is read as `{}`; some models send it for parameterless tools.
pub fn parse_json_object(args_json: &str) -> Result<Map<String, Value>, ToolError> {
    if args_json.trim().is_empty() {
        return Ok(Map::new());
    }

    let value = parse_json_value(args_json)?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| ToolError::invalid_arguments("expected JSON object arguments"))
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

/// Fails when any property listed in the schema's top-level `required` array is absent.
pub fn check_required(schema: &Value, args: &Map<String, Value>) -> Result<(), ToolError> {
    let missing = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|key| !args.contains_key(*key))
        .collect::<Vec<_>>();

    if missing.is_empty() {
        return Ok(());
    }

    Err(ToolError::invalid_arguments(format!(
        "missing required argument(s): {}",
        missing.join(", ")
    )))
}
