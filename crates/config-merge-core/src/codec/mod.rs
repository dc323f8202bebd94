//! Format codec: text to value and back
//!
//! Every supported format parses into the same [`serde_json::Value`] tree so
//! merge and patch logic never has to care where a value came from.

mod yaml;

use crate::classify::Format;
use crate::{ConfigMergeError, Result};
use serde_json::{Number, Value};

/// Key the toml crate uses to carry datetimes through serde
const TOML_DATETIME_KEY: &str = "$__toml_private_datetime";

/// Largest integer an f64 represents exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Output rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Nesting depth at which YAML collections switch to flow style.
    /// `0` disables flow style.
    pub inline_depth: usize,
    /// Render floats with no fractional part as integers
    pub integral_floats: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            inline_depth: 10,
            integral_floats: true,
        }
    }
}

/// Parse `text` in `format`
pub fn parse(text: &str, format: Format) -> Result<Value> {
    let parse_err = |e: &dyn std::fmt::Display| ConfigMergeError::parse_error(format.name(), e);

    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| parse_err(&e)),
        Format::Json5 => json5::from_str(text).map_err(|e| parse_err(&e)),
        Format::Yaml => {
            if is_blank_yaml(text) {
                return Ok(Value::Null);
            }
            serde_yaml::from_str(text).map_err(|e| parse_err(&e))
        }
        Format::Toml => {
            let mut value: Value = toml::from_str(text).map_err(|e| parse_err(&e))?;
            flatten_toml_datetimes(&mut value);
            Ok(value)
        }
    }
}

/// Render `value` as `format`, always ending with a newline
pub fn serialize(value: &Value, format: Format, options: &SerializeOptions) -> Result<String> {
    let normalized;
    let value = if options.integral_floats {
        let mut copy = value.clone();
        integral_floats_to_integers(&mut copy);
        normalized = copy;
        &normalized
    } else {
        value
    };

    let ser_err = |e: &dyn std::fmt::Display| ConfigMergeError::serialization_error(format.name(), e);

    let mut text = match format {
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| ser_err(&e))?,
        Format::Json5 => json5::to_string(value).map_err(|e| ser_err(&e))?,
        Format::Yaml => yaml::to_yaml(value, options.inline_depth)?,
        Format::Toml => {
            if !value.is_object() {
                return Err(ConfigMergeError::serialization_error(
                    format.name(),
                    "the document root must be a table",
                ));
            }
            if let Some(path) = find_null(value, String::new()) {
                return Err(ConfigMergeError::serialization_error(
                    format.name(),
                    format!("null at '{path}' cannot be represented in TOML"),
                ));
            }
            toml::to_string_pretty(value).map_err(|e| ser_err(&e))?
        }
    };

    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Empty documents, or documents holding only comments and markers
fn is_blank_yaml(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn flatten_toml_datetimes(value: &mut Value) {
    let datetime = match value {
        Value::Object(map) if map.len() == 1 => map
            .get(TOML_DATETIME_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    };
    if let Some(datetime) = datetime {
        *value = Value::String(datetime);
        return;
    }

    match value {
        Value::Object(map) => map.values_mut().for_each(flatten_toml_datetimes),
        Value::Array(items) => items.iter_mut().for_each(flatten_toml_datetimes),
        _ => {}
    }
}

/// JSON Pointer of the first null in `value`, if any
fn find_null(value: &Value, pointer: String) -> Option<String> {
    match value {
        Value::Null => Some(pointer),
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            let token = key.replace('~', "~0").replace('/', "~1");
            find_null(child, format!("{pointer}/{token}"))
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, child)| find_null(child, format!("{pointer}/{index}"))),
        _ => None,
    }
}

fn integral_floats_to_integers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64()
                && n.is_f64()
                && f.fract() == 0.0
                && f.abs() <= MAX_EXACT_INTEGER
            {
                *n = Number::from(f as i64);
            }
        }
        Value::Object(map) => map.values_mut().for_each(integral_floats_to_integers),
        Value::Array(items) => items.iter_mut().for_each(integral_floats_to_integers),
        _ => {}
    }
}
