//! YAML emitter with a flow-style depth threshold
//!
//! Collections nested shallower than the threshold are written in block
//! style; deeper ones are written inline as `{k: v}` / `[a, b]`. Scalar
//! quoting is delegated to serde_yaml so plain/quoted choices match what
//! a YAML parser will read back.

use crate::{ConfigMergeError, Result};
use serde_json::Value;

const INDENT: usize = 2;

/// Characters that end a plain scalar inside a flow collection
const FLOW_INDICATORS: &[char] = &[',', '[', ']', '{', '}'];

pub(super) fn to_yaml(value: &Value, inline_depth: usize) -> Result<String> {
    let emitter = Emitter { inline_depth };
    let mut out = String::new();
    if emitter.is_block(value, 0) {
        emitter.write_block(&mut out, value, 0, 0)?;
    } else {
        out.push_str(&emitter.flow(value)?);
        out.push('\n');
    }
    Ok(out)
}

struct Emitter {
    inline_depth: usize,
}

impl Emitter {
    /// Non-empty collections above the threshold get block style
    fn is_block(&self, value: &Value, depth: usize) -> bool {
        let non_empty = match value {
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => false,
        };
        non_empty && (self.inline_depth == 0 || depth < self.inline_depth)
    }

    fn write_block(
        &self,
        out: &mut String,
        value: &Value,
        depth: usize,
        indent: usize,
    ) -> Result<()> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    pad(out, indent);
                    out.push_str(&scalar_string(key, false)?);
                    out.push(':');
                    if self.is_block(child, depth + 1) {
                        out.push('\n');
                        // sequences under a key are not indented further
                        let child_indent = if child.is_array() {
                            indent
                        } else {
                            indent + INDENT
                        };
                        self.write_block(out, child, depth + 1, child_indent)?;
                    } else {
                        out.push(' ');
                        out.push_str(&self.flow(child)?);
                        out.push('\n');
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    pad(out, indent);
                    out.push_str("- ");
                    if self.is_block(item, depth + 1) {
                        // first line of the nested block shares the dash line
                        let mut nested = String::new();
                        self.write_block(&mut nested, item, depth + 1, indent + INDENT)?;
                        out.push_str(&nested[indent + INDENT..]);
                    } else {
                        out.push_str(&self.flow(item)?);
                        out.push('\n');
                    }
                }
            }
            scalar => {
                out.push_str(&self.flow(scalar)?);
                out.push('\n');
            }
        }
        Ok(())
    }

    fn flow(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok("null".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => scalar_string(s, true),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| self.flow(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            Value::Object(map) => {
                let parts = map
                    .iter()
                    .map(|(key, child)| {
                        Ok(format!("{}: {}", scalar_string(key, true)?, self.flow(child)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
        }
    }
}

/// Render a string scalar on a single line
fn scalar_string(s: &str, in_flow: bool) -> Result<String> {
    let rendered = serde_yaml::to_string(s)
        .map_err(|e| ConfigMergeError::serialization_error("yaml", e))?;
    let rendered = rendered.trim_end_matches('\n');

    let needs_json_quotes = rendered.contains('\n')
        || (in_flow && !is_quoted(rendered) && s.contains(FLOW_INDICATORS));
    if needs_json_quotes {
        // a JSON string is a valid double-quoted YAML scalar
        return serde_json::to_string(s)
            .map_err(|e| ConfigMergeError::serialization_error("yaml", e));
    }
    Ok(rendered.to_string())
}

fn is_quoted(rendered: &str) -> bool {
    rendered.starts_with('\'') || rendered.starts_with('"')
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}
