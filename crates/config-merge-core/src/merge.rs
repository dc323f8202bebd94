//! Deep merge of configuration values
//!
//! Merge semantics:
//! - Objects: deep-merge by key (recursive)
//! - Arrays: governed by [`ArrayMergePolicy`]
//! - Scalars and mismatched kinds: incoming wins
//! - Null: a value like any other, it replaces what was there

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How two arrays at the same location are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMergePolicy {
    /// Merge element-wise by index, keeping the tail of the longer array
    #[default]
    Deep,
    /// Incoming array replaces the base array
    Overwrite,
    /// Base elements followed by incoming elements
    Concat,
}

impl FromStr for ArrayMergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" | "deep" => Ok(ArrayMergePolicy::Deep),
            "overwrite" => Ok(ArrayMergePolicy::Overwrite),
            "concat" => Ok(ArrayMergePolicy::Concat),
            other => Err(format!(
                "Array merge policy should be \"merge\", \"overwrite\", or \"concat\", invalid: {other}"
            )),
        }
    }
}

impl fmt::Display for ArrayMergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArrayMergePolicy::Deep => "merge",
            ArrayMergePolicy::Overwrite => "overwrite",
            ArrayMergePolicy::Concat => "concat",
        })
    }
}

/// Deep merge `incoming` into `base` in place.
///
/// Never fails: any two values are mergeable. Keys only present in `base`
/// are kept; conflicting scalars take the incoming value.
pub fn deep_merge(base: &mut Value, incoming: Value, policy: ArrayMergePolicy) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, incoming_value, policy),
                    None => {
                        base_map.insert(key, incoming_value);
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(incoming_items)) => {
            merge_arrays(base_items, incoming_items, policy);
        }
        (slot, incoming) => *slot = incoming,
    }
}

fn merge_arrays(base: &mut Vec<Value>, incoming: Vec<Value>, policy: ArrayMergePolicy) {
    match policy {
        ArrayMergePolicy::Overwrite => *base = incoming,
        ArrayMergePolicy::Concat => base.extend(incoming),
        ArrayMergePolicy::Deep => {
            let shared = base.len().min(incoming.len());
            let mut incoming = incoming.into_iter();
            for (slot, item) in base.iter_mut().zip(incoming.by_ref().take(shared)) {
                deep_merge(slot, item, policy);
            }
            base.extend(incoming);
        }
    }
}
