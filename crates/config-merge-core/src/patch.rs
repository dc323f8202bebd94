//! JSON Patch (RFC 6902) application over the accumulator
//!
//! A patch document is an ordered array of operations. Operations run in
//! document order against the live value, so each operation sees the
//! effects of the ones before it. The first failing operation aborts the
//! document; operations applied before it stay applied.

use crate::error::PatchError;
use crate::{ConfigMergeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// A single patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

impl PatchOperation {
    /// Target pointer of the operation
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Move { path, .. }
            | PatchOperation::Copy { path, .. }
            | PatchOperation::Test { path, .. } => path,
        }
    }
}

/// Validate a parsed document as an array of patch operations
pub fn parse_patch_document(document: Value) -> Result<Vec<PatchOperation>> {
    let Value::Array(items) = document else {
        return Err(ConfigMergeError::malformed_patch(
            "patch document must be a top-level array of operations",
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                ConfigMergeError::malformed_patch(format!("operation #{index}: {e}"))
            })
        })
        .collect()
}

/// Parse and apply a patch document to `target`
pub fn apply_patch_document(target: &mut Value, document: Value) -> Result<()> {
    let operations = parse_patch_document(document)?;
    apply_patch(target, &operations)?;
    Ok(())
}

/// Apply operations to `target` strictly in order
pub fn apply_patch(
    target: &mut Value,
    operations: &[PatchOperation],
) -> std::result::Result<(), PatchError> {
    for operation in operations {
        trace!("Applying patch operation at '{}': {:?}", operation.path(), operation);
        apply_operation(target, operation)?;
    }
    Ok(())
}

fn apply_operation(
    target: &mut Value,
    operation: &PatchOperation,
) -> std::result::Result<(), PatchError> {
    match operation {
        PatchOperation::Add { path, value } => add(target, path, value.clone()),
        PatchOperation::Remove { path } => remove(target, path).map(|_| ()),
        PatchOperation::Replace { path, value } => replace(target, path, value.clone()),
        PatchOperation::Move { from, path } => move_value(target, from, path),
        PatchOperation::Copy { from, path } => {
            let tokens = parse_pointer(from)?;
            let value = lookup(target, &tokens)
                .cloned()
                .ok_or_else(|| not_found(from))?;
            add(target, path, value)
        }
        PatchOperation::Test { path, value } => {
            let tokens = parse_pointer(path)?;
            let actual = lookup(target, &tokens).ok_or_else(|| not_found(path))?;
            if deep_equal(actual, value) {
                Ok(())
            } else {
                Err(PatchError::TestFailed {
                    path: path.clone(),
                    expected: value.clone(),
                    actual: actual.clone(),
                })
            }
        }
    }
}

fn add(target: &mut Value, path: &str, value: Value) -> std::result::Result<(), PatchError> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        *target = value;
        return Ok(());
    };

    match lookup_mut(target, parents) {
        Some(Value::Object(map)) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Some(Value::Array(items)) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            match parse_index(last) {
                Some(index) if index <= items.len() => {
                    items.insert(index, value);
                    Ok(())
                }
                _ => Err(not_found(path)),
            }
        }
        _ => Err(not_found(path)),
    }
}

fn remove(target: &mut Value, path: &str) -> std::result::Result<Value, PatchError> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Ok(std::mem::take(target));
    };

    match lookup_mut(target, parents) {
        Some(Value::Object(map)) => map.shift_remove(last).ok_or_else(|| not_found(path)),
        Some(Value::Array(items)) => match parse_index(last) {
            Some(index) if index < items.len() => Ok(items.remove(index)),
            _ => Err(not_found(path)),
        },
        _ => Err(not_found(path)),
    }
}

fn replace(target: &mut Value, path: &str, value: Value) -> std::result::Result<(), PatchError> {
    let tokens = parse_pointer(path)?;
    let slot = lookup_mut(target, &tokens).ok_or_else(|| not_found(path))?;
    *slot = value;
    Ok(())
}

fn move_value(target: &mut Value, from: &str, path: &str) -> std::result::Result<(), PatchError> {
    let from_tokens = parse_pointer(from)?;
    let path_tokens = parse_pointer(path)?;

    if lookup(target, &from_tokens).is_none() {
        return Err(not_found(from));
    }
    if from_tokens == path_tokens {
        return Ok(());
    }
    if path_tokens.starts_with(&from_tokens) {
        return Err(PatchError::InvalidMove {
            from: from.to_string(),
            path: path.to_string(),
        });
    }

    let value = remove(target, from)?;
    if let Err(err) = add(target, path, value.clone()) {
        // put the value back where it came from before reporting
        add(target, from, value)?;
        return Err(err);
    }
    Ok(())
}

/// Split an RFC 6901 pointer into unescaped reference tokens
pub fn parse_pointer(pointer: &str) -> std::result::Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(invalid_pointer(pointer));
    };

    rest.split('/')
        .map(|token| unescape_token(token).ok_or_else(|| invalid_pointer(pointer)))
        .collect()
}

fn unescape_token(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Array index token: decimal digits without leading zeros
fn parse_index(token: &str) -> Option<usize> {
    let valid = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if valid { token.parse().ok() } else { None }
}

fn child<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, token: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => parse_index(token).and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

fn lookup<'a>(root: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    tokens.iter().try_fold(root, |node, token| child(node, token))
}

fn lookup_mut<'a>(root: &'a mut Value, tokens: &[String]) -> Option<&'a mut Value> {
    tokens.iter().try_fold(root, |node, token| child_mut(node, token))
}

/// Structural equality where `1` and `1.0` compare equal
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => left == right,
    }
}

fn not_found(path: &str) -> PatchError {
    PatchError::PathNotFound {
        path: path.to_string(),
    }
}

fn invalid_pointer(pointer: &str) -> PatchError {
    PatchError::InvalidPointer {
        pointer: pointer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn ops(document: Value) -> Vec<PatchOperation> {
        parse_patch_document(document).unwrap()
    }

    fn patched(mut target: Value, document: Value) -> Value {
        apply_patch(&mut target, &ops(document)).unwrap();
        target
    }

    fn patch_err(mut target: Value, document: Value) -> (Value, PatchError) {
        let err = apply_patch(&mut target, &ops(document)).unwrap_err();
        (target, err)
    }

    #[test]
    fn test_add_into_object() {
        let result = patched(
            json!({"a": {}}),
            json!([{"op": "add", "path": "/a/b", "value": {"c": 1}}]),
        );
        assert_eq!(result, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_add_overwrites_existing_member() {
        let result = patched(
            json!({"a": 1}),
            json!([{"op": "add", "path": "/a", "value": 2}]),
        );
        assert_eq!(result, json!({"a": 2}));
    }

    #[test]
    fn test_add_into_array_shifts_and_appends() {
        let result = patched(
            json!({"list": [1, 3]}),
            json!([
                {"op": "add", "path": "/list/1", "value": 2},
                {"op": "add", "path": "/list/-", "value": 4},
                {"op": "add", "path": "/list/4", "value": 5}
            ]),
        );
        assert_eq!(result, json!({"list": [1, 2, 3, 4, 5]}));
    }

    #[test]
    fn test_add_out_of_bounds_fails() {
        let (_, err) = patch_err(
            json!({"list": [1]}),
            json!([{"op": "add", "path": "/list/5", "value": 2}]),
        );
        assert!(matches!(err, PatchError::PathNotFound { .. }));
    }

    #[test]
    fn test_add_with_missing_parent_fails() {
        let (_, err) = patch_err(
            json!({}),
            json!([{"op": "add", "path": "/a/b", "value": 1}]),
        );
        assert_eq!(
            err,
            PatchError::PathNotFound {
                path: "/a/b".to_string()
            }
        );
    }

    #[test]
    fn test_add_at_root_replaces_document() {
        let result = patched(
            json!({"a": 1}),
            json!([{"op": "add", "path": "", "value": [1]}]),
        );
        assert_eq!(result, json!([1]));
    }

    #[test]
    fn test_remove() {
        let result = patched(
            json!({"a": {"b": 1}, "list": [1, 2, 3]}),
            json!([
                {"op": "remove", "path": "/a/b"},
                {"op": "remove", "path": "/list/0"}
            ]),
        );
        assert_eq!(result, json!({"a": {}, "list": [2, 3]}));
    }

    #[test]
    fn test_remove_keeps_member_order() {
        let result = patched(
            json!({"x": 1, "y": 2, "z": 3}),
            json!([{"op": "remove", "path": "/x"}]),
        );
        let keys: Vec<_> = result.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["y", "z"]);
    }

    #[test]
    fn test_remove_missing_fails() {
        let (_, err) = patch_err(json!({"a": {}}), json!([{"op": "remove", "path": "/a/b"}]));
        assert!(matches!(err, PatchError::PathNotFound { .. }));
        let (_, err) = patch_err(json!({"l": [1]}), json!([{"op": "remove", "path": "/l/-"}]));
        assert!(matches!(err, PatchError::PathNotFound { .. }));
    }

    #[test]
    fn test_replace() {
        let result = patched(
            json!({"a": 1, "b": [1, 2]}),
            json!([
                {"op": "replace", "path": "/a", "value": 2},
                {"op": "replace", "path": "/b/1", "value": 9}
            ]),
        );
        assert_eq!(result, json!({"a": 2, "b": [1, 9]}));
    }

    #[test]
    fn test_replace_requires_existing_path() {
        let (_, err) = patch_err(
            json!({"a": 1}),
            json!([{"op": "replace", "path": "/b", "value": 2}]),
        );
        assert!(matches!(err, PatchError::PathNotFound { .. }));
    }

    #[test]
    fn test_move() {
        let result = patched(
            json!({"a": {"b": 1}, "c": {}}),
            json!([{"op": "move", "from": "/a/b", "path": "/c/d"}]),
        );
        assert_eq!(result, json!({"a": {}, "c": {"d": 1}}));
    }

    #[test]
    fn test_move_within_array() {
        let result = patched(
            json!([1, 2, 3]),
            json!([{"op": "move", "from": "/0", "path": "/2"}]),
        );
        assert_eq!(result, json!([2, 3, 1]));
    }

    #[test]
    fn test_move_into_descendant_fails() {
        let (target, err) = patch_err(
            json!({"a": {"b": {}}}),
            json!([{"op": "move", "from": "/a", "path": "/a/b/c"}]),
        );
        assert!(matches!(err, PatchError::InvalidMove { .. }));
        assert_eq!(target, json!({"a": {"b": {}}}));
    }

    #[test]
    fn test_move_to_sibling_with_shared_prefix_is_allowed() {
        let result = patched(
            json!({"a": 1}),
            json!([{"op": "move", "from": "/a", "path": "/ab"}]),
        );
        assert_eq!(result, json!({"ab": 1}));
    }

    #[test]
    fn test_move_missing_source_fails() {
        let (_, err) = patch_err(
            json!({}),
            json!([{"op": "move", "from": "/x", "path": "/y"}]),
        );
        assert_eq!(
            err,
            PatchError::PathNotFound {
                path: "/x".to_string()
            }
        );
    }

    #[test]
    fn test_failed_move_restores_source() {
        let (target, err) = patch_err(
            json!({"list": [1, 2]}),
            json!([{"op": "move", "from": "/list/0", "path": "/missing/x"}]),
        );
        assert!(matches!(err, PatchError::PathNotFound { .. }));
        assert_eq!(target, json!({"list": [1, 2]}));
    }

    #[test]
    fn test_copy_is_deep() {
        let result = patched(
            json!({"a": {"b": [1]}}),
            json!([
                {"op": "copy", "from": "/a", "path": "/c"},
                {"op": "add", "path": "/c/b/-", "value": 2}
            ]),
        );
        assert_eq!(result, json!({"a": {"b": [1]}, "c": {"b": [1, 2]}}));
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let (target, err) = patch_err(
            json!({"a": 1}),
            json!([{"op": "copy", "from": "/nope", "path": "/b"}]),
        );
        assert_eq!(
            err,
            PatchError::PathNotFound {
                path: "/nope".to_string()
            }
        );
        assert_eq!(target, json!({"a": 1}));
    }

    #[test]
    fn test_test_on_missing_path_fails() {
        let (_, err) = patch_err(
            json!({"a": {"b": 1}}),
            json!([{"op": "test", "path": "/a/c", "value": 1}]),
        );
        assert_eq!(
            err,
            PatchError::PathNotFound {
                path: "/a/c".to_string()
            }
        );
    }

    #[test]
    fn test_test_operation() {
        let result = patched(
            json!({"a": {"b": [1, 2]}, "n": 1}),
            json!([
                {"op": "test", "path": "/a", "value": {"b": [1, 2]}},
                {"op": "test", "path": "/n", "value": 1.0}
            ]),
        );
        assert_eq!(result, json!({"a": {"b": [1, 2]}, "n": 1}));
    }

    #[test]
    fn test_failed_test_stops_later_operations() {
        let (target, err) = patch_err(
            json!({"a": 1}),
            json!([
                {"op": "add", "path": "/b", "value": 2},
                {"op": "test", "path": "/a", "value": 5},
                {"op": "add", "path": "/c", "value": 3}
            ]),
        );
        assert_eq!(
            err,
            PatchError::TestFailed {
                path: "/a".to_string(),
                expected: json!(5),
                actual: json!(1),
            }
        );
        assert_eq!(target, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_pointer_escapes() {
        assert_eq!(
            parse_pointer("/a~1b/c~0d/~01").unwrap(),
            vec!["a/b", "c~d", "~1"]
        );
        assert_eq!(parse_pointer("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_pointer("/").unwrap(), vec![""]);
        assert!(parse_pointer("a/b").is_err());
        assert!(parse_pointer("/a~2").is_err());
    }

    #[test]
    fn test_escaped_member_names() {
        let result = patched(
            json!({"a/b": 1}),
            json!([{"op": "replace", "path": "/a~1b", "value": 2}]),
        );
        assert_eq!(result, json!({"a/b": 2}));
    }

    #[test]
    fn test_leading_zero_index_is_not_found() {
        let (_, err) = patch_err(
            json!({"l": [1, 2]}),
            json!([{"op": "replace", "path": "/l/01", "value": 3}]),
        );
        assert!(matches!(err, PatchError::PathNotFound { .. }));
    }

    #[test]
    fn test_document_must_be_array() {
        let err = parse_patch_document(json!({"op": "add", "path": "/a", "value": 1}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPatch);
    }

    #[test]
    fn test_unknown_operation_is_malformed() {
        let err = parse_patch_document(json!([{"op": "merge", "path": "/a"}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPatch);
        let err = parse_patch_document(json!([{"op": "add", "path": "/a"}])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPatch);
    }

    #[test]
    fn test_apply_patch_document_reports_patch_errors() {
        let mut target = json!({});
        let err = apply_patch_document(
            &mut target,
            json!([{"op": "remove", "path": "/missing"}]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Patch);
    }
}
