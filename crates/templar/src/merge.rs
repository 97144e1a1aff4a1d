//! Deep merge of JSON values.
//!
//! - objects merge key by key, recursively
//! - arrays concatenate, left items first
//! - anything else: the right-hand side wins

use serde_json::Value;

/// Merges `right` into `left`.
///
/// ```rust
/// use serde_json::json;
/// use templar::deep_merge;
///
/// let mut left = json!({"site": {"name": "a", "tags": ["x"]}, "n": 1});
/// deep_merge(&mut left, json!({"site": {"tags": ["y"]}, "n": 2}));
/// assert_eq!(left, json!({"site": {"name": "a", "tags": ["x", "y"]}, "n": 2}));
/// ```
pub fn deep_merge(left: &mut Value, right: Value) {
    match (left, right) {
        (Value::Object(left), Value::Object(right)) => {
            for (key, value) in right {
                match left.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        left.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(left), Value::Array(right)) => left.extend(right),
        (left, right) => *left = right,
    }
}

/// Merges `right` into a copy of `left`.
pub fn merged(left: &Value, right: &Value) -> Value {
    let mut out = left.clone();
    deep_merge(&mut out, right.clone());
    out
}
