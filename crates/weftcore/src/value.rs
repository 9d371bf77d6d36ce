//! Coercion helpers for the loosely typed JSON values that flow along edges.

use serde_json::Value;

/// Render a value the way it would read inside a prompt or URL: strings
/// unquoted, everything else as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric cast in the loose sense: numbers pass through, numeric strings
/// parse, booleans map to 0/1.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Resolve a dotted path ("user.profile.name") into a value. An empty path
/// yields the value itself; a missing or non-object segment yields None.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringify_leaves_strings_unquoted() {
        assert_eq!(stringify(&json!("hello")), "hello");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn coerce_f64_parses_numeric_strings() {
        assert_eq!(coerce_f64(&json!("3.5")), Some(3.5));
        assert_eq!(coerce_f64(&json!(7)), Some(7.0));
        assert_eq!(coerce_f64(&json!("abc")), None);
    }

    #[test]
    fn resolve_path_walks_nested_objects() {
        let value = json!({"user": {"profile": {"name": "Ada"}}});
        assert_eq!(
            resolve_path(&value, "user.profile.name"),
            Some(&json!("Ada"))
        );
        assert_eq!(resolve_path(&value, "user.missing.name"), None);
        assert_eq!(resolve_path(&value, ""), Some(&value));
    }

    #[test]
    fn resolve_path_fails_through_non_objects() {
        let value = json!({"list": [1, 2, 3]});
        assert_eq!(resolve_path(&value, "list.0"), None);
    }
}
