//! Nested path lookup over JSON values
//!
//! Resolves dotted paths such as `Account.BalanceMap.*monetary.0.Value`
//! against a `serde_json::Value`. Object members are addressed by key and
//! array elements by position.

use serde_json::Value;

use crate::error::AppError;
use crate::AppResult;

/// Resolve `path` below `root`
pub fn field_as_value<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> AppResult<&'a Value> {
    let mut current = root;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| AppError::NotFound(path_string(path)))?;
    }
    Ok(current)
}

/// Resolve `path` and render the value as text
pub fn field_as_string<S: AsRef<str>>(root: &Value, path: &[S]) -> AppResult<String> {
    field_as_value(root, path).map(value_to_string)
}

/// Text form of a JSON value: strings raw, null empty, containers as JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn path_string<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Account": {
                "ID": "cgrates.org:1001",
                "BalanceMap": {"*monetary": [{"Value": 10.5}]},
                "Disabled": false
            },
            "Sq": null
        })
    }

    #[test]
    fn test_nested_lookup() {
        let root = sample();
        assert_eq!(
            field_as_string(&root, &["Account", "ID"]).unwrap(),
            "cgrates.org:1001"
        );
        assert_eq!(
            field_as_string(&root, &["Account", "BalanceMap", "*monetary", "0", "Value"]).unwrap(),
            "10.5"
        );
        assert_eq!(field_as_string(&root, &["Account", "Disabled"]).unwrap(), "false");
        assert_eq!(field_as_string(&root, &["Sq"]).unwrap(), "");
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let root = sample();
        let err = field_as_value(&root, &["Account", "Nope"]).unwrap_err();
        assert!(err.is_not_found());
        assert!(field_as_value(&root, &["Sq", "Id"]).is_err());
    }

    #[test]
    fn test_container_renders_as_json() {
        let root = json!({"Set": ["a", "b"]});
        assert_eq!(field_as_string(&root, &["Set"]).unwrap(), r#"["a","b"]"#);
    }
}
