//! Deep merge for partial settings records.
//!
//! Every source in the pipeline (file, environment, CLI overrides) produces a
//! partial `serde_json::Value` object containing only the keys that source actually
//! provided. Merging is therefore unambiguous: a key that is absent (or null) was
//! not provided and the base value survives; a key that is present always wins,
//! including an explicit boolean `false`. Map-valued fields like keybindings union
//! key-by-key because they are plain objects. Arrays are replaced entirely.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not provided")
///
/// Pure function: inputs are consumed by value, neither is mutated in place, and
/// merging an overlay that is a subset of base is a no-op.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge multiple partial records in precedence order, later values winning.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

/// Look up a dotted path (`colorScheme.border`) in a record.
pub fn value_at<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Set a dotted path in a record, creating intermediate objects as needed.
///
/// A non-object intermediate is replaced by an object; the last writer wins, same
/// as the merge rule.
pub fn set_value_at(record: &mut Value, path: &str, value: Value) {
    let mut current = record;
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(segments[segments.len() - 1].to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_simple_objects() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let base = json!({
            "timeouts": {"networkRequest": 30000, "dotnetCommand": 120000},
            "theme": "dark"
        });
        let overlay = json!({
            "timeouts": {"networkRequest": 5000}
        });
        let result = deep_merge(base, overlay);
        assert_eq!(
            result,
            json!({
                "timeouts": {"networkRequest": 5000, "dotnetCommand": 120000},
                "theme": "dark"
            })
        );
    }

    #[test]
    fn test_explicit_false_overwrites() {
        // A boolean the override actually provides always wins, even when false.
        let base = json!({"hotReload": true});
        let overlay = json!({"hotReload": false});
        assert_eq!(deep_merge(base, overlay), json!({"hotReload": false}));
    }

    #[test]
    fn test_absent_boolean_preserves_base() {
        // A source that never mentions the field cannot lower it to false.
        let base = json!({"hotReload": true, "ui": {"showStatusBar": true}});
        let overlay = json!({"ui": {"pageSize": 25}});
        let result = deep_merge(base, overlay);
        assert_eq!(result["hotReload"], json!(true));
        assert_eq!(result["ui"]["showStatusBar"], json!(true));
        assert_eq!(result["ui"]["pageSize"], json!(25));
    }

    #[test]
    fn test_null_preserves_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": {"c": null}});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_keybindings_union_by_key() {
        let base = json!({"keybindings": {
            "quit": {"key": "q", "context": "global"},
            "help": {"key": "?", "context": "global"}
        }});
        let overlay = json!({"keybindings": {
            "quit": {"key": "x", "context": "global"},
            "search": {"key": "/", "context": "packages"}
        }});
        let result = deep_merge(base, overlay);
        let bindings = result["keybindings"].as_object().unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings["quit"]["key"], json!("x"));
        assert_eq!(bindings["help"]["key"], json!("?"));
    }

    #[test]
    fn test_merge_is_idempotent_for_subsets() {
        let base = json!({"theme": "light", "ui": {"pageSize": 25}});
        let overlay = json!({"ui": {"pageSize": 25}});
        let merged = deep_merge(base.clone(), overlay.clone());
        assert_eq!(merged, base);
        assert_eq!(deep_merge(merged.clone(), overlay), merged);
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4, 5]});
        assert_eq!(deep_merge(base, overlay), json!({"items": [4, 5]}));
    }

    #[test]
    fn test_merge_all_precedence_order() {
        let values = vec![
            json!({"logging": {"level": "debug"}}),
            json!({"logging": {"level": "warn"}}),
            json!({"logging": {"level": "error"}}),
        ];
        let result = deep_merge_all(values);
        assert_eq!(result["logging"]["level"], json!("error"));
    }

    #[test]
    fn test_value_at() {
        let record = json!({"colorScheme": {"border": "#3C3C3C"}});
        assert_eq!(
            value_at(&record, "colorScheme.border"),
            Some(&json!("#3C3C3C"))
        );
        assert_eq!(value_at(&record, "colorScheme.missing"), None);
        assert_eq!(value_at(&record, "nope"), None);
    }

    #[test]
    fn test_set_value_at_creates_intermediates() {
        let mut record = json!({});
        set_value_at(&mut record, "logRotation.maxFiles", json!(7));
        assert_eq!(record, json!({"logRotation": {"maxFiles": 7}}));

        set_value_at(&mut record, "logRotation.maxSizeMb", json!(20));
        assert_eq!(
            record,
            json!({"logRotation": {"maxFiles": 7, "maxSizeMb": 20}})
        );
    }
}
