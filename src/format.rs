//! Format adapters: file bytes to the native settings record.
//!
//! Each adapter maps external syntax onto the same camelCase `serde_json::Value`
//! record the rest of the pipeline works with. YAML files already use camelCase
//! keys; TOML files use snake_case and are normalized on the way in, so both
//! `color_scheme.border` and `colorScheme.border` land on the same schema path.
//! Unknown keys pass through the merge untouched and are dropped by the final
//! typed deserialization — a forward-compatible file is not an error.

use crate::error::{ConfigError, Result, TOML_SYNTAX_HINTS, YAML_SYNTAX_HINTS};
use crate::secrets;
use heck::ToLowerCamelCase;
use serde_json::Value;
use std::path::Path;

/// Supported on-disk formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a path's extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "yml" | "yaml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Parse file content into a partial settings record.
    pub fn parse(self, path: &Path, content: &str) -> Result<Value> {
        match self {
            ConfigFormat::Yaml => parse_yaml(path, content),
            ConfigFormat::Toml => parse_toml(path, content),
        }
    }
}

fn parse_yaml(path: &Path, content: &str) -> Result<Value> {
    let parsed: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Syntax {
            path: path.to_path_buf(),
            message: e.to_string(),
            hints: YAML_SYNTAX_HINTS,
        })?;

    // An empty document is a valid empty record; any other non-mapping root
    // (bare scalar, sequence) carries no settings and must not be dropped
    // silently.
    match untag(parsed) {
        serde_yaml::Value::Null => Ok(Value::Object(serde_json::Map::new())),
        root @ serde_yaml::Value::Mapping(_) => Ok(yaml_node(root)),
        _ => Err(ConfigError::Syntax {
            path: path.to_path_buf(),
            message: "top-level value must be a mapping of settings".to_string(),
            hints: YAML_SYNTAX_HINTS,
        }),
    }
}

fn untag(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

/// Convert one YAML node to the native record.
///
/// `!encrypted <base64>` tagged scalars are rewritten into the explicit
/// `AES256GCM::<base64>` string form so the secrets pass can locate them later;
/// nothing is decrypted here. Unrecognized tags are stripped, keeping the value.
fn yaml_node(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_node).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (key, val) in map {
                if let serde_yaml::Value::String(key) = key {
                    out.insert(key, yaml_node(val));
                }
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => {
            if tagged.tag == "!encrypted" {
                if let serde_yaml::Value::String(payload) = tagged.value {
                    return Value::String(secrets::tagged_form(&payload));
                }
            }
            yaml_node(tagged.value)
        }
    }
}

fn parse_toml(path: &Path, content: &str) -> Result<Value> {
    let parsed: toml::Value = toml::from_str(content).map_err(|e| ConfigError::Syntax {
        path: path.to_path_buf(),
        message: e.to_string(),
        hints: TOML_SYNTAX_HINTS,
    })?;
    Ok(toml_node(parsed))
}

/// Convert a TOML document, normalizing snake_case keys to camelCase.
fn toml_node(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_node).collect()),
        toml::Value::Table(table) => {
            let mut out = serde_json::Map::new();
            for (key, val) in table {
                out.insert(key.to_lower_camel_case(), toml_node(val));
            }
            Value::Object(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::value_at;
    use serde_json::json;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(
            ConfigFormat::detect(Path::new("config.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::detect(Path::new("config.YAML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::detect(Path::new("config.toml")).unwrap(),
            ConfigFormat::Toml
        );

        let err = ConfigFormat::detect(Path::new("config.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_yaml_camel_case_keys() {
        let record = ConfigFormat::Yaml
            .parse(
                Path::new("config.yml"),
                "colorScheme:\n  border: '#FFFFFF'\nui:\n  pageSize: 25\n",
            )
            .unwrap();
        assert_eq!(
            value_at(&record, "colorScheme.border"),
            Some(&json!("#FFFFFF"))
        );
        assert_eq!(value_at(&record, "ui.pageSize"), Some(&json!(25)));
    }

    #[test]
    fn test_toml_snake_case_normalized() {
        let record = ConfigFormat::Toml
            .parse(
                Path::new("config.toml"),
                "[color_scheme]\nborder = \"#FFFFFF\"\n\n[ui]\npage_size = 25\n",
            )
            .unwrap();
        assert_eq!(
            value_at(&record, "colorScheme.border"),
            Some(&json!("#FFFFFF"))
        );
        assert_eq!(value_at(&record, "ui.pageSize"), Some(&json!(25)));
    }

    #[test]
    fn test_empty_yaml_is_empty_record() {
        let record = ConfigFormat::Yaml
            .parse(Path::new("config.yml"), "# only a comment\n")
            .unwrap();
        assert_eq!(record, json!({}));
    }

    #[test]
    fn test_yaml_non_mapping_root_is_rejected() {
        for content in ["enabled\n", "- theme\n- dark\n", "42\n"] {
            let err = ConfigFormat::Yaml
                .parse(Path::new("config.yml"), content)
                .unwrap_err();
            let rendered = err.to_string();
            assert!(rendered.contains("mapping"), "{content:?}: {rendered}");
            assert!(rendered.contains("config.yml"));
        }
    }

    #[test]
    fn test_yaml_syntax_error_has_hints() {
        let err = ConfigFormat::Yaml
            .parse(Path::new("bad.yml"), "theme: [unclosed\n")
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("bad.yml"));
        assert!(rendered.contains("indentation"));
    }

    #[test]
    fn test_toml_syntax_error_has_hints() {
        let err = ConfigFormat::Toml
            .parse(Path::new("bad.toml"), "theme = \n")
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("bad.toml"));
        assert!(rendered.contains("toml.io"));
    }

    #[test]
    fn test_encrypted_tag_becomes_explicit_form() {
        let record = ConfigFormat::Yaml
            .parse(
                Path::new("config.yml"),
                "dotnet:\n  feedUrl: !encrypted QUJDRA==\n",
            )
            .unwrap();
        let feed = value_at(&record, "dotnet.feedUrl").unwrap();
        assert_eq!(feed, &json!("AES256GCM::QUJDRA=="));
    }

    #[test]
    fn test_unknown_tag_keeps_inner_value() {
        let record = ConfigFormat::Yaml
            .parse(Path::new("config.yml"), "theme: !custom light\n")
            .unwrap();
        assert_eq!(value_at(&record, "theme"), Some(&json!("light")));
    }

    #[test]
    fn test_unknown_keys_survive_parsing() {
        let record = ConfigFormat::Yaml
            .parse(Path::new("config.yml"), "futureKnob: 7\ntheme: dark\n")
            .unwrap();
        assert_eq!(value_at(&record, "futureKnob"), Some(&json!(7)));
    }
}
