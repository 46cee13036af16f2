//! Environment variables as a configuration source.
//!
//! The process environment is captured once into an [`EnvSource`] and injected
//! into the loader, so pipeline logic never reads process globals directly and
//! tests can supply any mapping they like.
//!
//! Key translation: `LAZYNUGET_COLOR_SCHEME_BORDER` becomes `colorScheme.border`.
//! Multi-word group names are a fixed, recognized set; anything that resolves to
//! a path outside the schema is skipped, never an error.

use crate::merge::set_value_at;
use crate::schema::{Schema, SettingKind};
use heck::ToLowerCamelCase;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Group names that span two words in UPPER_SNAKE form.
const MULTI_WORD_GROUPS: &[(&str, &str)] = &[
    ("COLOR_SCHEME", "colorScheme"),
    ("LOG_ROTATION", "logRotation"),
];

/// Environment variables that indicate a CI environment.
const CI_MARKERS: &[&str] = &["CI", "GITHUB_ACTIONS", "GITLAB_CI", "TF_BUILD", "JENKINS_URL"];

/// A finite snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Snapshot the process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from an explicit mapping. Tests use this.
    pub fn from_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Alternate config file path selected by `<PREFIX>_CONFIG`.
    pub fn config_path_override(&self, prefix: &str) -> Option<PathBuf> {
        self.vars
            .get(&format!("{prefix}_CONFIG"))
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Whether a CI environment is detected (forces non-interactive mode).
    pub fn is_ci(&self) -> bool {
        CI_MARKERS.iter().any(|marker| {
            self.vars
                .get(*marker)
                .is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        })
    }

    /// Build the partial settings record this environment contributes.
    ///
    /// Only keys carrying the prefix are considered, each parsed according to the
    /// schema kind of its resolved path. Unrecognized paths are skipped with a
    /// debug log; unparseable values are skipped with a warning.
    pub fn overlay(&self, prefix: &str, schema: &Schema) -> Value {
        let mut record = json!({});
        let scoped = format!("{prefix}_");

        for (name, raw) in &self.vars {
            let Some(rest) = name.strip_prefix(&scoped) else {
                continue;
            };
            if rest == "CONFIG" {
                continue; // file path selector, not a setting
            }

            let Some(path) = resolve_path(rest) else {
                debug!(var = %name, "environment key does not map to a known group, skipping");
                continue;
            };

            if let Some(action) = path.strip_prefix("keybindings.") {
                // KEYBINDINGS_QUIT=x rebinds the key chord for one action.
                set_value_at(
                    &mut record,
                    &format!("keybindings.{action}"),
                    json!({ "key": raw }),
                );
                continue;
            }

            let Some(spec) = schema.lookup(&path) else {
                debug!(var = %name, path = %path, "environment key resolves outside the schema, skipping");
                continue;
            };

            match parse_typed(raw, spec.kind) {
                Some(value) => set_value_at(&mut record, &path, value),
                None => {
                    warn!(var = %name, value = %raw, "could not parse environment value, skipping");
                }
            }
        }

        if self.is_ci() {
            set_value_at(&mut record, "ui.nonInteractive", json!(true));
        }

        record
    }
}

/// Translate an UPPER_SNAKE key (prefix already stripped) into a dotted path.
fn resolve_path(rest: &str) -> Option<String> {
    // Top-level multi-word keys first.
    if rest == "HOT_RELOAD" {
        return Some("hotReload".to_string());
    }

    for (upper, group) in MULTI_WORD_GROUPS {
        if let Some(leaf) = rest.strip_prefix(*upper) {
            let leaf = leaf.strip_prefix('_')?;
            if leaf.is_empty() {
                return None;
            }
            return Some(format!("{group}.{}", leaf.to_lower_camel_case()));
        }
    }

    match rest.split_once('_') {
        Some((group, leaf)) if !leaf.is_empty() => Some(format!(
            "{}.{}",
            group.to_lowercase(),
            leaf.to_lower_camel_case()
        )),
        Some(_) => None,
        // Single-word top-level key, e.g. THEME.
        None => Some(rest.to_lowercase()),
    }
}

/// Parse a raw string according to the schema kind of its target path.
fn parse_typed(raw: &str, kind: SettingKind) -> Option<Value> {
    match kind {
        SettingKind::Bool => parse_bool(raw).map(Value::Bool),
        SettingKind::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
        SettingKind::Duration => parse_duration_ms(raw).map(Value::from),
        SettingKind::Text => Some(Value::String(raw.to_string())),
        SettingKind::Map => None,
    }
}

/// Accepts true/false, 1/0, yes/no, on/off, case-insensitively.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Bare integers are milliseconds; otherwise the humantime grammar ("30s", "2m").
fn parse_duration_ms(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Some(ms);
    }
    let duration = humantime::parse_duration(trimmed).ok()?;
    i64::try_from(duration.as_millis()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::value_at;

    fn overlay_of(pairs: &[(&str, &str)]) -> Value {
        let source = EnvSource::from_iter(pairs.iter().copied());
        source.overlay("LAZYNUGET", Schema::global())
    }

    #[test]
    fn test_single_word_group_mapping() {
        let overlay = overlay_of(&[("LAZYNUGET_LOGGING_LEVEL", "warn")]);
        assert_eq!(value_at(&overlay, "logging.level"), Some(&json!("warn")));
    }

    #[test]
    fn test_multi_word_group_mapping() {
        let overlay = overlay_of(&[
            ("LAZYNUGET_COLOR_SCHEME_BORDER", "#FFFFFF"),
            ("LAZYNUGET_LOG_ROTATION_MAX_FILES", "9"),
        ]);
        assert_eq!(
            value_at(&overlay, "colorScheme.border"),
            Some(&json!("#FFFFFF"))
        );
        assert_eq!(value_at(&overlay, "logRotation.maxFiles"), Some(&json!(9)));
    }

    #[test]
    fn test_top_level_keys() {
        let overlay = overlay_of(&[("LAZYNUGET_THEME", "light")]);
        assert_eq!(value_at(&overlay, "theme"), Some(&json!("light")));

        let overlay = overlay_of(&[("LAZYNUGET_HOT_RELOAD", "off")]);
        assert_eq!(value_at(&overlay, "hotReload"), Some(&json!(false)));
    }

    #[test]
    fn test_bool_grammar() {
        for (raw, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("on", true),
            ("false", false),
            ("0", false),
            ("No", false),
            ("OFF", false),
        ] {
            assert_eq!(parse_bool(raw), Some(expected), "parsing {raw:?}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_duration_grammar() {
        let overlay = overlay_of(&[("LAZYNUGET_TIMEOUTS_NETWORK_REQUEST", "45s")]);
        assert_eq!(
            value_at(&overlay, "timeouts.networkRequest"),
            Some(&json!(45_000))
        );

        let overlay = overlay_of(&[("LAZYNUGET_TIMEOUTS_DOTNET_COMMAND", "90000")]);
        assert_eq!(
            value_at(&overlay, "timeouts.dotnetCommand"),
            Some(&json!(90_000))
        );
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let overlay = overlay_of(&[
            ("LAZYNUGET_NO_SUCH_GROUP_VALUE", "1"),
            ("LAZYNUGET_UI_NOT_A_FIELD", "2"),
            ("OTHER_PREFIX_LOGGING_LEVEL", "debug"),
        ]);
        assert_eq!(overlay, json!({}));
    }

    #[test]
    fn test_unparseable_value_is_skipped() {
        let overlay = overlay_of(&[("LAZYNUGET_UI_PAGE_SIZE", "lots")]);
        assert_eq!(overlay, json!({}));
    }

    #[test]
    fn test_keybinding_override() {
        let overlay = overlay_of(&[("LAZYNUGET_KEYBINDINGS_QUIT", "x")]);
        assert_eq!(
            value_at(&overlay, "keybindings.quit"),
            Some(&json!({"key": "x"}))
        );
    }

    #[test]
    fn test_config_path_override() {
        let source = EnvSource::from_iter([("LAZYNUGET_CONFIG", "/tmp/alt.yml")]);
        assert_eq!(
            source.config_path_override("LAZYNUGET"),
            Some(PathBuf::from("/tmp/alt.yml"))
        );
        assert!(source.config_path_override("OTHER").is_none());

        // The selector is not itself a setting.
        let overlay = source.overlay("LAZYNUGET", Schema::global());
        assert_eq!(overlay, json!({}));
    }

    #[test]
    fn test_ci_detection_forces_non_interactive() {
        let source = EnvSource::from_iter([("GITHUB_ACTIONS", "true")]);
        assert!(source.is_ci());
        let overlay = source.overlay("LAZYNUGET", Schema::global());
        assert_eq!(value_at(&overlay, "ui.nonInteractive"), Some(&json!(true)));

        let source = EnvSource::from_iter([("CI", "false")]);
        assert!(!source.is_ci());
    }
}
