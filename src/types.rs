//! Typed settings record for the lazynuget TUI.
//!
//! [`Config`] is the materialized form of the settings record after the load
//! pipeline has merged and validated all sources. During the pipeline the record
//! travels as `serde_json::Value` with camelCase keys; these structs are its final,
//! fully-defaulted shape. Every field default here must agree with the schema
//! catalog in [`crate::schema`] — the catalog's defaults are built from
//! `Config::default()`, so they cannot drift.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root settings record. One instance is "current" at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// UI color theme.
    #[serde(default)]
    pub theme: Theme,

    /// Whether the config file watcher should run at all.
    #[serde(default = "default_hot_reload")]
    pub hot_reload: bool,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub color_scheme: ColorSchemeConfig,

    /// Key bindings by action name.
    #[serde(default = "default_keybindings")]
    pub keybindings: BTreeMap<String, KeyBinding>,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub dotnet: DotnetConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub log_rotation: LogRotationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            hot_reload: default_hot_reload(),
            ui: UiConfig::default(),
            color_scheme: ColorSchemeConfig::default(),
            keybindings: default_keybindings(),
            performance: PerformanceConfig::default(),
            timeouts: TimeoutsConfig::default(),
            dotnet: DotnetConfig::default(),
            logging: LoggingConfig::default(),
            log_rotation: LogRotationConfig::default(),
        }
    }
}

/// UI color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    /// Follow the terminal's background.
    Auto,
}

fn default_hot_reload() -> bool {
    true
}

/// General UI behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    /// Show the bottom status bar.
    #[serde(default = "default_show_status_bar")]
    pub show_status_bar: bool,

    /// Rows per page in package lists.
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// strftime-style format for displayed timestamps.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Spinner animation interval in milliseconds.
    #[serde(default = "default_spinner_interval_ms")]
    pub spinner_interval_ms: i64,

    /// Suppress prompts and animations. Forced on when a CI environment is detected.
    #[serde(default)]
    pub non_interactive: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_status_bar: default_show_status_bar(),
            page_size: default_page_size(),
            date_format: default_date_format(),
            spinner_interval_ms: default_spinner_interval_ms(),
            non_interactive: false,
        }
    }
}

fn default_show_status_bar() -> bool {
    true
}

fn default_page_size() -> i64 {
    50
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

fn default_spinner_interval_ms() -> i64 {
    80
}

/// Colors as `#RRGGBB` or `#RRGGBBAA` hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSchemeConfig {
    #[serde(default = "default_border_color")]
    pub border: String,

    #[serde(default = "default_highlight_color")]
    pub highlight: String,

    #[serde(default = "default_warning_color")]
    pub warning: String,

    #[serde(default = "default_error_color")]
    pub error: String,
}

impl Default for ColorSchemeConfig {
    fn default() -> Self {
        Self {
            border: default_border_color(),
            highlight: default_highlight_color(),
            warning: default_warning_color(),
            error: default_error_color(),
        }
    }
}

fn default_border_color() -> String {
    "#3C3C3C".to_string()
}

fn default_highlight_color() -> String {
    "#569CD6".to_string()
}

fn default_warning_color() -> String {
    "#D7BA7D".to_string()
}

fn default_error_color() -> String {
    "#F44747".to_string()
}

/// One key binding. The action name is the map key in `Config::keybindings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBinding {
    /// Key chord, e.g. `q`, `ctrl+r`.
    pub key: String,

    /// UI context the binding is active in, e.g. `global`, `packages`.
    #[serde(default = "default_binding_context")]
    pub context: String,

    /// Shown in the help overlay.
    #[serde(default)]
    pub description: String,
}

fn default_binding_context() -> String {
    "global".to_string()
}

/// Built-in key bindings.
pub fn default_keybindings() -> BTreeMap<String, KeyBinding> {
    let mut bindings = BTreeMap::new();

    bindings.insert(
        "quit".to_string(),
        KeyBinding {
            key: "q".to_string(),
            context: "global".to_string(),
            description: "Quit lazynuget".to_string(),
        },
    );

    bindings.insert(
        "help".to_string(),
        KeyBinding {
            key: "?".to_string(),
            context: "global".to_string(),
            description: "Toggle help overlay".to_string(),
        },
    );

    bindings.insert(
        "refresh".to_string(),
        KeyBinding {
            key: "ctrl+r".to_string(),
            context: "global".to_string(),
            description: "Refresh package lists".to_string(),
        },
    );

    bindings.insert(
        "search".to_string(),
        KeyBinding {
            key: "/".to_string(),
            context: "packages".to_string(),
            description: "Search packages".to_string(),
        },
    );

    bindings.insert(
        "install".to_string(),
        KeyBinding {
            key: "i".to_string(),
            context: "packages".to_string(),
            description: "Install selected package".to_string(),
        },
    );

    bindings.insert(
        "remove".to_string(),
        KeyBinding {
            key: "d".to_string(),
            context: "packages".to_string(),
            description: "Remove selected package".to_string(),
        },
    );

    bindings.insert(
        "update".to_string(),
        KeyBinding {
            key: "u".to_string(),
            context: "packages".to_string(),
            description: "Update selected package".to_string(),
        },
    );

    bindings
}

/// Concurrency and caching knobs. None of these are hot-reloadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Parallel package operations (restores, searches). 1..=16.
    #[serde(default = "default_max_concurrent_ops")]
    pub max_concurrent_ops: i64,

    /// On-disk metadata cache size in MiB. 0 disables the cache.
    #[serde(default = "default_cache_size_mb")]
    pub cache_size_mb: i64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_ops: default_max_concurrent_ops(),
            cache_size_mb: default_cache_size_mb(),
        }
    }
}

fn default_max_concurrent_ops() -> i64 {
    4
}

fn default_cache_size_mb() -> i64 {
    256
}

/// Operation timeouts, stored as milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutsConfig {
    /// Feed HTTP requests.
    #[serde(default = "default_network_request_ms")]
    pub network_request: i64,

    /// `dotnet` CLI invocations (restore can be slow on cold caches).
    #[serde(default = "default_dotnet_command_ms")]
    pub dotnet_command: i64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            network_request: default_network_request_ms(),
            dotnet_command: default_dotnet_command_ms(),
        }
    }
}

fn default_network_request_ms() -> i64 {
    30_000
}

fn default_dotnet_command_ms() -> i64 {
    120_000
}

/// .NET toolchain integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotnetConfig {
    /// Path or name of the dotnet executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// NuGet v3 feed index URL.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Run `dotnet restore` automatically after package changes.
    #[serde(default)]
    pub auto_restore: bool,
}

impl Default for DotnetConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            feed_url: default_feed_url(),
            auto_restore: false,
        }
    }
}

fn default_cli_path() -> String {
    "dotnet".to_string()
}

fn default_feed_url() -> String {
    "https://api.nuget.org/v3/index.json".to_string()
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; empty means stderr only.
    #[serde(default)]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Rotation policy for the log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRotationConfig {
    /// Rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: i64,

    /// Rotate once the active file exceeds this many MiB.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: i64,
}

impl Default for LogRotationConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

fn default_max_files() -> i64 {
    5
}

fn default_max_size_mb() -> i64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = Config::default();
        assert_eq!(config.theme, Theme::Dark);
        assert!(config.hot_reload);
        assert_eq!(config.performance.max_concurrent_ops, 4);
        assert_eq!(config.timeouts.network_request, 30_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_keybindings_have_no_conflicts() {
        let bindings = default_keybindings();
        let mut seen = std::collections::BTreeMap::new();
        for (action, binding) in &bindings {
            let prev = seen.insert((binding.context.clone(), binding.key.clone()), action);
            assert!(prev.is_none(), "duplicate binding for {:?}", binding.key);
        }
    }

    #[test]
    fn test_camel_case_round_trip() {
        let value = serde_json::to_value(Config::default()).unwrap();
        assert!(value.get("colorScheme").is_some());
        assert!(value.get("logRotation").is_some());
        assert!(value["performance"].get("maxConcurrentOps").is_some());

        let back: Config = serde_json::from_value(value).unwrap();
        assert_eq!(back, Config::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let yaml = r#"
theme: light
futureFeature:
  enabled: true
ui:
  pageSize: 25
  someNewKnob: 9
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.ui.page_size, 25);
    }
}
