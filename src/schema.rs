//! Static catalog of every known setting.
//!
//! Built once per process from `Config::default()`, read-only afterwards. Each
//! entry maps a dotted path (`colorScheme.border`) to its value kind, constraint
//! list, default value, hot-reload flag, and description. Constraint checking is
//! table-driven: each [`Constraint`] tag selects an explicit checker, so no
//! runtime type introspection is involved.

use crate::merge::value_at;
use crate::types::Config;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Value kind of a schema path. Drives env/CLI string parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Integer,
    /// Integer milliseconds in the record; humantime grammar accepted from env.
    Duration,
    Text,
    /// Object-valued field (keybindings). Merged key-by-key, validated separately.
    Map,
}

impl SettingKind {
    /// Whether a JSON value has this kind's shape.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SettingKind::Bool => value.is_boolean(),
            SettingKind::Integer | SettingKind::Duration => value.as_i64().is_some(),
            SettingKind::Text => value.is_string(),
            SettingKind::Map => value.is_object(),
        }
    }

    /// Violation message for a value of the wrong shape.
    pub fn expectation(&self) -> &'static str {
        match self {
            SettingKind::Bool => "must be a boolean",
            SettingKind::Integer => "must be an integer",
            SettingKind::Duration => "must be an integer of milliseconds",
            SettingKind::Text => "must be a string",
            SettingKind::Map => "must be a table of entries",
        }
    }
}

/// A single validation constraint with its checker selected by tag.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Value must be one of the allowed strings.
    Enum(&'static [&'static str]),
    /// Inclusive numeric range.
    Range { min: i64, max: i64 },
    /// Inclusive lower bound.
    Min(i64),
    /// `#RRGGBB` or `#RRGGBBAA`, case-insensitive hex digits.
    HexColor,
    /// strftime format that renders the reference instant to non-empty text.
    DateFormat,
}

impl Constraint {
    /// Check a value against this constraint.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Constraint::Enum(allowed) => value
                .as_str()
                .is_some_and(|s| allowed.contains(&s)),
            Constraint::Range { min, max } => value
                .as_i64()
                .is_some_and(|n| n >= *min && n <= *max),
            Constraint::Min(min) => value.as_i64().is_some_and(|n| n >= *min),
            Constraint::HexColor => value.as_str().is_some_and(is_hex_color),
            Constraint::DateFormat => value.as_str().is_some_and(renders_reference_instant),
        }
    }

    /// Human-readable violation message.
    pub fn message(&self) -> String {
        match self {
            Constraint::Enum(allowed) => format!("must be one of {}", allowed.join(", ")),
            Constraint::Range { min, max } => format!("must be between {min} and {max}"),
            Constraint::Min(min) => format!("must be at least {min}"),
            Constraint::HexColor => "must be a hex color like #RRGGBB or #RRGGBBAA".to_string(),
            Constraint::DateFormat => "must be a date format that produces output".to_string(),
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    (digits.len() == 6 || digits.len() == 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Render a fixed instant with the candidate format. A format full of unknown
/// specifiers either errors or renders nothing; emptiness is the failure signal.
fn renders_reference_instant(fmt: &str) -> bool {
    // 2006-01-02 15:04:05 UTC, every component distinct.
    let Some(reference) = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).single() else {
        return false;
    };
    let mut rendered = String::new();
    if write!(rendered, "{}", reference.format(fmt)).is_err() {
        return false;
    }
    !rendered.is_empty()
}

/// Specification of one setting.
#[derive(Debug, Clone)]
pub struct SettingSpec {
    pub kind: SettingKind,
    pub constraints: Vec<Constraint>,
    /// Default value, also the repair substitute for any violation.
    pub default: Value,
    /// Safe to apply to a running process without restart.
    pub hot_reload: bool,
    pub description: &'static str,
}

/// The full catalog, keyed by dotted path.
#[derive(Debug)]
pub struct Schema {
    specs: BTreeMap<&'static str, SettingSpec>,
    defaults: Value,
}

impl Schema {
    /// Process-wide schema instance.
    pub fn global() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(Schema::build)
    }

    fn build() -> Self {
        let defaults = serde_json::to_value(Config::default())
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        let mut schema = Schema {
            specs: BTreeMap::new(),
            defaults,
        };

        use Constraint::*;
        use SettingKind::*;

        schema.add("theme", Text, vec![Enum(&["dark", "light", "auto"])], true, "UI color theme");
        schema.add("hotReload", Bool, vec![], false, "Watch the config file for changes");

        schema.add("ui.showStatusBar", Bool, vec![], true, "Show the bottom status bar");
        schema.add("ui.pageSize", Integer, vec![Range { min: 10, max: 500 }], true, "Rows per page in package lists");
        schema.add("ui.dateFormat", Text, vec![DateFormat], true, "Timestamp display format");
        schema.add("ui.spinnerIntervalMs", Integer, vec![Range { min: 20, max: 1000 }], true, "Spinner animation interval");
        schema.add("ui.nonInteractive", Bool, vec![], false, "Suppress prompts and animations");

        schema.add("colorScheme.border", Text, vec![HexColor], true, "Border color");
        schema.add("colorScheme.highlight", Text, vec![HexColor], true, "Selection highlight color");
        schema.add("colorScheme.warning", Text, vec![HexColor], true, "Warning color");
        schema.add("colorScheme.error", Text, vec![HexColor], true, "Error color");

        schema.add("keybindings", Map, vec![], true, "Key bindings by action");

        schema.add("performance.maxConcurrentOps", Integer, vec![Range { min: 1, max: 16 }], false, "Parallel package operations");
        schema.add("performance.cacheSizeMb", Integer, vec![Range { min: 0, max: 4096 }], false, "Metadata cache size (0 disables)");

        schema.add("timeouts.networkRequest", Duration, vec![Min(1000)], true, "Feed request timeout");
        schema.add("timeouts.dotnetCommand", Duration, vec![Min(1000)], true, "dotnet CLI timeout");

        schema.add("dotnet.cliPath", Text, vec![], false, "dotnet executable");
        schema.add("dotnet.feedUrl", Text, vec![], true, "NuGet v3 feed index URL");
        schema.add("dotnet.autoRestore", Bool, vec![], true, "Restore after package changes");

        schema.add("logging.level", Text, vec![Enum(&["debug", "info", "warn", "error"])], true, "Minimum log level");
        schema.add("logging.file", Text, vec![], false, "Log file path (empty = stderr)");

        schema.add("logRotation.maxFiles", Integer, vec![Range { min: 1, max: 50 }], true, "Rotated files to keep");
        schema.add("logRotation.maxSizeMb", Integer, vec![Min(1)], true, "Rotation size threshold");

        schema
    }

    fn add(
        &mut self,
        path: &'static str,
        kind: SettingKind,
        constraints: Vec<Constraint>,
        hot_reload: bool,
        description: &'static str,
    ) {
        // Every schema path must have exactly one default, and it lives in
        // Config::default(). A miss here is a programming error caught by tests.
        let default = value_at(&self.defaults, path).cloned().unwrap_or(Value::Null);
        self.specs.insert(
            path,
            SettingSpec {
                kind,
                constraints,
                default,
                hot_reload,
                description,
            },
        );
    }

    /// Look up a path's spec.
    pub fn lookup(&self, path: &str) -> Option<&SettingSpec> {
        self.specs.get(path)
    }

    /// All catalog paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }

    /// Whether a path exists in the catalog.
    pub fn contains(&self, path: &str) -> bool {
        self.specs.contains_key(path)
    }

    /// Whether a path may be applied to a running process without restart.
    pub fn is_hot_reloadable(&self, path: &str) -> bool {
        self.specs.get(path).map(|s| s.hot_reload).unwrap_or(false)
    }

    /// The complete defaults record (camelCase keys), the pipeline's base layer.
    pub fn defaults_record(&self) -> Value {
        self.defaults.clone()
    }

    /// Catalog paths whose value differs between two records.
    ///
    /// After a hot reload the application walks this list and consults
    /// [`Schema::is_hot_reloadable`] per path to decide what it may apply
    /// without a restart; the watcher itself never filters fields.
    pub fn changed_paths(&self, before: &Value, after: &Value) -> Vec<&'static str> {
        self.specs
            .keys()
            .filter(|path| value_at(before, path) != value_at(after, path))
            .copied()
            .collect()
    }
}
