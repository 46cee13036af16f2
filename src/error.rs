//! Error types for configuration loading and watching.
//!
//! Two kinds of failure exist in this crate and only one of them lives here:
//! system/contract errors (a missing file that was explicitly requested, a syntax
//! error, an oversized file) abort `load` and surface as [`ConfigError`]. Schema
//! constraint violations never abort anything; they are repaired in place and
//! reported as [`crate::validate::Finding`]s.

use std::path::PathBuf;
use thiserror::Error;

/// Remediation hint appended to YAML syntax errors.
pub const YAML_SYNTAX_HINTS: &str = "check indentation (spaces, not tabs), quote values \
containing ':' or '#', and see https://yaml.org/spec/ for the full syntax";

/// Remediation hint appended to TOML syntax errors.
pub const TOML_SYNTAX_HINTS: &str = "check table headers ([section]), quote all string \
values, and see https://toml.io/en/ for the full syntax";

/// Fatal errors from the configuration subsystem.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A null record was handed to validation. Contract violation, not user input.
    #[error("internal error: validation received a null settings record")]
    NullRecord,

    /// A config file was explicitly requested (option or env var) but does not exist.
    #[error("config file not found: {path} (explicitly requested, so its absence is an error)")]
    FileNotFound { path: PathBuf },

    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exceeds the parse size ceiling.
    #[error("config file {path} is {size} bytes, above the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The file extension maps to no known format.
    #[error("unsupported config format '{extension}' for {path}: use .yml, .yaml, or .toml")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Both a YAML and a TOML config exist side by side.
    #[error("ambiguous configuration: both {yaml} and {toml} exist; remove one")]
    AmbiguousFormat { yaml: PathBuf, toml: PathBuf },

    /// The chosen format's parser rejected the file.
    #[error("syntax error in {path}: {message}; {hints}")]
    Syntax {
        path: PathBuf,
        message: String,
        hints: &'static str,
    },

    /// An encrypted scalar could not be resolved by the secret store.
    #[error("failed to resolve encrypted value at '{path}': {message}")]
    Secret { path: String, message: String },

    /// The validated record failed to deserialize into the typed config.
    #[error("internal error: validated record failed to deserialize: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// The filesystem notifier could not be set up.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
