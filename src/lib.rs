//! lazynuget configuration engine
//!
//! Layered configuration for the lazynuget terminal UI: defaults, an optional
//! YAML or TOML file, `LAZYNUGET_*` environment variables, and CLI overrides
//! merged in ascending precedence, validated against a typed schema with
//! repair-to-default semantics, and kept fresh at runtime by a debounced file
//! watcher that never displaces a known-good configuration.

pub mod env;
pub mod error;
pub mod format;
pub mod loader;
pub mod merge;
pub mod paths;
pub mod schema;
pub mod secrets;
pub mod types;
pub mod validate;
pub mod watcher;

pub use error::{ConfigError, Result};
pub use loader::{LoadOptions, LoadedConfig, Provenance, load};
pub use types::Config;
pub use validate::{Finding, Severity};
pub use watcher::{ChangeEvent, ChangeKind, ConfigWatcher, WatcherConfig};
