//! The load pipeline: defaults → file → environment → CLI overrides → validation.
//!
//! `load` is strictly sequential with no branch re-entry. Each source produces a
//! partial record; [`crate::merge::deep_merge_all`] folds them in precedence
//! order (CLI > environment > file > defaults, per individual leaf field), then
//! validation repairs any constraint violation to its schema default. System
//! errors (missing explicit file, oversized file, syntax error) abort the load
//! with no partial record; findings never do.

use crate::env::EnvSource;
use crate::error::{ConfigError, Result};
use crate::format::ConfigFormat;
use crate::merge::deep_merge_all;
use crate::paths;
use crate::schema::Schema;
use crate::secrets::{SecretStore, resolve_secrets};
use crate::types::Config;
use crate::validate::{Finding, validate};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Parse cost ceiling: files above this are rejected before parsing.
pub const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "LAZYNUGET";

/// Inputs to one load invocation. Constructed per call, never persisted.
#[derive(Clone)]
pub struct LoadOptions {
    /// Explicit config file path. Its absence on disk is a hard error.
    pub config_path: Option<PathBuf>,
    /// Directory searched when no explicit path is given. Defaults to the
    /// platform config directory; an empty search result is not an error.
    pub search_dir: Option<PathBuf>,
    /// Prefix for environment variable scanning.
    pub env_prefix: String,
    /// Escalates finding logs from warn to error. Findings still never block:
    /// the repaired record is returned either way.
    pub strict: bool,
    /// CLI flag overrides, pre-parsed into a partial record by the caller.
    pub overrides: Value,
    /// Environment snapshot. Empty by default; use `from_process_env` in the app.
    pub env: EnvSource,
    /// External decryption collaborator for encrypted scalars.
    pub secrets: Option<Arc<dyn SecretStore>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            search_dir: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            strict: false,
            overrides: json!({}),
            env: EnvSource::default(),
            secrets: None,
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("config_path", &self.config_path)
            .field("search_dir", &self.search_dir)
            .field("env_prefix", &self.env_prefix)
            .field("strict", &self.strict)
            .field("overrides", &self.overrides)
            .field("secrets", &self.secrets.is_some())
            .finish_non_exhaustive()
    }
}

impl LoadOptions {
    /// Options for the real application: a live process environment snapshot.
    pub fn from_process_env() -> Self {
        Self {
            env: EnvSource::from_process(),
            ..Self::default()
        }
    }

    /// Set an explicit config file path.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Search this directory instead of the platform default location.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dir = Some(dir.into());
        self
    }

    /// Set the environment snapshot.
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Set CLI overrides as a partial record.
    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = overrides;
        self
    }

    /// Enable strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Attach a secret store for encrypted scalars.
    pub fn with_secrets(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }
}

/// Which source ultimately produced the active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// No file was found; defaults plus env/CLI only.
    Defaults,
    /// This file contributed the file layer.
    File(PathBuf),
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Defaults => write!(f, "defaults"),
            Provenance::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A fully loaded, validated configuration with its diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Every validation finding, all repaired. Advisory.
    pub findings: Vec<Finding>,
    pub provenance: Provenance,
    pub loaded_at: DateTime<Utc>,
}

/// Run the full pipeline.
pub fn load(options: &LoadOptions) -> Result<LoadedConfig> {
    let schema = Schema::global();

    let mut layers = vec![schema.defaults_record()];
    let mut provenance = Provenance::Defaults;

    if let Some(path) = resolve_file(options)? {
        layers.push(read_file_record(&path, options)?);
        provenance = Provenance::File(path);
    }

    layers.push(options.env.overlay(&options.env_prefix, schema));
    layers.push(options.overrides.clone());

    let merged = deep_merge_all(layers);
    let (repaired, findings) = validate(&merged)?;

    for finding in &findings {
        if options.strict {
            error!(
                path = %finding.path,
                value = %finding.value,
                "invalid setting repaired to default: {}",
                finding.message
            );
        } else {
            warn!(
                path = %finding.path,
                value = %finding.value,
                "invalid setting repaired to default: {}",
                finding.message
            );
        }
    }

    let config: Config = serde_json::from_value(repaired)?;
    info!(source = %provenance, findings = findings.len(), "configuration loaded");

    Ok(LoadedConfig {
        config,
        findings,
        provenance,
        loaded_at: Utc::now(),
    })
}

/// Resolve which file backs the file layer, if any.
///
/// Explicit path from options wins, then the env-var override, then discovery
/// at the platform default location. Only the first two treat a missing file as
/// an error; an empty default location just means defaults-only.
fn resolve_file(options: &LoadOptions) -> Result<Option<PathBuf>> {
    let explicit = options
        .config_path
        .clone()
        .or_else(|| options.env.config_path_override(&options.env_prefix));

    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path });
        }
        paths::check_sibling_ambiguity(&path)?;
        return Ok(Some(path));
    }

    match options.search_dir.clone().or_else(paths::default_config_dir) {
        Some(dir) => paths::discover_in_dir(&dir),
        None => Ok(None),
    }
}

/// Read, size-check, parse, and resolve secrets for the file layer.
fn read_file_record(path: &PathBuf, options: &LoadOptions) -> Result<Value> {
    let format = ConfigFormat::detect(path)?;

    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::FileTooLarge {
            path: path.clone(),
            size: metadata.len(),
            limit: MAX_CONFIG_FILE_BYTES,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
    })?;

    let mut record = format.parse(path, &content)?;
    if let Some(store) = &options.secrets {
        let resolved = resolve_secrets(&mut record, store.as_ref())?;
        if resolved > 0 {
            info!(path = %path.display(), count = resolved, "resolved encrypted values");
        }
    }

    Ok(record)
}
