//! Platform config-file location and discovery.
//!
//! The default location is `<platform config dir>/lazynuget/config.{yml,yaml,toml}`.
//! Discovery refuses to pick between a YAML and a TOML variant sitting side by
//! side — that is an ambiguous configuration and a hard error, whereas no file at
//! the default location just means "run on defaults".

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};

/// File stem looked for in the config directory.
pub const CONFIG_FILE_STEM: &str = "config";

/// Candidate extensions, in preference order within a format.
const YAML_EXTENSIONS: &[&str] = &["yml", "yaml"];
const TOML_EXTENSION: &str = "toml";

/// Platform default config directory (`~/.config/lazynuget` on Linux).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lazynuget"))
}

/// Find the config file in a directory.
///
/// Returns `Ok(None)` when no candidate exists. Errors when both a YAML and a
/// TOML variant are present.
pub fn discover_in_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let yaml = YAML_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .find(|candidate| candidate.is_file());
    let toml = {
        let candidate = dir.join(format!("{CONFIG_FILE_STEM}.{TOML_EXTENSION}"));
        candidate.is_file().then_some(candidate)
    };

    match (yaml, toml) {
        (Some(yaml), Some(toml)) => Err(ConfigError::AmbiguousFormat { yaml, toml }),
        (Some(path), None) | (None, Some(path)) => Ok(Some(path)),
        (None, None) => Ok(None),
    }
}

/// Reject an explicitly-chosen file whose directory also holds the other format.
///
/// `config.yml` next to a `config.toml` is the same ambiguity as in discovery,
/// just reached through an explicit path.
pub fn check_sibling_ambiguity(path: &Path) -> Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(());
    };
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if YAML_EXTENSIONS.contains(&extension.as_str()) {
        let sibling = dir.join(format!("{stem}.{TOML_EXTENSION}"));
        if sibling.is_file() {
            return Err(ConfigError::AmbiguousFormat {
                yaml: path.to_path_buf(),
                toml: sibling,
            });
        }
    } else if extension == TOML_EXTENSION {
        for ext in YAML_EXTENSIONS {
            let sibling = dir.join(format!("{stem}.{ext}"));
            if sibling.is_file() {
                return Err(ConfigError::AmbiguousFormat {
                    yaml: sibling,
                    toml: path.to_path_buf(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_nothing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(discover_in_dir(temp.path()).unwrap(), None);
    }

    #[test]
    fn test_discover_single_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "theme: dark\n").unwrap();
        assert_eq!(discover_in_dir(temp.path()).unwrap(), Some(path));
    }

    #[test]
    fn test_discover_single_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "theme = \"dark\"\n").unwrap();
        assert_eq!(discover_in_dir(temp.path()).unwrap(), Some(path));
    }

    #[test]
    fn test_discover_both_formats_is_ambiguous() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.yml"), "theme: dark\n").unwrap();
        std::fs::write(temp.path().join("config.toml"), "theme = \"dark\"\n").unwrap();

        let err = discover_in_dir(temp.path()).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("config.yml"));
        assert!(rendered.contains("config.toml"));
    }

    #[test]
    fn test_yml_and_yaml_is_not_ambiguous() {
        // Two spellings of the same format; the .yml spelling wins.
        let temp = TempDir::new().unwrap();
        let yml = temp.path().join("config.yml");
        std::fs::write(&yml, "theme: dark\n").unwrap();
        std::fs::write(temp.path().join("config.yaml"), "theme: light\n").unwrap();

        assert_eq!(discover_in_dir(temp.path()).unwrap(), Some(yml));
    }

    #[test]
    fn test_sibling_ambiguity_for_explicit_path() {
        let temp = TempDir::new().unwrap();
        let yml = temp.path().join("config.yml");
        std::fs::write(&yml, "theme: dark\n").unwrap();
        assert!(check_sibling_ambiguity(&yml).is_ok());

        std::fs::write(temp.path().join("config.toml"), "theme = \"dark\"\n").unwrap();
        assert!(check_sibling_ambiguity(&yml).is_err());
    }
}
