//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/postwiz/postwiz.toml`
//! 3. Local config: `<dir>/.postwiz.toml` (usually the working directory)
//! 4. Environment variables: `POSTWIZ_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::util::path::expand_path;

/// Unified configuration for postwiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Decision tree file; the built-in tree is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_path: Option<PathBuf>,
    /// Directory exported reports are written to
    pub report_dir: PathBuf,
    /// Write a report file on export
    pub write_report: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tree_path: None,
            report_dir: PathBuf::from("."),
            write_report: true,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub tree_path: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub write_report: Option<bool>,
}

/// Get the XDG config directory for postwiz.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "postwiz").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("postwiz.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".postwiz.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.tree_path = self.tree_path.as_deref().map(expand_path);
        self.report_dir = expand_path(&self.report_dir);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            tree_path: overlay.tree_path.clone().or_else(|| self.tree_path.clone()),
            report_dir: overlay
                .report_dir
                .clone()
                .unwrap_or_else(|| self.report_dir.clone()),
            write_report: overlay.write_report.unwrap_or(self.write_report),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory searched for `.postwiz.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("load: local config {}", local_path.display());
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply POSTWIZ_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("POSTWIZ")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("tree_path") {
            settings.tree_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("report_dir") {
            settings.report_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("write_report") {
            settings.write_report = val;
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# postwiz configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/postwiz/postwiz.toml
#   Local:  ./.postwiz.toml
#   Env:    POSTWIZ_* environment variables

# Decision tree file (JSON). The built-in tree is used when unset.
# tree_path = "~/troubleshooting/master_path.json"

# Directory for exported reports
# report_dir = "."

# Write a POST-diagnostic-<millis>.txt report on export
# write_report = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_builtin_tree_and_reports_enabled() {
        let settings = Settings::default();
        assert_eq!(settings.tree_path, None);
        assert_eq!(settings.report_dir, PathBuf::from("."));
        assert!(settings.write_report);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_fields_kept() {
        let base = Settings {
            tree_path: Some(PathBuf::from("/trees/a.json")),
            report_dir: PathBuf::from("/reports"),
            write_report: true,
        };
        let overlay = RawSettings {
            tree_path: None,
            report_dir: Some(PathBuf::from("/elsewhere")),
            write_report: Some(false),
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.tree_path, Some(PathBuf::from("/trees/a.json")));
        assert_eq!(merged.report_dir, PathBuf::from("/elsewhere"));
        assert!(!merged.write_report);
    }

    #[test]
    fn given_env_var_in_path_when_expand_paths_then_expands_variable() {
        let mut settings = Settings {
            tree_path: Some(PathBuf::from("$HOME/tree.json")),
            report_dir: PathBuf::from("~/reports"),
            write_report: true,
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings
            .tree_path
            .as_ref()
            .is_some_and(|p| p.starts_with(&home)));
        assert!(settings.report_dir.starts_with(&home));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.tree_path.is_none());
    }
}
