//! Integration tests for Settings config loading with layered merge semantics.
//!
//! These tests run without a global config (temp directories only), so they
//! exercise the local `.postwiz.toml` layer on top of compiled defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use postwiz::application::ApplicationError;
use postwiz::config::{local_config_path, Settings};

// ============================================================
// Settings::load() local config tests
// ============================================================

#[test]
fn given_no_config_files_when_load_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings.tree_path, None);
    assert!(settings.write_report);
}

#[test]
fn given_local_config_when_load_then_specified_fields_override_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config = r#"
tree_path = "/srv/trees/master_path.json"
write_report = false
"#;
    fs::write(local_config_path(dir.path()), config).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(
        settings.tree_path,
        Some(PathBuf::from("/srv/trees/master_path.json"))
    );
    assert!(!settings.write_report);
    assert_eq!(settings.report_dir, PathBuf::from("."));
}

#[test]
fn given_tilde_in_local_config_when_load_then_paths_expanded() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "report_dir = \"~/postwiz-reports\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    let home = std::env::var("HOME").expect("HOME should be set");
    assert!(settings.report_dir.starts_with(&home));
    assert!(settings.report_dir.ends_with("postwiz-reports"));
}

#[test]
fn given_invalid_toml_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "write_report = [not valid").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_loaded_settings_when_shown_then_round_trips_through_toml() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "report_dir = \"/var/tmp/reports\"\n",
    )
    .unwrap();
    let settings = Settings::load(Some(dir.path())).unwrap();

    let shown = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&shown).unwrap();

    assert_eq!(parsed, settings);
}
