//! Tests for the SettingsEngine public API: defaults, persistence, reset,
//! and how settings feed the share engine.

use std::fs;

use passdrop::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use passdrop::types::errors::SettingsError;
use passdrop::types::settings::{PreViewPolicy, ServiceSettings, DEFAULT_PRE_VIEW_DAYS};
use tempfile::TempDir;

/// SettingsEngine backed by a temp directory the caller keeps alive.
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, ServiceSettings::default());
    assert_eq!(settings.share.pre_view_policy, PreViewPolicy::Bounded);
    assert_eq!(settings.share.pre_view_days, DEFAULT_PRE_VIEW_DAYS);
    assert_eq!(settings.storage.database_file, "passdrop.db");
    assert_eq!(settings.logging.filter, "passdrop=info");
}

#[test]
fn test_set_value_is_saved_immediately() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine
        .set_value("share.public_base_url", serde_json::json!("https://share.example.org/"))
        .unwrap();

    let mut fresh = engine_in_temp(&dir);
    let loaded = fresh.load().unwrap();
    assert_eq!(loaded.share.public_base_url, "https://share.example.org/");
    assert_eq!(
        loaded.share.share_link("abc"),
        "https://share.example.org/view/abc"
    );
}

#[test]
fn test_reset_restores_defaults_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.set_value("share.pre_view_days", serde_json::json!(2)).unwrap();

    engine.reset().unwrap();

    assert_eq!(*engine.get_settings(), ServiceSettings::default());
    let mut fresh = engine_in_temp(&dir);
    assert_eq!(fresh.load().unwrap(), ServiceSettings::default());
}

#[test]
fn test_wrong_type_is_invalid_value() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let result = engine.set_value("share.pre_view_days", serde_json::json!("fourteen"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
}

#[test]
fn test_unknown_policy_is_invalid_value() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let result = engine.set_value("share.pre_view_policy", serde_json::json!("forever"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
}

#[test]
fn test_path_through_scalar_is_invalid_key() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let result = engine.set_value("storage.database_file.name", serde_json::json!("x"));
    assert!(matches!(result, Err(SettingsError::InvalidKey(_))));
    assert!(engine.set_value("", serde_json::json!(1)).is_err());
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    fs::write(engine.get_config_path(), "{ not json").unwrap();
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_file_without_logging_section_loads() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    fs::write(
        engine.get_config_path(),
        r#"{
            "share": {"pre_view_policy": "until-first-view", "pre_view_days": 14, "public_base_url": "http://x"},
            "storage": {"database_file": "a.db"}
        }"#,
    )
    .unwrap();

    let settings = engine.load().unwrap();
    assert_eq!(settings.share.pre_view_policy, PreViewPolicy::UntilFirstView);
    assert_eq!(settings.share.pre_view_deadline(100), None);
    assert_eq!(settings.logging.filter, "passdrop=info");
}

#[test]
fn test_partial_file_keeps_defaults_for_missing_fields() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    fs::write(engine.get_config_path(), r#"{"share": {"pre_view_policy": "until-first-view"}}"#).unwrap();

    let settings = engine.load().unwrap();
    assert_eq!(settings.share.pre_view_policy, PreViewPolicy::UntilFirstView);
    assert_eq!(settings.share.pre_view_days, DEFAULT_PRE_VIEW_DAYS);
    assert_eq!(settings.share.public_base_url, "http://localhost:5000");
    assert_eq!(settings.storage.database_file, "passdrop.db");
}

#[test]
fn test_bounded_deadline_scales_with_days() {
    let mut settings = ServiceSettings::default().share;
    assert_eq!(settings.pre_view_deadline(0), Some(14 * 86_400));
    settings.pre_view_days = 1;
    assert_eq!(settings.pre_view_deadline(10), Some(10 + 86_400));
}
