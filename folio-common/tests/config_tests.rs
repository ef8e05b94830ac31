//! Unit tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing TOML files fall back to defaults
//! - Malformed TOML files are reported as configuration errors
//! - Priority order for base URL resolution (CLI > ENV > TOML > default)
//!
//! Tests that manipulate FOLIO_TIMELINE_URL or FOLIO_CONFIG are marked with
//! #[serial] so they never run in parallel with each other.

use folio_common::config::{
    load_config, resolve_base_url, TomlConfig, BASE_URL_ENV_VAR, CONFIG_ENV_VAR, DEFAULT_BASE_URL,
};
use folio_common::Error;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[loader\nmax_retries = ").unwrap();

    let result = TomlConfig::load(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unreadable_path_is_io_error() {
    let temp_dir = TempDir::new().unwrap();

    // A directory exists but cannot be read as a file
    let result = TomlConfig::load(temp_dir.path());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_full_file_round_trips_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[loader]
base_url = "http://assets.test/timeline"
cache_expiry_ms = 1000
request_timeout_ms = 250
batch_size = 2

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.loader.base_url, "http://assets.test/timeline");
    assert_eq!(config.loader.cache_expiry_ms, 1000);
    assert_eq!(config.loader.request_timeout_ms, 250);
    assert_eq!(config.loader.batch_size, 2);
    assert_eq!(config.loader.max_retries, 3);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_config_env_var_selects_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[loader]\nmax_retries = 7\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = load_config(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.loader.max_retries, 7);
}

#[test]
#[serial]
fn test_base_url_env_overrides_toml() {
    let mut toml_config = TomlConfig::default();
    toml_config.loader.base_url = "http://toml.test/timeline".to_string();

    env::set_var(BASE_URL_ENV_VAR, "http://env.test/timeline/");
    let url = resolve_base_url(None, &toml_config);
    env::remove_var(BASE_URL_ENV_VAR);

    assert_eq!(url, "http://env.test/timeline");
}

#[test]
#[serial]
fn test_base_url_falls_back_to_toml_then_default() {
    env::remove_var(BASE_URL_ENV_VAR);

    let mut toml_config = TomlConfig::default();
    toml_config.loader.base_url = "http://toml.test/timeline".to_string();
    assert_eq!(resolve_base_url(None, &toml_config), "http://toml.test/timeline");

    toml_config.loader.base_url = "  ".to_string();
    assert_eq!(resolve_base_url(None, &toml_config), DEFAULT_BASE_URL);
}
