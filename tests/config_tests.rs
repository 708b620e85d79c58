// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use camera_uploader::Config;
use camera_uploader::backends::camera::{CameraBackendType, FacingMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.server_url, "http://127.0.0.1:5000");
    assert_eq!(config.default_facing_mode, FacingMode::User);
    assert!(
        config.switch_control_enabled,
        "Switching should be enabled by default"
    );
    assert_eq!(config.backend, CameraBackendType::V4l2);
    assert_eq!((config.preferred_width, config.preferred_height), (640, 480));
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        server_url: "https://snapshots.example.org".to_string(),
        default_facing_mode: FacingMode::Environment,
        switch_control_enabled: false,
        backend: CameraBackendType::TestPattern,
        preferred_width: 1280,
        preferred_height: 720,
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.json"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_malformed_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());
}

#[test]
fn test_upload_url() {
    let config = Config {
        server_url: "http://10.0.0.2:8000/".to_string(),
        ..Config::default()
    };
    assert_eq!(config.upload_url().unwrap(), "http://10.0.0.2:8000/upload");
}
