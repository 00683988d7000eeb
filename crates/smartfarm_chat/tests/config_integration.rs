//! Integration tests for config load/save.

use predicates::prelude::*;
use smartfarm_chat::config::{self, DEFAULT_BASE_URL};
use smartfarm_chat::{Config, ConfigError};

#[test]
fn load_existing_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        r#"
server:
  base_url: "http://farmbot.local:8080"
  language: "zu"
"#,
    )
    .unwrap();

    let cfg = config::load(&config_path).expect("load should succeed");
    assert_eq!(
        cfg.server.base_url.as_deref(),
        Some("http://farmbot.local:8080")
    );
    assert_eq!(cfg.server.language.as_deref(), Some("zu"));
    assert_eq!(cfg.base_url(), "http://farmbot.local:8080");
}

#[test]
fn empty_sections_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(&config_path, "server: {}\n").unwrap();

    let cfg = config::load(&config_path).expect("load should succeed");
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(&config_path, "server: [not, a, map").unwrap();

    let err = config::load(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_errors_unless_optional() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("absent.yaml");

    let err = config::load(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.yaml"));

    let cfg = config::load_or_default(&config_path).expect("defaults");
    assert_eq!(cfg, Config::default());
}

#[test]
fn save_creates_directory_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("smartfarm-chat");
    let config_path = config_dir.join("config.yaml");
    assert!(!config_dir.exists(), "config dir should not exist yet");

    let mut cfg = Config::default();
    cfg.server.base_url = Some("http://10.0.0.5:5000".into());
    cfg.server.language = Some("af".into());

    config::save(&config_path, &cfg).expect("save should succeed");
    assert!(predicates::path::exists().eval(&config_path));

    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(predicates::str::contains("server:").eval(&contents));
    assert!(predicates::str::contains("base_url").eval(&contents));

    let reloaded = config::load(&config_path).expect("reload should succeed");
    assert_eq!(reloaded, cfg);
}

#[test]
fn unset_fields_are_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    config::save(&config_path, &Config::default()).unwrap();

    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(predicates::str::contains("language").not().eval(&contents));
}

/// Config path resolves to `~/.smartfarm-chat/config.yaml` under the home dir.
#[cfg(unix)]
#[test]
fn default_config_path_uses_home_directory() {
    let dir = tempfile::tempdir().unwrap();
    let original = std::env::var("HOME").ok();

    std::env::set_var("HOME", dir.path());
    let path = config::default_config_path();
    match original {
        Some(v) => std::env::set_var("HOME", v),
        None => std::env::remove_var("HOME"),
    }

    let path = path.expect("should resolve a config path");
    assert_eq!(path, dir.path().join(".smartfarm-chat").join("config.yaml"));
}
