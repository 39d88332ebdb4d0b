use dupsift::config::{Config, ConfigError};
use dupsift::duplicates::RunMode;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.min_size, 1);
    assert!(config.limit.is_none());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPSIFT_TEST_ENV_MAX_OPEN_HANDLES", "32");
    std::env::set_var("DUPSIFT_TEST_ENV_LIMIT", "500");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("DUPSIFT_TEST_ENV_").split("__"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.max_open_handles, 32);
    assert_eq!(config.limit, Some(500));

    std::env::remove_var("DUPSIFT_TEST_ENV_MAX_OPEN_HANDLES");
    std::env::remove_var("DUPSIFT_TEST_ENV_LIMIT");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
min_size = 4096
piece_size = 1048576
piece_count = 2
follow_symlinks = true
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.min_size, 4096);
    assert_eq!(config.piece_size, 1_048_576);
    assert_eq!(config.piece_count, 2);
    assert!(config.follow_symlinks);
    // Unset keys keep their defaults
    assert_eq!(config.io_threads, 4);
}

#[test]
fn test_toml_layer_does_not_touch_unrelated_keys() {
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string("io_threads = 12"));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.io_threads, 12);
    assert_eq!(config.piece_count, Config::default().piece_count);
}

#[test]
fn test_missing_explicit_config_is_error() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    assert!(matches!(
        Config::load(Some(&missing)),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_malformed_config_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "piece_count = \"many\"").unwrap();

    assert!(matches!(
        Config::load(Some(&config_path)),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_validate_rejects_zero_piece_size() {
    let config = Config {
        piece_size: 0,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "piece_size",
            ..
        })
    ));
}

#[test]
fn test_finder_config_carries_settings() {
    let config = Config {
        min_size: 10,
        io_threads: 2,
        limit: Some(7),
        ..Config::default()
    };
    let mode = RunMode::from_flags(true, false, false).unwrap();
    let finder_config = config.finder_config(mode);

    assert_eq!(finder_config.min_size, 10);
    assert_eq!(finder_config.io_threads, 2);
    assert_eq!(finder_config.walker_config.limit, Some(7));
    assert!(finder_config.mode.quickstat);
}

#[test]
fn test_run_mode_dependencies() {
    assert!(RunMode::from_flags(false, true, false).is_err());
    assert!(RunMode::from_flags(true, false, true).is_err());
    assert!(RunMode::from_flags(false, false, true).is_err());
    assert!(RunMode::from_flags(true, true, true).is_ok());
}
