use super::*;
use std::collections::HashMap;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = HarbourConfig::default();
    assert!(config.guild_id.is_empty());
    assert_eq!(config.api.request_delay_secs, 60);
    assert_eq!(config.api.retry_base_delay_secs, 60);
    assert_eq!(config.api.max_retries, 3);
    assert_eq!(config.poll.interval_secs, 300);
    assert_eq!(config.chronicle.max_attempts, 4);
    assert_eq!(config.chronicle.scope, ChronicleScopeSetting::Ship);
    assert_eq!(config.log.level, "info");
}

#[test]
fn test_parse_toml() {
    let toml_str = r#"
guild_id = "ad449ba1"

[api]
request_delay_secs = 30
localization = "de"

[poll]
interval_secs = 120

[chronicle]
scope = "guild"
"#;
    let config: HarbourConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.guild_id, "ad449ba1");
    assert_eq!(config.api.request_delay(), Duration::from_secs(30));
    assert_eq!(config.api.retry_base_delay(), Duration::from_secs(60));
    assert_eq!(config.api.localization, "de");
    assert_eq!(config.poll.interval(), Duration::from_secs(120));
    assert_eq!(config.chronicle.scope, ChronicleScopeSetting::Guild);
    assert_eq!(config.chronicle.max_attempts, 4);
}

#[test]
fn test_default_template_parses() {
    let config: HarbourConfig = toml::from_str(&HarbourConfig::default_template()).unwrap();
    assert_eq!(config.api.request_delay_secs, 60);
    assert_eq!(config.poll.interval_secs, 300);
}

#[test]
fn test_load_from_file() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.toml");
    std::fs::write(&path, "guild_id = \"g-1\"\n[poll]\ninterval_secs = 10\n").unwrap();
    let config = HarbourConfig::load_from(&path).unwrap();
    assert_eq!(config.guild_id, "g-1");
    assert_eq!(config.poll.interval_secs, 10);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let td = tempdir().unwrap();
    let err = HarbourConfig::load_from(&td.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config"));
}

#[test]
fn test_load_malformed_file_fails() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.toml");
    std::fs::write(&path, "guild_id = [").unwrap();
    let err = HarbourConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [(ENV_GUILD, " g-env "), (ENV_COOKIE, "rat=abc")].into();
    let mut config = HarbourConfig {
        guild_id: "g-file".into(),
        ..Default::default()
    };
    config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.guild_id, "g-env");
    assert_eq!(config.api.cookie, "rat=abc");
}

#[test]
fn test_blank_env_does_not_override() {
    let env: HashMap<&str, &str> = [(ENV_GUILD, "  ")].into();
    let mut config = HarbourConfig {
        guild_id: "g-file".into(),
        ..Default::default()
    };
    config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.guild_id, "g-file");
}

#[test]
fn test_validate_requires_guild() {
    let config = HarbourConfig::default();
    assert!(matches!(config.validate(), Err(AppError::MissingGuild)));
}

#[test]
fn test_validate_rejects_zero_intervals() {
    let mut config = HarbourConfig {
        guild_id: "g".into(),
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    config.poll.interval_secs = 0;
    assert!(matches!(
        config.validate(),
        Err(AppError::InvalidConfig(msg)) if msg.contains("poll.interval_secs")
    ));

    config.poll.interval_secs = 300;
    config.api.request_delay_secs = 0;
    assert!(matches!(
        config.validate(),
        Err(AppError::InvalidConfig(msg)) if msg.contains("request_delay_secs")
    ));
}
