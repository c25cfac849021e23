use super::*;
use std::fs;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("core_path: core\nshard_path: shard\n").unwrap();
    assert_eq!(config.core_path.as_deref(), Some("core"));
    assert_eq!(config.threads, 4);
    assert_eq!(config.lock_timeout(), Duration::from_secs(10));
    assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    assert!(config.target.is_none());
    assert!(config.shards.is_empty());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
core_path: migrations/core
shard_path: migrations/shard
threads: 8
connect_timeout_ms: 250
lock_timeout_ms: 500
lock_poll_interval_ms: 20
target: "2.1"
shards:
  - id: eu_1
    path: data/eu_1.duckdb
  - id: us_1
    path: ":memory:"
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.threads, 8);
    assert_eq!(config.lock_poll_interval(), Duration::from_millis(20));
    assert_eq!(config.target, Some(Version::parse("2.1").unwrap()));
    assert_eq!(config.shards.len(), 2);
    assert_eq!(config.shards[0].id, "eu_1");
}

#[test]
fn test_integer_target() {
    let config: Config = serde_yaml::from_str("target: 3").unwrap();
    assert_eq!(config.target, Some(Version::parse("3").unwrap()));
}

#[test]
fn test_unknown_field_rejected() {
    assert!(serde_yaml::from_str::<Config>("core_pth: core").is_err());
}

#[test]
fn test_invalid_shard_id_rejected() {
    let yaml = "shards:\n  - id: \"bad id\"\n    path: x.duckdb\n";
    assert!(serde_yaml::from_str::<Config>(yaml).is_err());
}

#[test]
fn test_validate_rejects_duplicate_shards() {
    let yaml = r#"
shards:
  - id: a
    path: a.duckdb
  - id: a
    path: b.duckdb
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate shard id 'a'"));
}

#[test]
fn test_validate_rejects_zero_threads() {
    let config: Config = serde_yaml::from_str("threads: 0").unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_zero_timeouts() {
    for field in ["connect_timeout_ms", "lock_timeout_ms", "lock_poll_interval_ms"] {
        let config: Config = serde_yaml::from_str(&format!("{field}: 0")).unwrap();
        match config.validate() {
            Err(CoreError::ConfigInvalid { message }) => {
                assert_eq!(message, format!("{field} must be at least 1"))
            }
            other => panic!("{field}: expected ConfigInvalid, got {other:?}"),
        }
    }
    let config: Config = serde_yaml::from_str("connect_timeout_ms: 1\nlock_timeout_ms: 1").unwrap();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_empty_shard_path() {
    let config: Config = serde_yaml::from_str("shards:\n  - id: a\n    path: \"  \"\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_shard_descriptors_resolve_relative_paths() {
    let yaml = r#"
shards:
  - id: rel
    path: data/rel.duckdb
  - id: abs
    path: /var/lib/abs.duckdb
  - id: mem
    path: ":memory:"
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let root = Path::new("/srv/project");
    let shards = config.shard_descriptors(root);
    assert_eq!(shards[0].path, root.join("data/rel.duckdb").display().to_string());
    assert_eq!(shards[1].path, "/var/lib/abs.duckdb");
    assert!(shards[2].is_in_memory());
}

#[test]
fn test_migration_paths_resolved_against_root() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("core")).unwrap();
    fs::create_dir(root.path().join("shard")).unwrap();
    let config: Config = serde_yaml::from_str("core_path: core\nshard_path: shard\n").unwrap();
    let paths = config.migration_paths(root.path()).unwrap();
    assert_eq!(paths.core_path(), root.path().join("core"));
    assert_eq!(paths.shard_path(), root.path().join("shard"));
}

#[test]
fn test_migration_paths_missing_setting() {
    let root = tempfile::tempdir().unwrap();
    let config: Config = serde_yaml::from_str("core_path: core\n").unwrap();
    let err = config.migration_paths(root.path()).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_load_from_dir() {
    let root = tempfile::tempdir().unwrap();
    fs::write(
        root.path().join("shardway.yaml"),
        "threads: 2\nshards:\n  - id: s1\n    path: s1.duckdb\n",
    )
    .unwrap();
    let config = Config::load_from_dir(root.path()).unwrap();
    assert_eq!(config.threads, 2);
}

#[test]
fn test_load_from_dir_not_found() {
    let root = tempfile::tempdir().unwrap();
    let err = Config::load_from_dir(root.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_reports_parse_error_with_path() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("shardway.yml");
    fs::write(&path, "threads: [not a number]").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
    assert!(err.to_string().contains("shardway.yml"));
}
