use super::{normalize_database_url, prepare_database_url, settings_from, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn temp_root(label: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("catalog_server_{label}_{suffix}"))
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let settings = settings_from(None, HashMap::new()).expect("settings");
    assert_eq!(settings, Settings::default());
}

#[test]
fn settings_file_overrides_defaults() {
    let file = r#"
        server_bind = "0.0.0.0:7000"
        max_body_bytes = 2048
    "#;
    let settings = settings_from(Some(file), HashMap::new()).expect("settings");
    assert_eq!(settings.server_bind, "0.0.0.0:7000");
    assert_eq!(settings.max_body_bytes, 2048);
    assert_eq!(settings.database_url, Settings::default().database_url);
}

#[test]
fn port_and_database_url_override_file() {
    let file = r#"database_url = "sqlite://./from-file.db""#;
    let settings = settings_from(
        Some(file),
        vars(&[("PORT", "8080"), ("DATABASE_URL", "sqlite://./from-env.db")]),
    )
    .expect("settings");
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.database_url, "sqlite://./from-env.db");
}

#[test]
fn prefixed_environment_wins_over_conventional_variables() {
    let settings = settings_from(
        None,
        vars(&[
            ("PORT", "8080"),
            ("APP__SERVER_BIND", "127.0.0.1:9000"),
            ("APP__MAX_BODY_BYTES", "4096"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.server_bind, "127.0.0.1:9000");
    assert_eq!(settings.max_body_bytes, 4096);
}

#[test]
fn rejects_non_numeric_body_limit() {
    let result = settings_from(None, vars(&[("APP__MAX_BODY_BYTES", "lots")]));
    assert!(result.is_err());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_and_foreign_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("  "),
        Settings::default().database_url
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn converts_sqlite_double_slash_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let root = temp_root("prepare");
    let db_path = root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(root.join("data").exists());

    fs::remove_dir_all(root).expect("cleanup");
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let root = temp_root("open");
    let db_path = root.join("nested").join("server.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(root).expect("cleanup");
}
