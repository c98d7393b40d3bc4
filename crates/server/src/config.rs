use std::{collections::HashMap, fs};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/catalog.db".into(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Defaults, then `server.toml`, then `PORT`/`DATABASE_URL`, then `APP__*` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from(file.as_deref(), std::env::vars().collect())
}

pub(crate) fn settings_from(
    file: Option<&str>,
    vars: HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let mut builder = Config::builder()
        .set_default("server_bind", defaults.server_bind)?
        .set_default("database_url", defaults.database_url)?
        .set_default("max_body_bytes", defaults.max_body_bytes as i64)?;

    if let Some(raw) = file {
        builder = builder.add_source(File::from_str(raw, FileFormat::Toml));
    }

    let mut conventional = HashMap::new();
    if let Some(port) = vars.get("PORT") {
        conventional.insert("SERVER_BIND".to_string(), format!("0.0.0.0:{}", port.trim()));
    }
    if let Some(url) = vars.get("DATABASE_URL") {
        conventional.insert("DATABASE_URL".to_string(), url.clone());
    }

    let settings = builder
        .add_source(Environment::default().source(Some(conventional)))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars)),
        )
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize::<Settings>()
        .context("invalid server settings")?;
    Ok(settings)
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }
    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    let path = if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        path
    } else if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    } else {
        raw_database_url
    };

    let path = path.replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
