use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub events: EventsConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/livepoll.db".to_string(),
            max_connections: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Per-session event buffer before a slow subscriber is dropped.
    pub session_buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { session_buffer: 256 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_top_level_limit: i64,
    pub default_reply_limit: i64,
    pub max_page_limit: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_top_level_limit: 3,
            default_reply_limit: 2,
            max_page_limit: 50,
        }
    }
}

impl Config {
    /// Missing file means defaults; a present but malformed file is an
    /// error rather than a silent fallback.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            tracing::info!(path, "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {path}"))?;
        toml::from_str(&contents).with_context(|| format!("could not parse config file {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load("/definitely/not/there.toml").expect("defaults");
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.pagination.default_top_level_limit, 3);
        assert_eq!(config.pagination.default_reply_limit, 2);
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "[server]\nbind_address = \"0.0.0.0:9000\"\n\n[events]\nsession_buffer = 32\n"
        )
        .expect("write");

        let config = Config::load(file.path().to_str().unwrap()).expect("load");
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.events.session_buffer, 32);
        assert_eq!(config.database.max_connections, 8);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "server = \"not a table\"").expect("write");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }
}
