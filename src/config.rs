use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service configuration.
///
/// Sources, lowest precedence first: the TOML file, then `HUNTERS_*`
/// environment variables. Store locations have no defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterConfig {
    /// Document store URI, e.g. `sqlite://data/documents.db`
    pub document_uri: Option<String>,

    /// Relational store URL, e.g. `sqlite://data/relational.db`
    pub relational_url: Option<String>,

    /// Address to bind the HTTP server to
    pub host: String,

    pub port: u16,

    /// Upper bound for a single store call, in milliseconds
    pub store_timeout_ms: u64,
}

pub const ENV_PREFIX: &str = "HUNTERS";

const TEMPLATE_HEADER: &str = r#"### hunters configuration file
###
### Every key can be overridden with an environment variable prefixed
### HUNTERS_, e.g. HUNTERS_PORT=8080. A .env file is read first.
###
### document_uri and relational_url are required; a store left out here
### stays offline and the service starts degraded.

"#;

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            document_uri: None,
            relational_url: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            store_timeout_ms: 5000,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("hunters.toml")
}

impl HunterConfig {
    /// Load the configuration from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<HunterConfig> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load_from(path, vars)
    }

    /// Same as [`HunterConfig::load`] with an explicit environment.
    pub fn load_from(path: Option<&Path>, env: HashMap<String, String>) -> Result<HunterConfig> {
        let mut builder = Config::builder();

        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if path.exists() {
            let path_str = path
                .to_str()
                .ok_or_else(|| anyhow!("Could not convert path to string"))?;
            builder = builder.add_source(config::File::with_name(path_str).format(config::FileFormat::Toml));
        }

        // E.g., `HUNTERS_PORT=8080 hunters serve` would set the port
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(env)));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let defaults = HunterConfig::default();

        let port = match values.get("port") {
            Some(p) => p.parse().map_err(|e| anyhow!("Invalid port '{}': {}", p, e))?,
            None => defaults.port,
        };

        let store_timeout_ms = match values.get("store_timeout_ms") {
            Some(t) => t
                .parse()
                .map_err(|e| anyhow!("Invalid store_timeout_ms '{}': {}", t, e))?,
            None => defaults.store_timeout_ms,
        };

        Ok(HunterConfig {
            document_uri: non_empty(values.get("document_uri")),
            relational_url: non_empty(values.get("relational_url")),
            host: values.get("host").cloned().unwrap_or(defaults.host),
            port,
            store_timeout_ms,
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn write_config(path: &Path, config: &HunterConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let mut contents = TEMPLATE_HEADER.to_string();
    contents.push_str(&toml::to_string_pretty(config)?);
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_leave_stores_unset() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let config = HunterConfig::load_from(Some(absent.as_path()), env(&[])).unwrap();

        assert_eq!(config.document_uri, None);
        assert_eq!(config.relational_url, None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hunters.toml");
        std::fs::write(
            &path,
            "document_uri = \"sqlite://file-docs.db\"\nport = 4000\n",
        )
        .unwrap();

        let config = HunterConfig::load_from(
            Some(path.as_path()),
            env(&[
                ("HUNTERS_PORT", "8080"),
                ("HUNTERS_RELATIONAL_URL", "sqlite::memory:"),
            ]),
        )
        .unwrap();

        assert_eq!(config.document_uri.as_deref(), Some("sqlite://file-docs.db"));
        assert_eq!(config.relational_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_blank_store_uri_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = HunterConfig::load_from(
            Some(dir.path().join("absent.toml").as_path()),
            env(&[("HUNTERS_DOCUMENT_URI", "  ")]),
        )
        .unwrap();
        assert_eq!(config.document_uri, None);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = HunterConfig::load_from(
            Some(dir.path().join("absent.toml").as_path()),
            env(&[("HUNTERS_PORT", "not-a-port")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_write_config_round_trip_and_no_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hunters.toml");
        let config = HunterConfig {
            document_uri: Some("sqlite://docs.db".to_string()),
            relational_url: Some("sqlite://rows.db".to_string()),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = HunterConfig::load_from(Some(path.as_path()), env(&[])).unwrap();
        assert_eq!(loaded, config);
    }
}
