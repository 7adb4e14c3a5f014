//! gramstat.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GramstatConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("gramstat.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Packets per storage session.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Standard RSL attribute names in bit order. Seeded with
    /// `id = position` so the job manager's base bitfield decodes.
    #[serde(default)]
    pub standard_rsl_attributes: Vec<String>,
}

fn default_batch_size() -> usize {
    500
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            standard_rsl_attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl GramstatConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GramstatConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_uses_defaults() {
        let config: GramstatConfig = toml::from_str("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("gramstat.db"));
        assert_eq!(config.ingest.batch_size, 500);
        assert!(config.ingest.standard_rsl_attributes.is_empty());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[database]
path = "/var/lib/gramstat/usage.db"

[ingest]
batch_size = 50
standard_rsl_attributes = ["directory", "executable", "arguments"]

[logging]
filter = "gramstat=debug"
json = true
"#;
        let config: GramstatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ingest.batch_size, 50);
        assert_eq!(config.ingest.standard_rsl_attributes[1], "executable");
        assert!(config.logging.json);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = GramstatConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("gramstat.db"));
    }
}
