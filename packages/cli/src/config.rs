use gridweave_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "gridweave.config.json";

/// Gridweave configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Engine tuning passed to every opened table
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "engine": { "defaultColumnWidth": 120, "undoCaptureTimeoutMs": 0, "clientId": 42 },
            "logLevel": "debug"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.engine.default_column_width, 120.0);
        assert_eq!(config.engine.undo_capture_timeout_ms, 0);
        assert_eq!(config.engine.client_id, Some(42));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        let missing = Config::load(&cwd).unwrap();
        assert_eq!(missing.log_level, "warn");

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "logLevel": "info" }"#).unwrap();
        let loaded = Config::load(&cwd).unwrap();
        assert_eq!(loaded.log_level, "info");
        assert_eq!(loaded.engine.default_column_width, 150.0);
    }
}
