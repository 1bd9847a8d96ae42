use serde::Deserialize;
use std::path::Path;

/// CLI configuration: default session keys and log level. All sections are
/// optional; CLI flags take precedence over anything set here.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    pub app_s_key: Option<String>,
    pub nwk_s_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.keys.app_s_key.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [keys]
            app_s_key = "ec925802ae430ca77fd3dd73cb2cc588"
            nwk_s_key = "44024241ed4ce9a68c6a8bc055233fd3"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert!(config.keys.app_s_key.is_some());
        assert_eq!(config.logging.level, "debug");
    }
}
