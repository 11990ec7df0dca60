use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "fleurmod.config.json";

/// fleurmod configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Schema file for input validation; the bundled Fleur schema is used
    /// when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,

    /// Fail instead of warning when a modified input is invalid
    #[serde(default)]
    pub strict: bool,

    /// Directory, relative to the input directory, that receives frozen
    /// results
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

fn default_output_name() -> String {
    "fleurmod_out".to_string()
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
            Ok(Config::default())
        }
    }

    /// Absolute schema path, if one is configured
    pub fn schema_path(&self, cwd: &str) -> Option<PathBuf> {
        self.schema_path.as_ref().map(|p| PathBuf::from(cwd).join(p))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: None,
            strict: false,
            output_name: default_output_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "schemaPath": "schemas/fleur_input_0.31.json",
            "strict": true,
            "outputName": "frozen"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.schema_path.as_deref(), Some("schemas/fleur_input_0.31.json"));
        assert!(config.strict);
        assert_eq!(config.output_name, "frozen");
        assert_eq!(
            config.schema_path("/work"),
            Some(PathBuf::from("/work/schemas/fleur_input_0.31.json"))
        );
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output_name, "fleurmod_out");
        assert!(config.schema_path("/work").is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config, Config::default());
    }
}
