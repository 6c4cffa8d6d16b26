use petal_runtime::AppConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "petal.config.json";

/// Petal configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Options handed to every mounted app
    #[serde(default)]
    pub runtime: AppConfig,

    /// Extensions `petal check` picks up when given a directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "htm".to_string()]
}

impl Config {
    /// Load config from a directory, or from an explicit file when one is
    /// given. A missing default file yields the defaults; a missing explicit
    /// file is an error.
    pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => PathBuf::from(cwd).join(path),
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "Loaded config");
            Ok(config)
        } else if explicit.is_some() {
            Err(anyhow::anyhow!(
                "Config file not found: {}",
                config_path.display()
            ))
        } else {
            Ok(Config::default())
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: AppConfig::default(),
            extensions: default_extensions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "runtime": { "delimiters": ["[[", "]]"], "maxJobRuns": 10 },
            "extensions": ["tpl"]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.runtime.delimiters, ["[[".to_string(), "]]".to_string()]);
        assert_eq!(config.runtime.max_job_runs, 10);
        assert_eq!(config.runtime.expression_cache_capacity, 512);
        assert_eq!(config.extensions, vec!["tpl"]);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string(), None).unwrap();
        assert_eq!(config.runtime, AppConfig::default());
        assert!(config.accepts(Path::new("index.html")));
        assert!(!config.accepts(Path::new("main.rs")));
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.json"),
            r#"{ "runtime": { "expressionCacheCapacity": 0 } }"#,
        )
        .unwrap();
        let cwd = dir.path().display().to_string();

        let config = Config::load(&cwd, Some(Path::new("custom.json"))).unwrap();
        assert_eq!(config.runtime.expression_cache_capacity, 0);
        assert_eq!(config.extensions, vec!["html", "htm"]);

        assert!(Config::load(&cwd, Some(Path::new("nope.json"))).is_err());
    }
}
