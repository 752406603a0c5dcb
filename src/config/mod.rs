mod raw;

use std::path::Path;

use thiserror::Error;
use tracing::instrument;

use self::raw::RawConfig;

pub use self::raw::ConfigParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub namespace: String,
    pub deployment_name: String,
    pub component_name: String,
    pub port: u16,
    pub batch_history_limit: usize,
    pub job_history_limit: usize,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ConfigParseError,
    },
}

impl Config {
    #[instrument("config/load", skip(path), fields(config_path = %path.as_ref().display()))]
    pub async fn new_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigLoadError::Read {
                path: display.clone(),
                source,
            })?;
        Self::from_yaml(&content, &display)
    }

    fn from_yaml(content: &str, path: &str) -> Result<Self, ConfigLoadError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigLoadError::Deserialize {
                path: path.to_string(),
                source,
            })?;
        Config::try_from(raw).map_err(|source| ConfigLoadError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_config_file() {
        let path = std::env::temp_dir().join(format!(
            "radix-job-scheduler-config-{}.yaml",
            std::process::id()
        ));
        tokio::fs::write(
            &path,
            "namespace: app-dev\ndeploymentName: app-dev-abcd1234\ncomponentName: compute\nport: 9000\n",
        )
        .await
        .unwrap();

        let config = Config::new_from_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(
            config,
            Config {
                namespace: "app-dev".to_string(),
                deployment_name: "app-dev-abcd1234".to_string(),
                component_name: "compute".to_string(),
                port: 9000,
                batch_history_limit: 10,
                job_history_limit: 10,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = Config::new_from_file("/nonexistent/radix-job-scheduler.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Read { .. }));
    }

    #[test]
    fn test_missing_required_key() {
        assert!(matches!(
            Config::from_yaml("namespace: app-dev\n", "config.yaml"),
            Err(ConfigLoadError::Deserialize { .. })
        ));
    }
}
