use serde::Deserialize;
use thiserror::Error;

use super::Config;

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawConfig {
    /// Namespace of the Radix application environment
    pub(super) namespace: String,

    /// RadixDeployment the job component is read from
    pub(super) deployment_name: String,

    /// Job component this scheduler serves
    pub(super) component_name: String,

    #[serde(default = "default_port")]
    pub(super) port: u16,

    #[serde(default = "default_history_limit")]
    pub(super) batch_history_limit: i64,

    #[serde(default = "default_history_limit")]
    pub(super) job_history_limit: i64,
}

const fn default_port() -> u16 {
    8080
}
const fn default_history_limit() -> i64 {
    10
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("'{key}' must not be empty")]
    EmptyValue { key: &'static str },

    #[error("'{key}' must not be negative, got {value}")]
    NegativeHistoryLimit { key: &'static str, value: i64 },
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigParseError::EmptyValue { key });
    }
    Ok(trimmed.to_string())
}

fn history_limit(key: &'static str, value: i64) -> Result<usize, ConfigParseError> {
    usize::try_from(value).map_err(|_| ConfigParseError::NegativeHistoryLimit { key, value })
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigParseError;
    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(Config {
            namespace: non_empty("namespace", raw.namespace)?,
            deployment_name: non_empty("deploymentName", raw.deployment_name)?,
            component_name: non_empty("componentName", raw.component_name)?,
            port: raw.port,
            batch_history_limit: history_limit("batchHistoryLimit", raw.batch_history_limit)?,
            job_history_limit: history_limit("jobHistoryLimit", raw.job_history_limit)?,
        })
    }
}
