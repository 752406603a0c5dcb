use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, EnvVar, EnvVarSource, ObjectFieldSelector,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use super::SpecBuildError;

/// Key of the env-vars-metadata ConfigMap holding the metadata JSON
pub const METADATA_KEY: &str = "metadata";

pub const RADIX_APP_ENV: &str = "RADIX_APP";
pub const RADIX_ENVIRONMENT_ENV: &str = "RADIX_ENVIRONMENT";
pub const RADIX_COMPONENT_ENV: &str = "RADIX_COMPONENT";
pub const RADIX_DEPLOYMENT_ENV: &str = "RADIX_DEPLOYMENT";
pub const RADIX_JOB_NAME_ENV: &str = "RADIX_JOB_NAME";

pub fn env_vars_config_map_name(name: &str) -> String {
    format!("env-vars-{name}")
}

pub fn env_vars_metadata_config_map_name(name: &str) -> String {
    format!("env-vars-metadata-{name}")
}

/// Live values of a job component's `env-vars-*` ConfigMaps at create time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentEnvVars {
    pub data: BTreeMap<String, String>,

    /// Raw metadata JSON, if the component has any
    pub metadata: Option<String>,
}

impl ComponentEnvVars {
    pub fn from_config_maps(env_vars: Option<ConfigMap>, metadata: Option<ConfigMap>) -> Self {
        ComponentEnvVars {
            data: env_vars.and_then(|cm| cm.data).unwrap_or_default(),
            metadata: metadata
                .and_then(|cm| cm.data)
                .and_then(|mut data| data.remove(METADATA_KEY)),
        }
    }
}

/// Variables of the scheduled job: declared values overlaid with the live snapshot
pub fn merge_env_vars(
    declared: &BTreeMap<String, String>,
    snapshot: &ComponentEnvVars,
) -> BTreeMap<String, String> {
    let mut merged = declared.clone();
    merged.extend(snapshot.data.clone());
    merged
}

/// Metadata JSON restricted to the variables in `env_vars`
pub fn filter_metadata(
    metadata: Option<&str>,
    env_vars: &BTreeMap<String, String>,
) -> Result<Option<String>, SpecBuildError> {
    let Some(metadata) = metadata.filter(|m| !m.trim().is_empty()) else {
        return Ok(None);
    };
    let entries: BTreeMap<String, Value> =
        serde_json::from_str(metadata).map_err(SpecBuildError::InvalidEnvVarsMetadata)?;
    let filtered: BTreeMap<String, Value> = entries
        .into_iter()
        .filter(|(name, _)| env_vars.contains_key(name))
        .collect();
    serde_json::to_string(&filtered)
        .map(Some)
        .map_err(SpecBuildError::InvalidEnvVarsMetadata)
}

fn plain(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

pub(super) struct RadixEnv<'a> {
    pub app: &'a str,
    pub environment: &'a str,
    pub component: &'a str,
    pub deployment: &'a str,
}

/// Container environment. Component variables are read from the scheduled
/// job's own `env-vars-<name>` ConfigMap.
pub(super) fn container_env(
    radix: &RadixEnv<'_>,
    config_map_name: &str,
    env_vars: &BTreeMap<String, String>,
) -> Vec<EnvVar> {
    let mut env = vec![
        plain(RADIX_APP_ENV, radix.app),
        plain(RADIX_ENVIRONMENT_ENV, radix.environment),
        plain(RADIX_COMPONENT_ENV, radix.component),
        plain(RADIX_DEPLOYMENT_ENV, radix.deployment),
    ];
    env.extend(env_vars.keys().map(|key| EnvVar {
        name: key.clone(),
        value_from: Some(EnvVarSource {
            config_map_key_ref: Some(ConfigMapKeySelector {
                name: config_map_name.to_string(),
                key: key.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }));
    env.push(EnvVar {
        name: RADIX_JOB_NAME_ENV.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: "metadata.labels['job-name']".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    });
    env
}

pub(super) fn config_map(
    name: String,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    data: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_snapshot_overrides_declared_values() {
        let snapshot = ComponentEnvVars {
            data: vars(&[("LOG_LEVEL", "debug"), ("EXTRA", "1")]),
            metadata: None,
        };
        let merged = merge_env_vars(&vars(&[("LOG_LEVEL", "info"), ("MODE", "x")]), &snapshot);

        assert_eq!(
            merged,
            vars(&[("EXTRA", "1"), ("LOG_LEVEL", "debug"), ("MODE", "x")])
        );
    }

    #[test]
    fn test_filter_metadata_drops_unknown_variables() {
        let metadata = r#"{"LOG_LEVEL":{"radixConfigValue":"info"},"GONE":{"radixConfigValue":"x"}}"#;
        let filtered = filter_metadata(Some(metadata), &vars(&[("LOG_LEVEL", "debug")]))
            .unwrap()
            .unwrap();

        assert_eq!(filtered, r#"{"LOG_LEVEL":{"radixConfigValue":"info"}}"#);
    }

    #[test]
    fn test_filter_metadata_rejects_malformed_json() {
        let err = filter_metadata(Some("{not json"), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, SpecBuildError::InvalidEnvVarsMetadata(_)));
        assert_eq!(filter_metadata(None, &BTreeMap::new()).unwrap(), None);
    }

    #[test]
    fn test_container_env_order() {
        let radix = RadixEnv {
            app: "app",
            environment: "dev",
            component: "compute",
            deployment: "app-dev-abcd",
        };
        let env = container_env(&radix, "env-vars-job-1", &vars(&[("B", "2"), ("A", "1")]));
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(
            names,
            [
                RADIX_APP_ENV,
                RADIX_ENVIRONMENT_ENV,
                RADIX_COMPONENT_ENV,
                RADIX_DEPLOYMENT_ENV,
                "A",
                "B",
                RADIX_JOB_NAME_ENV
            ]
        );
        let reference = env[4]
            .value_from
            .as_ref()
            .and_then(|source| source.config_map_key_ref.as_ref())
            .unwrap();
        assert_eq!(reference.name, "env-vars-job-1");
        assert_eq!(reference.key, "A");
    }

    #[test]
    fn test_component_env_vars_from_config_maps() {
        let env_vars = config_map("env-vars-compute".to_string(), "ns", &BTreeMap::new(), vars(&[("A", "1")]));
        let metadata = config_map(
            "env-vars-metadata-compute".to_string(),
            "ns",
            &BTreeMap::new(),
            vars(&[(METADATA_KEY, "{}")]),
        );

        let snapshot = ComponentEnvVars::from_config_maps(Some(env_vars), Some(metadata));
        assert_eq!(snapshot.data, vars(&[("A", "1")]));
        assert_eq!(snapshot.metadata.as_deref(), Some("{}"));
        assert_eq!(
            ComponentEnvVars::from_config_maps(None, None),
            ComponentEnvVars::default()
        );
    }
}
