use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::schedule::{RadixNode, ResourceRequirements};

/// Deployment of a Radix application environment.
///
/// Owned by the Radix operator; the scheduler only reads it.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema)]
#[kube(
    group = "radix.equinor.com",
    version = "v1",
    kind = "RadixDeployment",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RadixDeploymentSpec {
    #[serde(rename = "appname")]
    pub app_name: String,

    pub environment: String,

    #[serde(default)]
    pub image_pull_secrets: Vec<ImagePullSecret>,

    #[serde(default)]
    pub jobs: Vec<RadixDeployJobComponent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ImagePullSecret {
    pub name: String,
}

/// Template for every job scheduled by this component
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RadixDeployJobComponent {
    pub name: String,

    pub image: String,

    #[serde(default)]
    pub ports: Vec<ComponentPort>,

    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,

    #[serde(default)]
    pub resources: Option<ResourceRequirements>,

    #[serde(default)]
    pub volume_mounts: Vec<RadixVolumeMount>,

    #[serde(default)]
    pub node: Option<RadixNode>,

    /// Where a single job's payload is mounted. Jobs get no payload without it.
    #[serde(default)]
    pub payload: Option<RadixJobComponentPayload>,

    #[serde(default)]
    pub time_limit_seconds: Option<i64>,

    #[serde(default)]
    pub run_as_non_root: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ComponentPort {
    pub name: String,
    pub port: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RadixVolumeMount {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size_limit: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct RadixJobComponentPayload {
    pub path: String,
}

impl RadixDeployment {
    pub fn job_component(&self, name: &str) -> Option<&RadixDeployJobComponent> {
        self.spec.jobs.iter().find(|job| job.name == name)
    }
}

impl RadixDeployJobComponent {
    /// Payload mount path, if the component declares a non-blank one
    pub fn payload_path(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .map(|payload| payload.path.trim())
            .filter(|path| !path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_radix_deployment() {
        let yaml_data = r#"
          apiVersion: radix.equinor.com/v1
          kind: RadixDeployment
          metadata:
            name: app-dev-abcd1234
            namespace: app-dev
          spec:
            appname: app
            environment: dev
            jobs:
              - name: compute
                image: radixcanary.azurecr.io/compute:latest
                ports:
                  - name: http
                    port: 8080
                environmentVariables:
                  LOG_LEVEL: info
                payload:
                  path: /compute/args
        "#;

        let rd: RadixDeployment = serde_yaml::from_str(yaml_data).unwrap();

        assert_eq!(rd.spec.app_name, "app");
        let component = rd.job_component("compute").unwrap();
        assert_eq!(component.ports[0].port, 8080);
        assert_eq!(component.payload_path(), Some("/compute/args"));
        assert!(rd.job_component("missing").is_none());
    }

    #[test]
    fn test_blank_payload_path_is_ignored() {
        let component = RadixDeployJobComponent {
            payload: Some(RadixJobComponentPayload {
                path: "  ".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(component.payload_path(), None);
    }
}
