use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request body of `POST /batches`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchScheduleDescription {
    #[serde(default)]
    pub job_schedule_descriptions: Vec<JobScheduleDescription>,

    /// Applied to every job that does not carry its own configuration
    #[serde(default, rename = "defaultRadixJobComponentConfig")]
    pub default_config: RadixJobComponentConfig,
}

/// Request body of `POST /jobs`, and one entry of a batch
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobScheduleDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    #[serde(flatten)]
    pub config: RadixJobComponentConfig,
}

/// Per-job overrides of the job component's defaults
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RadixJobComponentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<RadixNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<i64>,
}

/// Resource name (`cpu`, `memory`, ...) to quantity string
pub type ResourceList = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub limits: ResourceList,

    #[serde(default)]
    pub requests: ResourceList,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

/// GPU node selection
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RadixNode {
    /// Comma separated GPU node types; a leading `-` excludes a type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_count: Option<String>,
}

impl BatchScheduleDescription {
    pub fn has_jobs(&self) -> bool {
        !self.job_schedule_descriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_batch_schedule_description() {
        let json_data = r#"{
            "jobScheduleDescriptions": [
                {"jobId": "job1", "payload": "{\"x\":1}", "timeLimitSeconds": 30},
                {"payload": "plain", "node": {"gpu": "nvidia-v100", "gpuCount": "2"}}
            ],
            "defaultRadixJobComponentConfig": {
                "resources": {"requests": {"cpu": "100m", "memory": "64Mi"}}
            }
        }"#;

        let description: BatchScheduleDescription = serde_json::from_str(json_data).unwrap();

        assert_eq!(description.job_schedule_descriptions.len(), 2);
        let first = &description.job_schedule_descriptions[0];
        assert_eq!(first.job_id.as_deref(), Some("job1"));
        assert_eq!(first.config.time_limit_seconds, Some(30));
        let second = &description.job_schedule_descriptions[1];
        assert_eq!(
            second.config.node.as_ref().unwrap().gpu_count.as_deref(),
            Some("2")
        );
        let resources = description.default_config.resources.unwrap();
        assert_eq!(resources.requests.get("cpu").map(String::as_str), Some("100m"));
        assert!(resources.limits.is_empty());
    }

    #[test]
    fn test_deserialize_empty_object() {
        let description: BatchScheduleDescription = serde_json::from_str("{}").unwrap();
        assert_eq!(description, BatchScheduleDescription::default());
        assert!(!description.has_jobs());
    }
}
