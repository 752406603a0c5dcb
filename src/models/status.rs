use std::collections::HashMap;

use chrono::SecondsFormat;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::{Deserialize, Serialize};

use crate::kubernetes_objects::labels::K8S_JOB_NAME_LABEL;

/// Lifecycle stage of a batch or job as observed on its Kubernetes Job
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Waiting,
    Running,
    Succeeded,
    Failed,
}

/// Status view of a scheduled job. Never stored, recomputed on every request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<String>,

    pub status: JobPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    #[serde(flatten)]
    pub job_status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_statuses: Option<Vec<JobStatus>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Success,
    Failure,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReason {
    NotFound,
    Invalid,
    Unknown,
}

/// Envelope returned by delete and by every failed request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Status {
    pub code: u16,
    pub status: StatusOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    pub message: String,
}

impl Status {
    pub fn success(message: impl Into<String>) -> Self {
        Status {
            code: 200,
            status: StatusOutcome::Success,
            reason: None,
            message: message.into(),
        }
    }

    pub fn failure(code: u16, reason: StatusReason, message: impl Into<String>) -> Self {
        Status {
            code,
            status: StatusOutcome::Failure,
            reason: Some(reason),
            message: message.into(),
        }
    }
}

impl JobStatus {
    pub fn from_job(job: &Job, pods: &[Pod]) -> JobStatus {
        let status = job.status.clone().unwrap_or_default();
        let phase = if status.failed.unwrap_or(0) > 0 {
            JobPhase::Failed
        } else if status.succeeded.unwrap_or(0) > 0 {
            JobPhase::Succeeded
        } else if status.active.unwrap_or(0) > 0 {
            JobPhase::Running
        } else {
            JobPhase::Waiting
        };

        let failed_condition = status
            .conditions
            .as_ref()
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Failed"));

        let ended = match phase {
            JobPhase::Failed => failed_condition
                .and_then(|c| c.last_transition_time.as_ref())
                .or(status.completion_time.as_ref()),
            JobPhase::Succeeded => status.completion_time.as_ref(),
            JobPhase::Waiting | JobPhase::Running => None,
        };

        let message = match phase {
            JobPhase::Failed => failed_condition
                .and_then(|c| c.message.clone())
                .or_else(|| pod_message(pods)),
            JobPhase::Succeeded => None,
            JobPhase::Waiting | JobPhase::Running => pod_message(pods),
        };

        JobStatus {
            name: job.metadata.name.clone().unwrap_or_default(),
            created: job.metadata.creation_timestamp.as_ref().map(format_time),
            started: status.start_time.as_ref().map(format_time),
            ended: ended.map(format_time),
            status: phase,
            message,
        }
    }
}

impl BatchStatus {
    pub fn from_job(job: &Job, pods: &[Pod]) -> BatchStatus {
        BatchStatus {
            job_status: JobStatus::from_job(job, pods),
            job_statuses: None,
        }
    }
}

/// Groups pods by the Job that created them
pub fn pods_by_job_name(pods: Vec<Pod>) -> HashMap<String, Vec<Pod>> {
    let mut map: HashMap<String, Vec<Pod>> = HashMap::new();
    for pod in pods {
        let Some(job_name) = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(K8S_JOB_NAME_LABEL))
            .filter(|name| !name.is_empty())
            .cloned()
        else {
            continue;
        };
        map.entry(job_name).or_default().push(pod);
    }
    map
}

/// RFC 3339 with second precision and a `Z` suffix
fn format_time(time: &Time) -> String {
    time.0.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First explanation a pod gives for not running or for failing
fn pod_message(pods: &[Pod]) -> Option<String> {
    pods.iter()
        .filter_map(|pod| pod.status.as_ref()?.container_statuses.as_ref())
        .flatten()
        .filter_map(|container| container.state.as_ref())
        .find_map(|state| {
            if let Some(waiting) = &state.waiting
                && waiting.reason.as_deref() != Some("ContainerCreating")
            {
                return waiting.message.clone().or_else(|| waiting.reason.clone());
            }
            if let Some(terminated) = &state.terminated
                && terminated.exit_code != 0
            {
                return terminated
                    .message
                    .clone()
                    .or_else(|| terminated.reason.clone());
            }
            None
        })
}
