use std::collections::BTreeMap;
use std::fmt::Display;

use super::labels::{
    RADIX_APP_LABEL, RADIX_BATCH_NAME_LABEL, RADIX_COMPONENT_LABEL, RADIX_JOB_NAME_LABEL,
    RADIX_JOB_TYPE_JOB_SCHEDULE, RADIX_JOB_TYPE_LABEL,
};
use super::selector::LabelSelector;

/// Mount path of a batch's schedule description secret
pub const BATCH_PAYLOAD_MOUNT_PATH: &str = "/mnt/secrets";

/// The two kinds of workload a job component can schedule.
///
/// Both are plain Kubernetes Jobs; they differ in naming, labels, payload
/// handling and in the history limit applied to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledKind {
    Batch,
    Job,
}

impl ScheduledKind {
    /// Label holding the batch or job name on every resource belonging to it
    pub fn name_label(self) -> &'static str {
        match self {
            ScheduledKind::Batch => RADIX_BATCH_NAME_LABEL,
            ScheduledKind::Job => RADIX_JOB_NAME_LABEL,
        }
    }

    pub fn name_prefix(self) -> Option<&'static str> {
        match self {
            ScheduledKind::Batch => Some("batch"),
            ScheduledKind::Job => None,
        }
    }

    pub fn payload_secret_key(self) -> &'static str {
        match self {
            ScheduledKind::Batch => "batchScheduleDescription",
            ScheduledKind::Job => "payload",
        }
    }

    pub fn payload_secret_name(self, name: &str) -> String {
        format!("{name}-payloads")
    }

    /// Selects every job of this kind scheduled by `component_name`
    pub fn selector(self, component_name: &str) -> LabelSelector {
        let selector = LabelSelector::new()
            .equals(RADIX_COMPONENT_LABEL, component_name)
            .equals(RADIX_JOB_TYPE_LABEL, RADIX_JOB_TYPE_JOB_SCHEDULE)
            .exists(self.name_label());
        match self {
            ScheduledKind::Batch => selector,
            ScheduledKind::Job => selector.does_not_exist(RADIX_BATCH_NAME_LABEL),
        }
    }

    /// Selects the secondary resources (secrets, services) of one batch or job
    pub fn owned_resources_selector(self, name: &str) -> LabelSelector {
        LabelSelector::new().equals(self.name_label(), name)
    }

    pub fn labels(self, app_name: &str, component_name: &str, name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (RADIX_APP_LABEL.to_string(), app_name.to_string()),
            (RADIX_COMPONENT_LABEL.to_string(), component_name.to_string()),
            (
                RADIX_JOB_TYPE_LABEL.to_string(),
                RADIX_JOB_TYPE_JOB_SCHEDULE.to_string(),
            ),
            (self.name_label().to_string(), name.to_string()),
        ])
    }
}

impl Display for ScheduledKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduledKind::Batch => f.write_str("batch"),
            ScheduledKind::Job => f.write_str("job"),
        }
    }
}
