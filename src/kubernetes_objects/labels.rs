//! Label keys and values shared by every resource the scheduler creates.

pub const RADIX_APP_LABEL: &str = "radix-app";
pub const RADIX_COMPONENT_LABEL: &str = "radix-component";
pub const RADIX_JOB_TYPE_LABEL: &str = "radix-job-type";
pub const RADIX_JOB_TYPE_JOB_SCHEDULE: &str = "job-scheduler";
pub const RADIX_BATCH_NAME_LABEL: &str = "radix-batch-name";
pub const RADIX_JOB_NAME_LABEL: &str = "radix-job-name";

/// Set by the Kubernetes Job controller on every pod it creates
pub const K8S_JOB_NAME_LABEL: &str = "job-name";

pub const RADIX_NODE_GPU_LABEL: &str = "radix-node-gpu";
pub const RADIX_NODE_GPU_COUNT_LABEL: &str = "radix-node-gpu-count";
