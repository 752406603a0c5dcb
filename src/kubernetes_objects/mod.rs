pub mod labels;
pub mod naming;
pub mod radix_deployment;
pub mod scheduled_kind;
pub mod selector;

pub(crate) const MANAGER_ROLE_NAME: &str = "radix-job-scheduler";
