use std::collections::HashSet;
use std::fmt::Display;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use tracing::{debug, instrument};

use super::adapter::ScheduledJobs;
use crate::error::ApiError;
use crate::store::ResourceStore;

/// Terminal-status partitions the history limit applies to.
///
/// A Job counting both succeeded and failed pods belongs to both; a Job with
/// neither belongs to none and is never trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Partition {
    Succeeded,
    Failed,
}

impl Partition {
    fn contains(self, job: &Job) -> bool {
        let status = job.status.as_ref();
        let count = match self {
            Partition::Succeeded => status.and_then(|s| s.succeeded),
            Partition::Failed => status.and_then(|s| s.failed),
        };
        count.unwrap_or(0) > 0
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Succeeded => f.write_str("succeeded"),
            Partition::Failed => f.write_str("failed"),
        }
    }
}

fn completed_at(job: &Job) -> Option<&Time> {
    job.status
        .as_ref()
        .and_then(|status| status.completion_time.as_ref())
        .or(job.metadata.creation_timestamp.as_ref())
}

/// Names of the oldest Jobs of `partition` beyond `limit`, oldest first
pub(crate) fn expired(jobs: &[Job], partition: Partition, limit: usize) -> Vec<String> {
    let mut members: Vec<&Job> = jobs.iter().filter(|job| partition.contains(job)).collect();
    let excess = members.len().saturating_sub(limit);
    if excess == 0 {
        return Vec::new();
    }

    members.sort_by(|a, b| {
        completed_at(a)
            .cmp(&completed_at(b))
            .then_with(|| {
                a.metadata
                    .creation_timestamp
                    .cmp(&b.metadata.creation_timestamp)
            })
            .then_with(|| a.name_any().cmp(&b.name_any()))
    });
    members
        .into_iter()
        .take(excess)
        .map(|job| job.name_any())
        .collect()
}

/// Garbage collects the oldest completed Jobs so that each partition keeps
/// at most `limit` entries. Stops at the first error without rolling back.
#[instrument("history/maintain_history_limit", skip(jobs), fields(kind = %jobs.kind()))]
pub(crate) async fn maintain_history_limit<S: ResourceStore>(
    jobs: &ScheduledJobs<'_, S>,
    limit: usize,
) -> Result<(), ApiError> {
    let current = jobs.list().await?;
    let mut collected: HashSet<String> = HashSet::new();

    for partition in [Partition::Succeeded, Partition::Failed] {
        let names = expired(&current, partition, limit);
        if names.is_empty() {
            debug!("No {} {} history entries to delete.", partition, jobs.kind());
            continue;
        }
        debug!("{} {} history entries to delete.", names.len(), partition);

        for name in names {
            if collected.contains(&name) {
                continue;
            }
            jobs.garbage_collect(&name).await?;
            collected.insert(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::kubernetes_objects::scheduled_kind::ScheduledKind;
    use crate::store::memory::{MemoryStore, StoreOp};

    fn job(name: &str, status: serde_json::Value) -> Job {
        serde_json::from_value(json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": name,
                "creationTimestamp": "2024-01-01T00:00:00Z",
                "labels": ScheduledKind::Batch.labels("app", "compute", name)
            },
            "status": status
        }))
        .unwrap()
    }

    fn succeeded(name: &str, minute: u32) -> Job {
        job(
            name,
            json!({"succeeded": 1, "completionTime": format!("2024-01-01T00:{minute:02}:00Z")}),
        )
    }

    #[test]
    fn test_expired_selects_oldest_beyond_limit() {
        let jobs = vec![
            succeeded("t3", 3),
            succeeded("t1", 1),
            succeeded("t5", 5),
            succeeded("t2", 2),
            succeeded("t4", 4),
        ];

        assert_eq!(expired(&jobs, Partition::Succeeded, 3), vec!["t1", "t2"]);
        assert!(expired(&jobs, Partition::Succeeded, 5).is_empty());
        assert!(expired(&jobs, Partition::Succeeded, 7).is_empty());
        assert!(expired(&jobs, Partition::Failed, 0).is_empty());
    }

    #[test]
    fn test_expired_falls_back_to_creation_time_then_name() {
        let jobs = vec![
            job("b", json!({"failed": 1})),
            job("a", json!({"failed": 1})),
            job(
                "late",
                json!({"failed": 1, "completionTime": "2024-01-02T00:00:00Z"}),
            ),
        ];

        assert_eq!(expired(&jobs, Partition::Failed, 1), vec!["a", "b"]);
    }

    #[test]
    fn test_expired_breaks_completion_ties_by_creation_time() {
        let completed = json!({"succeeded": 1, "completionTime": "2024-01-01T01:00:00Z"});
        let mut older = job("z-older", completed.clone());
        let mut newer = job("a-newer", completed);
        older.metadata.creation_timestamp =
            serde_json::from_value(json!("2024-01-01T00:10:00Z")).unwrap();
        newer.metadata.creation_timestamp =
            serde_json::from_value(json!("2024-01-01T00:20:00Z")).unwrap();

        let jobs = vec![newer, older];
        assert_eq!(expired(&jobs, Partition::Succeeded, 1), vec!["z-older"]);
    }

    #[test]
    fn test_jobs_with_neither_marker_are_never_expired() {
        let jobs = vec![job("running", json!({"active": 1})), job("new", json!({}))];

        assert!(expired(&jobs, Partition::Succeeded, 0).is_empty());
        assert!(expired(&jobs, Partition::Failed, 0).is_empty());
    }

    #[tokio::test]
    async fn test_maintain_history_limit_trims_each_partition() {
        let store = MemoryStore::new();
        for (name, minute) in [("t1", 1), ("t2", 2), ("t3", 3), ("t4", 4), ("t5", 5)] {
            store.insert(succeeded(name, minute));
        }
        store.insert(job("f1", json!({"failed": 1, "completionTime": "2024-01-01T00:01:00Z"})));
        store.insert(job("f2", json!({"failed": 1, "completionTime": "2024-01-01T00:02:00Z"})));
        store.insert(job("running", json!({"active": 1})));
        let batches = ScheduledJobs::new(&store, ScheduledKind::Batch, "compute");

        maintain_history_limit(&batches, 3).await.unwrap();
        assert_eq!(
            store.names::<Job>(),
            vec!["f1", "f2", "running", "t3", "t4", "t5"]
        );

        maintain_history_limit(&batches, 1).await.unwrap();
        assert_eq!(store.names::<Job>(), vec!["f2", "running", "t5"]);

        maintain_history_limit(&batches, 1).await.unwrap();
        assert_eq!(store.names::<Job>(), vec!["f2", "running", "t5"]);
    }

    #[tokio::test]
    async fn test_job_in_both_partitions_is_collected_once() {
        let store = MemoryStore::new();
        store.insert(job(
            "both",
            json!({"succeeded": 1, "failed": 1, "completionTime": "2024-01-01T00:01:00Z"}),
        ));
        store.insert(succeeded("t2", 2));
        let batches = ScheduledJobs::new(&store, ScheduledKind::Batch, "compute");

        maintain_history_limit(&batches, 0).await.unwrap();
        assert!(store.names::<Job>().is_empty());
    }

    #[tokio::test]
    async fn test_maintain_history_limit_propagates_errors() {
        let store = MemoryStore::new();
        store.insert(succeeded("t1", 1));
        store.insert(succeeded("t2", 2));
        store.fail_on::<Job>(StoreOp::Delete);
        let batches = ScheduledJobs::new(&store, ScheduledKind::Batch, "compute");

        assert!(maintain_history_limit(&batches, 0).await.is_err());
        assert_eq!(store.names::<Job>(), vec!["t1", "t2"]);
    }
}
