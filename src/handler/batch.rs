use std::sync::Arc;

use tracing::{debug, instrument};

use super::HandlerContext;
use super::adapter::ScheduledJobs;
use super::history;
use super::resources::CreateRequest;
use crate::error::{ApiError, InternalError};
use crate::kubernetes_objects::scheduled_kind::ScheduledKind;
use crate::models::schedule::BatchScheduleDescription;
use crate::models::status::{BatchStatus, pods_by_job_name};
use crate::store::ResourceStore;

/// Lifecycle of the batches scheduled by one job component
pub struct BatchHandler<S> {
    context: Arc<HandlerContext<S>>,
}

impl<S> Clone for BatchHandler<S> {
    fn clone(&self) -> Self {
        BatchHandler {
            context: Arc::clone(&self.context),
        }
    }
}

impl<S: ResourceStore> BatchHandler<S> {
    pub fn new(context: Arc<HandlerContext<S>>) -> Self {
        BatchHandler { context }
    }

    fn batches(&self) -> ScheduledJobs<'_, S> {
        ScheduledJobs::new(
            &self.context.store,
            ScheduledKind::Batch,
            &self.context.config.component_name,
        )
    }

    #[instrument("batch_handler/get_batches", skip(self))]
    pub async fn get_batches(&self) -> Result<Vec<BatchStatus>, ApiError> {
        let batches = self.batches();
        let (jobs, pods) = futures::try_join!(batches.list(), batches.pods(None))?;
        let pods = pods_by_job_name(pods);

        let statuses: Vec<BatchStatus> = jobs
            .iter()
            .map(|job| {
                let name = job.metadata.name.as_deref().unwrap_or_default();
                BatchStatus::from_job(job, pods.get(name).map(Vec::as_slice).unwrap_or_default())
            })
            .collect();
        debug!(
            "Found {} batches in namespace '{}'.",
            statuses.len(),
            self.context.config.namespace
        );
        Ok(statuses)
    }

    #[instrument("batch_handler/get_batch", skip(self))]
    pub async fn get_batch(&self, batch_name: &str) -> Result<BatchStatus, ApiError> {
        let batches = self.batches();
        let job = batches.get_by_name(batch_name).await?;
        let pods = batches.pods(Some(batch_name)).await?;
        Ok(BatchStatus::from_job(&job, &pods))
    }

    /// Schedules a new batch. The returned status is that of the freshly
    /// created Job, normally `Waiting`.
    #[instrument("batch_handler/create_batch", skip_all)]
    pub async fn create_batch(
        &self,
        description: &BatchScheduleDescription,
    ) -> Result<BatchStatus, ApiError> {
        let payload = if description.has_jobs() {
            let serialized = serde_json::to_string(description).map_err(|source| {
                InternalError::Serialize {
                    what: "BatchScheduleDescription",
                    source,
                }
            })?;
            Some(serialized)
        } else {
            None
        };

        let job = self
            .context
            .create_scheduled(
                ScheduledKind::Batch,
                CreateRequest {
                    payload,
                    config: Some(&description.default_config),
                },
            )
            .await?;
        Ok(BatchStatus::from_job(&job, &[]))
    }

    #[instrument("batch_handler/delete_batch", skip(self))]
    pub async fn delete_batch(&self, batch_name: &str) -> Result<(), ApiError> {
        self.batches().garbage_collect(batch_name).await
    }

    /// Trims succeeded, then failed batches down to the batch history limit
    #[instrument("batch_handler/maintain_history_limit", skip(self))]
    pub async fn maintain_history_limit(&self) -> Result<(), ApiError> {
        history::maintain_history_limit(&self.batches(), self.context.config.batch_history_limit)
            .await
    }

    pub async fn stop_batch(&self, _batch_name: &str) -> Result<(), ApiError> {
        Err(ApiError::unknown(InternalError::Unsupported("stop batch")))
    }

    pub async fn stop_batch_job(&self, _batch_name: &str, _job_name: &str) -> Result<(), ApiError> {
        Err(ApiError::unknown(InternalError::Unsupported("stop batch job")))
    }
}
