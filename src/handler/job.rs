use std::sync::Arc;

use tracing::{debug, instrument};

use super::HandlerContext;
use super::adapter::ScheduledJobs;
use super::history;
use super::resources::CreateRequest;
use crate::error::ApiError;
use crate::kubernetes_objects::scheduled_kind::ScheduledKind;
use crate::models::schedule::JobScheduleDescription;
use crate::models::status::{JobStatus, pods_by_job_name};
use crate::store::ResourceStore;

/// Lifecycle of the single jobs scheduled by one job component
pub struct JobHandler<S> {
    context: Arc<HandlerContext<S>>,
}

impl<S> Clone for JobHandler<S> {
    fn clone(&self) -> Self {
        JobHandler {
            context: Arc::clone(&self.context),
        }
    }
}

impl<S: ResourceStore> JobHandler<S> {
    pub fn new(context: Arc<HandlerContext<S>>) -> Self {
        JobHandler { context }
    }

    fn jobs(&self) -> ScheduledJobs<'_, S> {
        ScheduledJobs::new(
            &self.context.store,
            ScheduledKind::Job,
            &self.context.config.component_name,
        )
    }

    #[instrument("job_handler/get_jobs", skip(self))]
    pub async fn get_jobs(&self) -> Result<Vec<JobStatus>, ApiError> {
        let jobs = self.jobs();
        let (items, pods) = futures::try_join!(jobs.list(), jobs.pods(None))?;
        let pods = pods_by_job_name(pods);

        let statuses: Vec<JobStatus> = items
            .iter()
            .map(|job| {
                let name = job.metadata.name.as_deref().unwrap_or_default();
                JobStatus::from_job(job, pods.get(name).map(Vec::as_slice).unwrap_or_default())
            })
            .collect();
        debug!(
            "Found {} jobs in namespace '{}'.",
            statuses.len(),
            self.context.config.namespace
        );
        Ok(statuses)
    }

    #[instrument("job_handler/get_job", skip(self))]
    pub async fn get_job(&self, job_name: &str) -> Result<JobStatus, ApiError> {
        let jobs = self.jobs();
        let job = jobs.get_by_name(job_name).await?;
        let pods = jobs.pods(Some(job_name)).await?;
        Ok(JobStatus::from_job(&job, &pods))
    }

    /// Schedules a single job. Its payload is stored in a secret only when
    /// it is non-blank and the component declares where to mount it.
    #[instrument("job_handler/create_job", skip_all, fields(job_id = ?description.job_id))]
    pub async fn create_job(
        &self,
        description: &JobScheduleDescription,
    ) -> Result<JobStatus, ApiError> {
        let job = self
            .context
            .create_scheduled(
                ScheduledKind::Job,
                CreateRequest {
                    payload: description.payload.clone(),
                    config: Some(&description.config),
                },
            )
            .await?;
        Ok(JobStatus::from_job(&job, &[]))
    }

    #[instrument("job_handler/delete_job", skip(self))]
    pub async fn delete_job(&self, job_name: &str) -> Result<(), ApiError> {
        self.jobs().garbage_collect(job_name).await
    }

    /// Trims succeeded, then failed jobs down to the job history limit
    #[instrument("job_handler/maintain_history_limit", skip(self))]
    pub async fn maintain_history_limit(&self) -> Result<(), ApiError> {
        history::maintain_history_limit(&self.jobs(), self.context.config.job_history_limit).await
    }
}
