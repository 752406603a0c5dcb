use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use kube::{Resource, ResourceExt};
use tracing::{Instrument, debug, instrument, trace_span};

use crate::error::{ApiError, InternalError};
use crate::kubernetes_objects::labels::K8S_JOB_NAME_LABEL;
use crate::kubernetes_objects::scheduled_kind::ScheduledKind;
use crate::kubernetes_objects::selector::LabelSelector;
use crate::spec_builder::BuiltJob;
use crate::store::{ResourceStore, bind_to_owner};

/// Jobs of one scheduled kind belonging to one job component
pub(crate) struct ScheduledJobs<'a, S> {
    store: &'a S,
    kind: ScheduledKind,
    component_name: &'a str,
}

impl<'a, S: ResourceStore> ScheduledJobs<'a, S> {
    pub(crate) fn new(store: &'a S, kind: ScheduledKind, component_name: &'a str) -> Self {
        ScheduledJobs {
            store,
            kind,
            component_name,
        }
    }

    pub(crate) fn kind(&self) -> ScheduledKind {
        self.kind
    }

    fn selector(&self) -> LabelSelector {
        self.kind.selector(self.component_name)
    }

    #[instrument("scheduled_jobs/list", skip_all, fields(kind = %self.kind))]
    pub(crate) async fn list(&self) -> Result<Vec<Job>, ApiError> {
        Ok(self.store.list::<Job>(&self.selector()).await?)
    }

    /// Fetches `name` and checks that it is one of ours
    #[instrument("scheduled_jobs/get_by_name", skip(self), fields(kind = %self.kind))]
    pub(crate) async fn get_by_name(&self, name: &str) -> Result<Job, ApiError> {
        match self.store.get::<Job>(name).await? {
            Some(job) if self.selector().matches(job.labels()) => Ok(job),
            _ => Err(ApiError::not_found(self.kind.to_string(), name)),
        }
    }

    /// Pods created by the Job `job_name`, or every pod in the namespace
    #[instrument("scheduled_jobs/pods", skip(self))]
    pub(crate) async fn pods(&self, job_name: Option<&str>) -> Result<Vec<Pod>, ApiError> {
        let selector = match job_name {
            Some(name) => LabelSelector::new().equals(K8S_JOB_NAME_LABEL, name),
            None => LabelSelector::new(),
        };
        Ok(self.store.list::<Pod>(&selector).await?)
    }

    /// Creates the env-vars ConfigMaps and the Job, then binds the ConfigMaps
    /// and the payload secret to the Job.
    ///
    /// Nothing is rolled back on failure. ConfigMaps created before a failed
    /// Job create stay unowned.
    #[instrument(
        "scheduled_jobs/create",
        skip_all,
        fields(kind = %self.kind, name = ?built.job.metadata.name)
    )]
    pub(crate) async fn create(
        &self,
        built: BuiltJob,
        payload_secret: Option<&str>,
    ) -> Result<Job, ApiError> {
        let env_vars = self
            .store
            .create::<ConfigMap>(&built.env_vars_config_map)
            .await?;
        let env_vars_metadata = self
            .store
            .create::<ConfigMap>(&built.env_vars_metadata_config_map)
            .await?;

        let job = async { self.store.create::<Job>(&built.job).await }
            .instrument(trace_span!("create_job"))
            .await?;

        let owner = job
            .controller_owner_ref(&())
            .ok_or_else(|| InternalError::MissingUid {
                kind: "Job".to_string(),
                name: job.name_any(),
            })?;

        async {
            for config_map in [&env_vars, &env_vars_metadata] {
                bind_to_owner::<S, ConfigMap>(self.store, &config_map.name_any(), &owner).await?;
            }
            if let Some(secret_name) = payload_secret {
                bind_to_owner::<S, Secret>(self.store, secret_name, &owner).await?;
            }
            Ok::<_, ApiError>(())
        }
        .instrument(trace_span!("bind_to_job"))
        .await?;

        Ok(job)
    }

    /// Deletes the secrets and services labelled with `name`, then the Job.
    ///
    /// Stops at the first failure. Running it again resumes where it stopped.
    #[instrument("scheduled_jobs/garbage_collect", skip(self), fields(kind = %self.kind))]
    pub(crate) async fn garbage_collect(&self, name: &str) -> Result<(), ApiError> {
        let job = self.get_by_name(name).await?;
        let owned = self.kind.owned_resources_selector(name);

        let secrets = self.store.list::<Secret>(&owned).await?;
        for secret in secrets {
            self.store.delete::<Secret>(&secret.name_any()).await?;
        }

        let services = self.store.list::<Service>(&owned).await?;
        for service in services {
            self.store.delete::<Service>(&service.name_any()).await?;
        }

        self.store.delete::<Job>(&job.name_any()).await?;
        debug!("{} '{}' garbage collected.", self.kind, name);
        Ok(())
    }
}
