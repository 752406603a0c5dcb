//! Builds the Kubernetes Job and its env-vars ConfigMaps for a scheduled batch or job.
//!
//! Everything here is a pure transformation of the inputs; the store is never touched.

pub mod env_vars;
mod node;
mod resources;
mod volumes;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, LocalObjectReference, PodSecurityContext, PodSpec,
    PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use thiserror::Error;

use self::env_vars::{
    ComponentEnvVars, METADATA_KEY, RadixEnv, config_map, container_env,
    env_vars_config_map_name, env_vars_metadata_config_map_name, filter_metadata, merge_env_vars,
};
use crate::kubernetes_objects::radix_deployment::{RadixDeployJobComponent, RadixDeployment};
use crate::kubernetes_objects::scheduled_kind::{BATCH_PAYLOAD_MOUNT_PATH, ScheduledKind};
use crate::models::schedule::RadixJobComponentConfig;

#[derive(Error, Debug)]
pub enum SpecBuildError {
    #[error("Invalid quantity '{value}' for resource '{resource}'")]
    InvalidResourceQuantity { resource: String, value: String },

    #[error("Invalid GPU count '{0}', expected a positive integer")]
    InvalidGpuCount(String),

    #[error("Invalid volume mount '{name}': {reason}")]
    InvalidVolumeMount { name: String, reason: String },

    #[error("Invalid env-vars metadata: {0}")]
    InvalidEnvVarsMetadata(#[source] serde_json::Error),
}

/// Everything needed to build one scheduled Job
#[derive(Debug, Clone, Copy)]
pub struct JobSpecInput<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
    pub kind: ScheduledKind,
    pub deployment: &'a RadixDeployment,
    pub component: &'a RadixDeployJobComponent,
    pub env_vars: &'a ComponentEnvVars,
    /// Name of the payload secret, when one was created
    pub payload_secret: Option<&'a str>,
    /// Per-job override of the component defaults
    pub config: Option<&'a RadixJobComponentConfig>,
}

impl JobSpecInput<'_> {
    /// Batches mount their description at a fixed path; single jobs use the
    /// path declared by the component.
    pub fn payload_mount_path(&self) -> Option<&str> {
        match self.kind {
            ScheduledKind::Batch => Some(BATCH_PAYLOAD_MOUNT_PATH),
            ScheduledKind::Job => self.component.payload_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltJob {
    pub job: Job,
    pub env_vars_config_map: ConfigMap,
    pub env_vars_metadata_config_map: ConfigMap,
}

pub fn build_job(input: &JobSpecInput<'_>) -> Result<BuiltJob, SpecBuildError> {
    let component = input.component;
    let deployment = input.deployment;
    let config = input.config;
    let labels = input
        .kind
        .labels(&deployment.spec.app_name, &component.name, input.name);

    let resources = resources::build_requirements(
        config.and_then(|c| c.resources.as_ref()),
        component.resources.as_ref(),
    )?;
    let gpu = node::gpu_scheduling(
        config
            .and_then(|c| c.node.as_ref())
            .or(component.node.as_ref()),
    )?;
    let (mut volumes, mut volume_mounts) = volumes::component_volumes(&component.volume_mounts)?;
    if let Some(secret_name) = input.payload_secret
        && let Some(mount_path) = input.payload_mount_path()
    {
        let (volume, mount) = volumes::payload_volume(secret_name, mount_path);
        volumes.push(volume);
        volume_mounts.push(mount);
    }

    let env_vars = merge_env_vars(&component.environment_variables, input.env_vars);
    let metadata = filter_metadata(input.env_vars.metadata.as_deref(), &env_vars)?;
    let env_vars_config_map_name = env_vars_config_map_name(input.name);
    let deployment_name = deployment.name_any();
    let env = container_env(
        &RadixEnv {
            app: &deployment.spec.app_name,
            environment: &deployment.spec.environment,
            component: &component.name,
            deployment: &deployment_name,
        },
        &env_vars_config_map_name,
        &env_vars,
    );

    let ports: Vec<ContainerPort> = component
        .ports
        .iter()
        .map(|port| ContainerPort {
            name: Some(port.name.clone()),
            container_port: port.port,
            ..Default::default()
        })
        .collect();

    let container = Container {
        name: component.name.clone(),
        image: Some(component.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        env: Some(env),
        ports: (!ports.is_empty()).then_some(ports),
        volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
        resources,
        ..Default::default()
    };

    let image_pull_secrets: Vec<LocalObjectReference> = deployment
        .spec
        .image_pull_secrets
        .iter()
        .map(|secret| LocalObjectReference {
            name: secret.name.clone(),
        })
        .collect();

    let job = Job {
        metadata: ObjectMeta {
            name: Some(input.name.to_string()),
            namespace: Some(input.namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            active_deadline_seconds: config
                .and_then(|c| c.time_limit_seconds)
                .or(component.time_limit_seconds),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    namespace: Some(input.namespace.to_string()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: (!volumes.is_empty()).then_some(volumes),
                    restart_policy: Some("Never".to_string()),
                    image_pull_secrets: (!image_pull_secrets.is_empty())
                        .then_some(image_pull_secrets),
                    security_context: component.run_as_non_root.then(|| PodSecurityContext {
                        run_as_non_root: Some(true),
                        ..Default::default()
                    }),
                    affinity: gpu.affinity,
                    tolerations: gpu.tolerations,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let env_vars_config_map =
        config_map(env_vars_config_map_name, input.namespace, &labels, env_vars);
    let env_vars_metadata_config_map = config_map(
        env_vars_metadata_config_map_name(input.name),
        input.namespace,
        &labels,
        metadata
            .map(|metadata| [(METADATA_KEY.to_string(), metadata)].into())
            .unwrap_or_default(),
    );

    Ok(BuiltJob {
        job,
        env_vars_config_map,
        env_vars_metadata_config_map,
    })
}
