use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use tracing::{Instrument, info, instrument, trace_span, warn};

use super::HandlerContext;
use super::adapter::ScheduledJobs;
use crate::error::ApiError;
use crate::kubernetes_objects::naming::generate_name;
use crate::kubernetes_objects::radix_deployment::{RadixDeployJobComponent, RadixDeployment};
use crate::kubernetes_objects::scheduled_kind::ScheduledKind;
use crate::models::schedule::RadixJobComponentConfig;
use crate::spec_builder::env_vars::{
    ComponentEnvVars, env_vars_config_map_name, env_vars_metadata_config_map_name,
};
use crate::spec_builder::{JobSpecInput, build_job};
use crate::store::ResourceStore;

/// What a create request asks for, independent of the scheduled kind
pub(super) struct CreateRequest<'a> {
    /// Secret content. Dropped for single jobs whose component declares no payload path.
    pub payload: Option<String>,
    pub config: Option<&'a RadixJobComponentConfig>,
}

impl<S: ResourceStore> HandlerContext<S> {
    /// Reads the RadixDeployment fresh on every call
    #[instrument("handler/fetch_deployment", skip(self), fields(deployment = %self.config.deployment_name))]
    async fn fetch_deployment(&self) -> Result<RadixDeployment, ApiError> {
        let name = &self.config.deployment_name;
        self.store
            .get::<RadixDeployment>(name)
            .await?
            .ok_or_else(|| ApiError::not_found("radix deployment", name))
    }

    #[instrument("handler/component_env_vars", skip(self))]
    async fn component_env_vars(&self, component_name: &str) -> Result<ComponentEnvVars, ApiError> {
        let env_vars_name = env_vars_config_map_name(component_name);
        let metadata_name = env_vars_metadata_config_map_name(component_name);
        let (env_vars, metadata) = futures::try_join!(
            self.store.get::<ConfigMap>(&env_vars_name),
            self.store.get::<ConfigMap>(&metadata_name),
        )?;
        Ok(ComponentEnvVars::from_config_maps(env_vars, metadata))
    }

    /// Creates every resource of a new batch or job and returns the created Job.
    ///
    /// There is no compensating rollback. When a step fails the resources
    /// created so far are logged and left in place.
    #[instrument("handler/create_scheduled", skip_all, fields(kind = %kind))]
    pub(super) async fn create_scheduled(
        &self,
        kind: ScheduledKind,
        request: CreateRequest<'_>,
    ) -> Result<Job, ApiError> {
        let deployment = self.fetch_deployment().await?;
        let component_name = &self.config.component_name;
        let component = deployment
            .job_component(component_name)
            .ok_or_else(|| ApiError::not_found("job component", component_name))?;

        let name = generate_name(kind.name_prefix(), &component.name);
        let mut created: Vec<String> = Vec::new();
        let result = self
            .create_resources(kind, &name, &deployment, component, request, &mut created)
            .await;

        match &result {
            Ok(job) => info!(
                "Created {} '{}' for component '{}' in environment '{}'.",
                kind,
                job.name_any(),
                component.name,
                deployment.spec.environment
            ),
            Err(e) if !created.is_empty() => warn!(
                "Creating {} '{}' failed: {}. Left in place: {}",
                kind,
                name,
                e,
                created.join(", ")
            ),
            Err(_) => {}
        }
        result
    }

    async fn create_resources(
        &self,
        kind: ScheduledKind,
        name: &str,
        deployment: &RadixDeployment,
        component: &RadixDeployJobComponent,
        request: CreateRequest<'_>,
        created: &mut Vec<String>,
    ) -> Result<Job, ApiError> {
        let namespace = &self.config.namespace;
        let labels = kind.labels(&deployment.spec.app_name, &component.name, name);

        let payload = request
            .payload
            .filter(|payload| !payload.trim().is_empty())
            .filter(|_| kind == ScheduledKind::Batch || component.payload_path().is_some());
        let payload_secret = match payload {
            Some(payload) => {
                let secret = payload_secret(kind, name, namespace, &labels, payload);
                let secret = async { self.store.create::<Secret>(&secret).await }
                    .instrument(trace_span!("create_payload_secret"))
                    .await?;
                created.push(format!("Secret/{}", secret.name_any()));
                Some(secret.name_any())
            }
            None => None,
        };

        if let Some(service) = service(kind, name, namespace, &labels, component) {
            let service = async { self.store.create::<Service>(&service).await }
                .instrument(trace_span!("create_service"))
                .await?;
            created.push(format!("Service/{}", service.name_any()));
        }

        let env_vars = self.component_env_vars(&component.name).await?;
        let built = build_job(&JobSpecInput {
            namespace,
            name,
            kind,
            deployment,
            component,
            env_vars: &env_vars,
            payload_secret: payload_secret.as_deref(),
            config: request.config,
        })?;

        ScheduledJobs::new(&self.store, kind, &self.config.component_name)
            .create(built, payload_secret.as_deref())
            .await
    }
}

fn payload_secret(
    kind: ScheduledKind,
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    payload: String,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(kind.payload_secret_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        string_data: Some(BTreeMap::from([(
            kind.payload_secret_key().to_string(),
            payload,
        )])),
        ..Default::default()
    }
}

/// Service exposing the component's ports on the pods of one batch or job
fn service(
    kind: ScheduledKind,
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    component: &RadixDeployJobComponent,
) -> Option<Service> {
    if component.ports.is_empty() {
        return None;
    }
    let ports = component
        .ports
        .iter()
        .map(|port| ServicePort {
            name: Some(port.name.clone()),
            port: port.port,
            target_port: Some(IntOrString::Int(port.port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        })
        .collect();

    Some(Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([(
                kind.name_label().to_string(),
                name.to_string(),
            )])),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    })
}
