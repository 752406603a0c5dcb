use derive_debug::Dbg;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::{Instrument, Level, debug, instrument, trace_span};

use super::{ResourceStore, StoreError, StoreResource, kind_of};
use crate::kubernetes_objects::MANAGER_ROLE_NAME;
use crate::kubernetes_objects::selector::LabelSelector;

/// Resource store backed by the Kubernetes API server
#[derive(Dbg, Clone)]
pub struct KubeStore {
    #[dbg(skip)]
    client: Client,
    namespace: String,
}

impl KubeStore {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        KubeStore {
            client,
            namespace: namespace.into(),
        }
    }

    fn api<K: StoreResource>(&self) -> Api<K> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

impl ResourceStore for KubeStore {
    #[instrument(
        "kube_store/list",
        level = Level::TRACE,
        skip(self),
        fields(kubernetes_namespace = %self.namespace, kind = %kind_of::<K>(), selector = %selector)
    )]
    async fn list<K: StoreResource>(&self, selector: &LabelSelector) -> Result<Vec<K>, StoreError> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }
        let list = self.api::<K>().list(&params).await?;
        Ok(list.items)
    }

    #[instrument(
        "kube_store/get",
        level = Level::TRACE,
        skip(self),
        fields(kubernetes_namespace = %self.namespace, kind = %kind_of::<K>())
    )]
    async fn get<K: StoreResource>(&self, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.api::<K>().get_opt(name).await?)
    }

    #[instrument(
        "kube_store/create",
        level = Level::TRACE,
        skip(self, object),
        fields(kubernetes_namespace = %self.namespace, kind = %kind_of::<K>(), name = ?object.meta().name)
    )]
    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        let params = PostParams {
            field_manager: Some(MANAGER_ROLE_NAME.to_string()),
            ..Default::default()
        };
        match self.api::<K>().create(&params, object).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(e)) if e.code == 409 => Err(StoreError::AlreadyExists {
                kind: kind_of::<K>(),
                name: object.meta().name.clone().unwrap_or_default(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(
        "kube_store/patch",
        level = Level::TRACE,
        skip(self, patch),
        fields(kubernetes_namespace = %self.namespace, kind = %kind_of::<K>())
    )]
    async fn patch<K: StoreResource>(
        &self,
        name: &str,
        patch: &json_patch::Patch,
    ) -> Result<K, StoreError> {
        let params = PatchParams::apply(MANAGER_ROLE_NAME);
        match self.api::<K>().patch(name, &params, &json_patch_request(patch)).await {
            Ok(patched) => Ok(patched),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(StoreError::Missing {
                kind: kind_of::<K>(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(
        "kube_store/delete",
        level = Level::TRACE,
        skip(self),
        fields(kubernetes_namespace = %self.namespace, kind = %kind_of::<K>())
    )]
    async fn delete<K: StoreResource>(&self, name: &str) -> Result<(), StoreError> {
        let result = async {
            self.api::<K>()
                .delete(name, &DeleteParams::background())
                .await
        }
        .instrument(trace_span!("delete_background"))
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("{} '{}' is already gone.", kind_of::<K>(), name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn json_patch_request(patch: &json_patch::Patch) -> Patch<()> {
    Patch::Json(patch.clone())
}
