//! Namespace-scoped access to the Kubernetes resources the scheduler works with.

mod binding;
mod kube_store;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt::Debug;
use std::future::Future;

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::kubernetes_objects::selector::LabelSelector;

pub use self::binding::bind_to_owner;
pub use self::kube_store::KubeStore;

/// Any namespaced, statically typed Kubernetes kind
pub trait StoreResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreResource for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static
{
}

pub(crate) fn kind_of<K: StoreResource>() -> String {
    K::kind(&()).into_owned()
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("{kind} '{name}' does not exist")]
    Missing { kind: String, name: String },

    #[error("{kind} object is malformed: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to patch {kind} '{name}': {reason}")]
    Patch {
        kind: String,
        name: String,
        reason: String,
    },

    #[cfg(test)]
    #[error("injected failure on {0}")]
    Injected(String),
}

/// CRUD over namespaced resources, with label selector queries.
///
/// Every call is a single request to the store; nothing is retried.
pub trait ResourceStore: Send + Sync + 'static {
    fn list<K: StoreResource>(
        &self,
        selector: &LabelSelector,
    ) -> impl Future<Output = Result<Vec<K>, StoreError>> + Send;

    fn get<K: StoreResource>(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<K>, StoreError>> + Send;

    /// Fails if an object with the same name already exists
    fn create<K: StoreResource>(
        &self,
        object: &K,
    ) -> impl Future<Output = Result<K, StoreError>> + Send;

    fn patch<K: StoreResource>(
        &self,
        name: &str,
        patch: &json_patch::Patch,
    ) -> impl Future<Output = Result<K, StoreError>> + Send;

    /// Deletes with background propagation. Deleting an absent object succeeds.
    fn delete<K: StoreResource>(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
