use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, PatchOperation};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use tracing::{Level, instrument};

use super::{ResourceStore, StoreError, StoreResource, kind_of};

/// Second phase of the create-unbound → bind-to-owner protocol.
///
/// Replaces the owner references of an already created object with `owner`.
/// Binding the same owner twice leaves the object unchanged, so a failed
/// bind can be retried on its own.
#[instrument(
    "store/bind_to_owner",
    level = Level::TRACE,
    skip(store, owner),
    fields(kind = %kind_of::<K>(), owner_name = %owner.name)
)]
pub async fn bind_to_owner<S, K>(
    store: &S,
    name: &str,
    owner: &OwnerReference,
) -> Result<K, StoreError>
where
    S: ResourceStore,
    K: StoreResource,
{
    let value = serde_json::to_value(vec![owner]).map_err(|source| StoreError::Malformed {
        kind: kind_of::<K>(),
        source,
    })?;
    let patch = Patch(vec![PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(["metadata", "ownerReferences"]),
        value,
    })]);
    store.patch::<K>(name, &patch).await
}
