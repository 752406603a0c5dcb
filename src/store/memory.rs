use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use kube::ResourceExt;
use serde_json::Value;

use super::{ResourceStore, StoreError, StoreResource, kind_of};
use crate::kubernetes_objects::selector::LabelSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreOp {
    List,
    Get,
    Create,
    Patch,
    Delete,
}

/// In-process resource store for tests.
///
/// Objects are kept as JSON keyed by kind and name. Failures can be injected
/// per operation and kind; each injected failure fires once.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Value>>,
    failures: Mutex<Vec<(StoreOp, String)>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `object` as is, replacing any object with the same name
    pub(crate) fn insert<K: StoreResource>(&self, object: K) {
        let name = object.name_any();
        let value = serde_json::to_value(&object).unwrap();
        self.objects
            .lock()
            .unwrap()
            .insert((kind_of::<K>(), name), value);
    }

    pub(crate) fn fail_on<K: StoreResource>(&self, op: StoreOp) {
        self.failures.lock().unwrap().push((op, kind_of::<K>()));
    }

    pub(crate) fn all<K: StoreResource>(&self) -> Vec<K> {
        let kind = kind_of::<K>();
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, value)| serde_json::from_value(value.clone()).unwrap())
            .collect()
    }

    pub(crate) fn names<K: StoreResource>(&self) -> Vec<String> {
        self.all::<K>().iter().map(|o| o.name_any()).collect()
    }

    /// `(kind, name)` of every successful delete, in call order
    pub(crate) fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    fn check_failure<K: StoreResource>(&self, op: StoreOp) -> Result<(), StoreError> {
        let kind = kind_of::<K>();
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(o, k)| *o == op && *k == kind) {
            Some(index) => {
                failures.remove(index);
                Err(StoreError::Injected(format!("{op:?} {kind}")))
            }
            None => Ok(()),
        }
    }

    fn decode<K: StoreResource>(value: Value) -> Result<K, StoreError> {
        serde_json::from_value(value).map_err(|source| StoreError::Malformed {
            kind: kind_of::<K>(),
            source,
        })
    }
}

impl ResourceStore for MemoryStore {
    async fn list<K: StoreResource>(&self, selector: &LabelSelector) -> Result<Vec<K>, StoreError> {
        self.check_failure::<K>(StoreOp::List)?;
        let kind = kind_of::<K>();
        let values: Vec<Value> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, value)| value.clone())
            .collect();
        let mut items = Vec::new();
        for value in values {
            let object: K = Self::decode(value)?;
            if selector.matches(object.labels()) {
                items.push(object);
            }
        }
        Ok(items)
    }

    async fn get<K: StoreResource>(&self, name: &str) -> Result<Option<K>, StoreError> {
        self.check_failure::<K>(StoreOp::Get)?;
        let value = self
            .objects
            .lock()
            .unwrap()
            .get(&(kind_of::<K>(), name.to_string()))
            .cloned();
        value.map(Self::decode).transpose()
    }

    async fn create<K: StoreResource>(&self, object: &K) -> Result<K, StoreError> {
        self.check_failure::<K>(StoreOp::Create)?;
        let kind = kind_of::<K>();
        let name = object.name_any();
        let mut value = serde_json::to_value(object).map_err(|source| StoreError::Malformed {
            kind: kind.clone(),
            source,
        })?;
        if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata
                .entry("uid")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
            metadata.entry("creationTimestamp").or_insert_with(|| {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
            });
        }

        let mut objects = self.objects.lock().unwrap();
        let key = (kind.clone(), name.clone());
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind, name });
        }
        objects.insert(key, value.clone());
        drop(objects);
        Self::decode(value)
    }

    async fn patch<K: StoreResource>(
        &self,
        name: &str,
        patch: &json_patch::Patch,
    ) -> Result<K, StoreError> {
        self.check_failure::<K>(StoreOp::Patch)?;
        let kind = kind_of::<K>();
        let mut objects = self.objects.lock().unwrap();
        let Some(value) = objects.get_mut(&(kind.clone(), name.to_string())) else {
            return Err(StoreError::Missing {
                kind,
                name: name.to_string(),
            });
        };
        let mut patched = value.clone();
        json_patch::patch(&mut patched, &patch.0).map_err(|e| StoreError::Patch {
            kind,
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        *value = patched.clone();
        drop(objects);
        Self::decode(patched)
    }

    async fn delete<K: StoreResource>(&self, name: &str) -> Result<(), StoreError> {
        self.check_failure::<K>(StoreOp::Delete)?;
        let key = (kind_of::<K>(), name.to_string());
        if self.objects.lock().unwrap().remove(&key).is_some() {
            self.deleted.lock().unwrap().push(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    use super::*;
    use crate::store::bind_to_owner;

    fn config_map(name: &str, component: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([(
                    "radix-component".to_string(),
                    component.to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_names() {
        let store = MemoryStore::new();
        let created = store.create(&config_map("cm", "compute")).await.unwrap();
        assert!(created.metadata.uid.is_some());
        assert!(created.metadata.creation_timestamp.is_some());

        let err = store.create(&config_map("cm", "compute")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_selector() {
        let store = MemoryStore::new();
        store.insert(config_map("a", "compute"));
        store.insert(config_map("b", "other"));

        let selector = LabelSelector::new().equals("radix-component", "compute");
        let items: Vec<ConfigMap> = store.list(&selector).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name_any(), "a");
    }

    #[tokio::test]
    async fn test_bind_to_owner_is_idempotent() {
        let store = MemoryStore::new();
        store.insert(config_map("cm", "compute"));
        let owner = OwnerReference {
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
            name: "job-1".to_string(),
            uid: "1234".to_string(),
            controller: Some(true),
            ..Default::default()
        };

        let first: ConfigMap = bind_to_owner(&store, "cm", &owner).await.unwrap();
        let second: ConfigMap = bind_to_owner(&store, "cm", &owner).await.unwrap();

        assert_eq!(first.metadata.owner_references, Some(vec![owner.clone()]));
        assert_eq!(second.metadata.owner_references, Some(vec![owner]));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_on::<ConfigMap>(StoreOp::Get);

        assert!(store.get::<ConfigMap>("cm").await.is_err());
        assert!(store.get::<ConfigMap>("cm").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_object_succeeds() {
        let store = MemoryStore::new();
        store.delete::<ConfigMap>("missing").await.unwrap();
        assert!(store.deleted().is_empty());
    }
}
