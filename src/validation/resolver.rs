//! Point reads of the objects an admission request refers to.
//!
//! The store is owned and populated by the reconcilers; validation only reads
//! it. Not-found is an answer, not a failure: the resolver returns `None` so
//! the caller can report it as a field error. Any other failure is surfaced
//! to the host as retryable.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::crd::{CatalogVersion, DatabaseEngine, ManagedDatabase, ResourceKind};

/// Errors from the object store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// The store could not be reached or answered with a server error
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    /// The stored object does not decode into the expected model
    #[error("failed to decode {kind} \"{name}\": {message}")]
    Decode {
        kind: String,
        name: String,
        message: String,
    },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Point-read access to cluster objects.
pub trait ObjectStore: Send + Sync {
    /// Fetch one object. Cluster-scoped kinds ignore `namespace`.
    fn get(
        &self,
        namespace: Option<&str>,
        name: &str,
        kind: &ResourceKind,
    ) -> impl Future<Output = Result<DynamicObject, StoreError>> + Send;
}

/// Object store backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: Option<&str>, kind: &ResourceKind) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&kind.group, &kind.version, &kind.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &kind.plural);
        match namespace {
            Some(ns) if kind.namespaced => Api::namespaced_with(self.client.clone(), ns, &resource),
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

impl ObjectStore for KubeStore {
    async fn get(
        &self,
        namespace: Option<&str>,
        name: &str,
        kind: &ResourceKind,
    ) -> Result<DynamicObject, StoreError> {
        let api = self.api(namespace, kind);
        match api.get(name).await {
            Ok(obj) => Ok(obj),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(StoreError::NotFound {
                kind: kind.kind.clone(),
                name: name.to_string(),
            }),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }
}

type ObjectKey = (String, Option<String>, String);

/// In-process object store for tests and embedding hosts.
#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<ObjectKey, DynamicObject>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: Option<&str>, name: &str, kind: &ResourceKind) -> ObjectKey {
        let namespace = if kind.namespaced {
            namespace.map(str::to_string)
        } else {
            None
        };
        (kind.to_string(), namespace, name.to_string())
    }

    /// Store a serializable model under the given kind.
    pub fn insert<T: serde::Serialize>(
        &self,
        namespace: Option<&str>,
        name: &str,
        kind: &ResourceKind,
        object: &T,
    ) -> Result<(), StoreError> {
        let mut value = serde_json::to_value(object).map_err(|e| StoreError::Decode {
            kind: kind.kind.clone(),
            name: name.to_string(),
            message: e.to_string(),
        })?;
        if let Some(map) = value.as_object_mut() {
            map.insert("apiVersion".to_string(), kind.api_version().into());
            map.insert("kind".to_string(), kind.kind.clone().into());
        }
        let obj: DynamicObject = serde_json::from_value(value).map_err(|e| StoreError::Decode {
            kind: kind.kind.clone(),
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let mut objects = self
            .objects
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        objects.insert(Self::key(namespace, name, kind), obj);
        Ok(())
    }

    /// Make every subsequent read fail as unavailable (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl ObjectStore for InMemoryStore {
    async fn get(
        &self,
        namespace: Option<&str>,
        name: &str,
        kind: &ResourceKind,
    ) -> Result<DynamicObject, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        let objects = self
            .objects
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        objects
            .get(&Self::key(namespace, name, kind))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.kind.clone(),
                name: name.to_string(),
            })
    }
}

/// Resolves database, catalog and secret references through a store.
pub struct ReferenceResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: ObjectStore> ReferenceResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        namespace: Option<&str>,
        name: &str,
        kind: &ResourceKind,
    ) -> Result<Option<T>, StoreError> {
        let obj = match self.store.get(namespace, name, kind).await {
            Ok(obj) => obj,
            Err(StoreError::NotFound { .. }) => {
                debug!(kind = %kind, name = %name, namespace = ?namespace, "Referenced object not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let decode_err = |e: serde_json::Error| StoreError::Decode {
            kind: kind.kind.clone(),
            name: name.to_string(),
            message: e.to_string(),
        };
        let value = serde_json::to_value(obj).map_err(decode_err)?;
        serde_json::from_value(value).map(Some).map_err(decode_err)
    }

    /// Fetch the managed database an operation or schema refers to.
    pub async fn resolve_database(
        &self,
        engine: DatabaseEngine,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ManagedDatabase>, StoreError> {
        self.get_typed(Some(namespace), name, &engine.database_resource())
            .await
    }

    /// Fetch a version catalog entry by name.
    pub async fn resolve_version(
        &self,
        engine: DatabaseEngine,
        name: &str,
    ) -> Result<Option<CatalogVersion>, StoreError> {
        self.get_typed(None, name, &engine.version_resource()).await
    }

    /// Whether a secret exists.
    pub async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool, StoreError> {
        match self
            .store
            .get(Some(namespace), name, &ResourceKind::secret())
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
