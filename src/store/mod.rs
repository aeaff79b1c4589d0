//! Access to the declarative resource store.
//!
//! Everything the controllers read or write goes through [`Store`]. Absence is never an
//! error: `get` returns `Ok(None)` and `delete` returns `Ok(false)` for objects that do
//! not exist, every other failure (including rejected optimistic-concurrency updates)
//! comes back as an [`Error`].

use std::fmt::Debug;

use async_trait::async_trait;
use kube::api::Resource;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::Error;

pub mod kube_store;
pub mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

/// Any namespaced object the store can hold.
pub trait StoreObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>, Error>;

    /// List objects of a kind in `namespace`, or across all namespaces for `None`.
    async fn list<K: StoreObject>(&self, namespace: Option<&str>) -> Result<Vec<K>, Error>;

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error>;

    /// Replace the object. Rejected with a conflict if `metadata.resourceVersion` is stale.
    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error>;

    /// Replace only the status subresource, with the same concurrency rules as `update`.
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, Error>;

    /// Returns false when the object was already gone.
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<bool, Error>;
}

pub(crate) fn namespace_and_name<K: Resource>(obj: &K) -> Result<(String, String), Error> {
    let meta = obj.meta();
    let namespace = meta.namespace.clone().ok_or(Error::MissingKey(".metadata.namespace"))?;
    let name = meta.name.clone().ok_or(Error::MissingKey(".metadata.name"))?;
    Ok((namespace, name))
}
