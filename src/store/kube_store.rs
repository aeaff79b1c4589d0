use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    Client,
};

use super::{namespace_and_name, Store, StoreObject};
use crate::crd::metrics::{error_happened, kube_error_happened};
use crate::errors::Error;

/// [`Store`] backed by the Kubernetes API server.
///
/// Every call is bounded by `timeout`, which is how a reconcile pass honours its deadline.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    timeout: Duration,
}

impl KubeStore {
    pub fn new(client: Client, timeout: Duration) -> Self {
        KubeStore { client, timeout }
    }

    fn api<K: StoreObject>(&self, namespace: Option<&str>) -> Api<K> {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    async fn call<T, F>(&self, action: &'static str, request: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let err = Error::from(err);
                if !err.is_not_found() {
                    if let Error::KubeError(ref kube_err) = err {
                        kube_error_happened(action, kube_err);
                    }
                }
                Err(err)
            }
            Err(_) => {
                error_happened("store_timeout");
                Err(Error::Timeout(action, self.timeout.as_secs()))
            }
        }
    }
}

#[async_trait]
impl Store for KubeStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>, Error> {
        let api = self.api::<K>(Some(namespace));
        match self.call("get", api.get(name)).await {
            Ok(obj) => Ok(Some(obj)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list<K: StoreObject>(&self, namespace: Option<&str>) -> Result<Vec<K>, Error> {
        let api = self.api::<K>(namespace);
        let lp = ListParams::default();
        let list = self.call("list", api.list(&lp)).await?;
        Ok(list.items)
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, _) = namespace_and_name(obj)?;
        let api = self.api::<K>(Some(&namespace));
        let pp = PostParams::default();
        self.call("create", api.create(&pp, obj)).await
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = namespace_and_name(obj)?;
        let api = self.api::<K>(Some(&namespace));
        let pp = PostParams::default();
        self.call("update", api.replace(&name, &pp, obj)).await
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = namespace_and_name(obj)?;
        let api = self.api::<K>(Some(&namespace));
        let pp = PostParams::default();
        let data = serde_json::to_vec(obj)?;
        self.call("update_status", api.replace_status(&name, &pp, data)).await
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<bool, Error> {
        let api = self.api::<K>(Some(namespace));
        let dp = DeleteParams::default();
        match self.call("delete", api.delete(name, &dp)).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
