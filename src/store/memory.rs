use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use kube::error::ErrorResponse;
use serde_json::{json, Value};

use super::{namespace_and_name, Store, StoreObject};
use crate::errors::Error;

/// Store operations, as recorded in the write journal and matched by injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// One mutating call issued against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub action: Action,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

// (apiVersion/kind, namespace, name)
type Key = (String, String, String);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, Value>,
    resource_version: u64,
    writes: Vec<Write>,
    failures: Vec<(Action, String)>,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn take_failure(&mut self, action: Action, kind: &str) -> Result<(), Error> {
        match self.failures.iter().position(|(a, k)| *a == action && k == kind) {
            Some(index) => {
                self.failures.remove(index);
                Err(api_error(500, "InternalError", &format!("injected {:?} failure for {}", action, kind)))
            }
            None => Ok(()),
        }
    }

    fn record(&mut self, action: Action, kind: &str, namespace: &str, name: &str) {
        self.writes.push(Write {
            action,
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }

    /// Remove an object and, like the API server's garbage collector, everything it owns.
    fn remove_cascading(&mut self, key: &Key) {
        let mut pending = vec![key.clone()];
        while let Some(key) = pending.pop() {
            let removed = match self.objects.remove(&key) {
                Some(removed) => removed,
                None => continue,
            };
            let uid = match removed.pointer("/metadata/uid").and_then(Value::as_str) {
                Some(uid) => uid.to_string(),
                None => continue,
            };
            let dependents = self.objects.iter().filter(|((_, namespace, _), object)| {
                namespace == &key.1 && owner_uids(object).iter().any(|owner| owner == &uid)
            });
            pending.extend(dependents.map(|(key, _)| key.clone()));
        }
    }
}

/// In-process [`Store`] with the API server semantics the controllers rely on:
/// resourceVersion conflicts, a status subresource, finalizer-gated deletion and
/// owner-reference cascading. It keeps a journal of mutating calls and can be told
/// to fail the next call of a given action and kind.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutating calls issued since creation or the last [`MemoryStore::clear_writes`].
    pub fn writes(&self) -> Vec<Write> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Make the next `action` on objects of `kind` (e.g. "Service") fail with a server error.
    pub fn fail_next(&self, action: Action, kind: &str) {
        self.lock().failures.push((action, kind.to_string()));
    }

    /// Number of stored objects of type `K` across all namespaces.
    pub fn count<K: StoreObject>(&self) -> usize {
        let type_key = type_key::<K>();
        self.lock().objects.keys().filter(|(t, _, _)| t == &type_key).count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>, Error> {
        let mut inner = self.lock();
        inner.take_failure(Action::Get, &K::kind(&()))?;
        let key = (type_key::<K>(), namespace.to_string(), name.to_string());
        match inner.objects.get(&key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn list<K: StoreObject>(&self, namespace: Option<&str>) -> Result<Vec<K>, Error> {
        let mut inner = self.lock();
        inner.take_failure(Action::List, &K::kind(&()))?;
        let type_key = type_key::<K>();
        inner
            .objects
            .iter()
            .filter(|((t, ns, _), _)| t == &type_key && namespace.map(|wanted| wanted == ns).unwrap_or(true))
            .map(|(_, value)| serde_json::from_value(value.clone()).map_err(Error::from))
            .collect()
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = namespace_and_name(obj)?;
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        inner.record(Action::Create, &kind, &namespace, &name);
        inner.take_failure(Action::Create, &kind)?;

        let key = (type_key::<K>(), namespace, name.clone());
        if inner.objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", &format!("{} \"{}\" already exists", kind, name)));
        }

        let mut value = serde_json::to_value(obj)?;
        let version = inner.next_version();
        if value.pointer("/metadata/uid").and_then(Value::as_str).is_none() {
            value["metadata"]["uid"] = json!(format!("uid-{}", version));
        }
        if value.pointer("/metadata/generation").map(Value::is_null).unwrap_or(true) {
            value["metadata"]["generation"] = json!(1);
        }
        value["metadata"]["resourceVersion"] = json!(version);
        inner.objects.insert(key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = namespace_and_name(obj)?;
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        inner.record(Action::Update, &kind, &namespace, &name);
        inner.take_failure(Action::Update, &kind)?;

        let key = (type_key::<K>(), namespace, name.clone());
        let stored = match inner.objects.get(&key) {
            Some(stored) => stored.clone(),
            None => return Err(api_error(404, "NotFound", &format!("{} \"{}\" not found", kind, name))),
        };
        check_version(&kind, &name, obj, &stored)?;

        let mut value = serde_json::to_value(obj)?;
        // status, generation and deletion are owned by the server on this path
        for field in &["uid", "deletionTimestamp"] {
            if let Some(existing) = stored["metadata"].get(*field) {
                value["metadata"][*field] = existing.clone();
            }
        }
        let generation = stored.pointer("/metadata/generation").and_then(Value::as_i64).unwrap_or(1);
        let spec_changed = value.get("spec") != stored.get("spec");
        value["metadata"]["generation"] = json!(if spec_changed { generation + 1 } else { generation });
        match stored.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(fields) = value.as_object_mut() {
                    fields.remove("status");
                }
            }
        }
        value["metadata"]["resourceVersion"] = json!(inner.next_version());

        let deleting = value.pointer("/metadata/deletionTimestamp").map(|ts| !ts.is_null()).unwrap_or(false);
        let finalizers_left = value
            .pointer("/metadata/finalizers")
            .and_then(Value::as_array)
            .map(|finalizers| !finalizers.is_empty())
            .unwrap_or(false);
        if deleting && !finalizers_left {
            inner.objects.insert(key.clone(), value.clone());
            inner.remove_cascading(&key);
        } else {
            inner.objects.insert(key, value.clone());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, Error> {
        let (namespace, name) = namespace_and_name(obj)?;
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        inner.record(Action::UpdateStatus, &kind, &namespace, &name);
        inner.take_failure(Action::UpdateStatus, &kind)?;

        let key = (type_key::<K>(), namespace, name.clone());
        let mut stored = match inner.objects.get(&key) {
            Some(stored) => stored.clone(),
            None => return Err(api_error(404, "NotFound", &format!("{} \"{}\" not found", kind, name))),
        };
        check_version(&kind, &name, obj, &stored)?;

        let value = serde_json::to_value(obj)?;
        stored["status"] = value.get("status").cloned().unwrap_or(Value::Null);
        stored["metadata"]["resourceVersion"] = json!(inner.next_version());
        inner.objects.insert(key, stored.clone());
        Ok(serde_json::from_value(stored)?)
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<bool, Error> {
        let kind = K::kind(&()).to_string();
        let mut inner = self.lock();
        inner.record(Action::Delete, &kind, namespace, name);
        inner.take_failure(Action::Delete, &kind)?;

        let key = (type_key::<K>(), namespace.to_string(), name.to_string());
        let finalizers_left = match inner.objects.get(&key) {
            Some(stored) => stored
                .pointer("/metadata/finalizers")
                .and_then(Value::as_array)
                .map(|finalizers| !finalizers.is_empty())
                .unwrap_or(false),
            None => return Ok(false),
        };

        if finalizers_left {
            let version = inner.next_version();
            if let Some(stored) = inner.objects.get_mut(&key) {
                if stored.pointer("/metadata/deletionTimestamp").map(Value::is_null).unwrap_or(true) {
                    stored["metadata"]["deletionTimestamp"] =
                        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
                }
                stored["metadata"]["resourceVersion"] = json!(version);
            }
        } else {
            inner.remove_cascading(&key);
        }
        Ok(true)
    }
}

fn type_key<K: StoreObject>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

fn owner_uids(object: &Value) -> Vec<String> {
    object
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .filter_map(|owner| owner.get("uid").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn check_version<K: StoreObject>(kind: &str, name: &str, obj: &K, stored: &Value) -> Result<(), Error> {
    let stored_version = stored.pointer("/metadata/resourceVersion").and_then(Value::as_str);
    match obj.meta().resource_version.as_deref() {
        Some(version) if Some(version) != stored_version => Err(api_error(
            409,
            "Conflict",
            &format!(
                "Operation cannot be fulfilled on {} \"{}\": the object has been modified",
                kind, name
            ),
        )),
        _ => Ok(()),
    }
}

fn api_error(code: u16, reason: &str, message: &str) -> Error {
    Error::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}
