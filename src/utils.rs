use k8s_openapi::{
    api::core::v1::EnvVar,
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference},
};
use kube::api::Resource;
use serde_json::Value;

use crate::errors::Error;

/// Controller owner reference pointing at `meta`, so the API server garbage collects
/// the dependent once the owner is gone.
pub fn object_to_owner_reference<K: Resource<DynamicType = ()>>(meta: &ObjectMeta) -> Result<OwnerReference, Error> {
    Ok(OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: meta.name.clone().ok_or(Error::MissingKey(".metadata.name"))?,
        uid: meta.uid.clone().ok_or(Error::MissingKey(".metadata.uid"))?,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// True if any owner reference of `meta` carries `uid`.
pub fn is_owned_by(meta: &ObjectMeta, uid: &str) -> bool {
    meta.owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|owner| owner.uid == uid))
        .unwrap_or(false)
}

/// `namespace/name` of a resource, for log lines and scheduler ownership.
pub fn object_key<T: Resource>(resource: &T) -> String {
    let meta = resource.meta();
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}

pub fn plural_str(length: usize, word: &str) -> String {
    if length == 1 {
        word.trim_end_matches('s').to_string()
    } else {
        word.to_string()
    }
}

pub fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// Structural containment check used to decide whether an update is needed.
///
/// Every field set in `desired` must be present with the same value in `current`;
/// fields only present in `current` (server defaults, allocated values) are ignored.
/// Arrays must have the same length and match element by element.
pub fn is_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Null, _) => true,
        (Value::Object(wanted), Value::Object(have)) => wanted.iter().all(|(key, value)| match have.get(key) {
            Some(existing) => is_subset(value, existing),
            None => is_empty(value),
        }),
        (Value::Array(wanted), Value::Array(have)) => {
            wanted.len() == have.len() && wanted.iter().zip(have.iter()).all(|(w, h)| is_subset(w, h))
        }
        (wanted, Value::Null) => is_empty(wanted),
        (wanted, have) => wanted == have,
    }
}

// The API server drops empty collections, so `[]` and `{}` match a missing field.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
