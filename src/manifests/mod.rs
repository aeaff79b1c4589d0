//! Desired child objects of a [`Microservice`].
//!
//! Everything here is a pure function of the Microservice: no I/O, and the same spec
//! always produces the same object, so comparing a generated object with the stored
//! one is meaningful. Maps are `BTreeMap`s, which keeps env vars, labels and
//! annotations in a stable order regardless of how the user wrote them.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::crd::microservice::Microservice;
use crate::errors::Error;
use crate::utils::object_to_owner_reference;

pub mod autoscaling;
pub mod deployment;
pub mod identity;
pub mod ingress;
pub mod service;

pub use autoscaling::horizontal_pod_autoscaler;
pub use deployment::deployment;
pub use identity::{service_account, service_account_secret, service_account_secret_name};
pub use ingress::{ingress_name, ingresses};
pub use service::service;

pub(crate) fn workload_name(microservice: &Microservice) -> Result<String, Error> {
    microservice.metadata.name.clone().ok_or(Error::MissingKey(".metadata.name"))
}

/// Metadata shared by every child: name, the owner's namespace and labels, and a
/// controller reference back to the owner.
pub(crate) fn child_metadata(
    microservice: &Microservice,
    name: String,
    annotations: Option<BTreeMap<String, String>>,
) -> Result<ObjectMeta, Error> {
    Ok(ObjectMeta {
        name: Some(name),
        namespace: microservice.metadata.namespace.clone(),
        owner_references: Some(vec![object_to_owner_reference::<Microservice>(&microservice.metadata)?]),
        labels: non_empty(&microservice.spec.labels),
        annotations: annotations.filter(|annotations| !annotations.is_empty()),
        ..ObjectMeta::default()
    })
}

pub(crate) fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}
