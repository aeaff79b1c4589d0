use k8s_openapi::api::core::v1::{Secret, ServiceAccount};

use super::{child_metadata, workload_name};
use crate::crd::microservice::Microservice;
use crate::errors::Error;

pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
pub const SERVICE_ACCOUNT_NAME_ANNOTATION: &str = "kubernetes.io/service-account.name";

pub fn service_account_secret_name(workload: &str) -> String {
    format!("{}-sa", workload)
}

/// ServiceAccount named after the Microservice.
pub fn service_account(microservice: &Microservice) -> Result<ServiceAccount, Error> {
    let name = workload_name(microservice)?;
    Ok(ServiceAccount {
        metadata: child_metadata(microservice, name, microservice.metadata.annotations.clone())?,
        ..ServiceAccount::default()
    })
}

/// Long-lived token Secret bound to the Microservice's ServiceAccount. The token
/// controller fills in `data` once the Secret exists.
pub fn service_account_secret(microservice: &Microservice) -> Result<Secret, Error> {
    let name = workload_name(microservice)?;
    let mut annotations = microservice.metadata.annotations.clone().unwrap_or_default();
    annotations.insert(SERVICE_ACCOUNT_NAME_ANNOTATION.to_string(), name.clone());

    Ok(Secret {
        metadata: child_metadata(microservice, service_account_secret_name(&name), Some(annotations))?,
        type_: Some(SERVICE_ACCOUNT_TOKEN_TYPE.to_string()),
        ..Secret::default()
    })
}
