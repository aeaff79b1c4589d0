use k8s_openapi::{
    api::core::v1::{Service, ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

use super::{child_metadata, non_empty, workload_name};
use crate::crd::microservice::Microservice;
use crate::errors::Error;

pub const SERVICE_TYPE: &str = "NodePort";

// One TCP port per ingress rule, named after the rule.
pub fn service(microservice: &Microservice) -> Result<Service, Error> {
    let name = workload_name(microservice)?;
    let ports = microservice
        .spec
        .ingress
        .iter()
        .map(|rule| ServicePort {
            name: Some(rule.name.clone()),
            port: rule.container_port,
            target_port: Some(IntOrString::Int(rule.container_port)),
            protocol: Some("TCP".to_string()),
            ..ServicePort::default()
        })
        .collect();

    Ok(Service {
        metadata: child_metadata(microservice, name, microservice.metadata.annotations.clone())?,
        spec: Some(ServiceSpec {
            selector: non_empty(&microservice.spec.labels),
            ports: Some(ports),
            type_: Some(SERVICE_TYPE.to_string()),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    })
}
