use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment},
        core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, ObjectMeta},
        util::intstr::IntOrString,
    },
};

use super::{child_metadata, non_empty, workload_name};
use crate::crd::microservice::Microservice;
use crate::errors::Error;
use crate::utils::env_var;

pub const DEFAULT_REVISION_HISTORY_LIMIT: i32 = 5;
pub const DEFAULT_MAX_UNAVAILABLE: i32 = 0;
pub const DEFAULT_MAX_SURGE: i32 = 1;
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Deployment running the Microservice's single container.
///
/// `spec.labels` is used for the object labels, the selector and the pod template,
/// so the three can never drift apart. Each ingress rule contributes one named
/// container port.
///
/// Lists are always emitted, even when empty, so dropping the last entry still
/// registers as a change against the stored object.
pub fn deployment(microservice: &Microservice) -> Result<Deployment, Error> {
    let name = workload_name(microservice)?;
    let spec = &microservice.spec;

    let env: Vec<EnvVar> = spec.env.iter().map(|(key, value)| env_var(key, value)).collect();
    let ports: Vec<ContainerPort> = spec
        .ingress
        .iter()
        .map(|rule| ContainerPort {
            name: Some(rule.name.clone()),
            container_port: rule.container_port,
            ..ContainerPort::default()
        })
        .collect();

    let container = Container {
        name: name.clone(),
        image: Some(spec.image.clone()),
        resources: spec.resources.clone(),
        env: Some(env),
        ports: Some(ports),
        liveness_probe: spec.liveness_probe.clone(),
        readiness_probe: spec.readiness_probe.clone(),
        ..Container::default()
    };

    let service_account_name = if spec.disable_service_account_creation {
        DEFAULT_SERVICE_ACCOUNT.to_string()
    } else {
        name.clone()
    };

    Ok(Deployment {
        metadata: child_metadata(microservice, name, None)?,
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            revision_history_limit: Some(DEFAULT_REVISION_HISTORY_LIMIT),
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_unavailable: Some(IntOrString::Int(DEFAULT_MAX_UNAVAILABLE)),
                    max_surge: Some(IntOrString::Int(DEFAULT_MAX_SURGE)),
                }),
            }),
            selector: LabelSelector {
                match_labels: non_empty(&spec.labels),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: non_empty(&spec.labels),
                    annotations: non_empty(&spec.pod_annotations),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    node_selector: non_empty(&spec.node_selector),
                    tolerations: Some(spec.tolerations.clone()),
                    service_account_name: Some(service_account_name),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    })
}
