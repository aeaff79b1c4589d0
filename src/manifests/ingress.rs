use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule as RoutingRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};

use super::{child_metadata, workload_name};
use crate::crd::microservice::{IngressRule, Microservice};
use crate::errors::Error;

pub const PATH_TYPE: &str = "ImplementationSpecific";

pub fn ingress_name(workload: &str, rule: &str) -> String {
    format!("{}-{}", workload, rule)
}

/// One Ingress per declared rule.
///
/// A rule without paths routes everything to its backend, a rule without hosts
/// produces a single hostless routing rule.
pub fn ingresses(microservice: &Microservice) -> Result<Vec<Ingress>, Error> {
    let workload = workload_name(microservice)?;
    microservice
        .spec
        .ingress
        .iter()
        .map(|rule| {
            Ok(Ingress {
                metadata: child_metadata(
                    microservice,
                    ingress_name(&workload, &rule.name),
                    Some(rule.annotations.clone()),
                )?,
                spec: Some(IngressSpec {
                    rules: Some(routing_rules(rule)),
                    ..IngressSpec::default()
                }),
                ..Ingress::default()
            })
        })
        .collect()
}

fn routing_rules(rule: &IngressRule) -> Vec<RoutingRule> {
    let http = HTTPIngressRuleValue { paths: paths(rule) };

    if rule.hosts.is_empty() {
        return vec![RoutingRule {
            host: None,
            http: Some(http),
        }];
    }
    rule.hosts
        .iter()
        .map(|host| RoutingRule {
            host: Some(host.clone()),
            http: Some(http.clone()),
        })
        .collect()
}

fn paths(rule: &IngressRule) -> Vec<HTTPIngressPath> {
    let entry = |path: Option<String>| HTTPIngressPath {
        path,
        path_type: PATH_TYPE.to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: rule.name.clone(),
                port: Some(ServiceBackendPort {
                    number: Some(rule.container_port),
                    ..ServiceBackendPort::default()
                }),
            }),
            ..IngressBackend::default()
        },
    };

    if rule.paths.is_empty() {
        vec![entry(None)]
    } else {
        rule.paths.iter().cloned().map(|path| entry(Some(path))).collect()
    }
}
