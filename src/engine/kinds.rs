use k8s_openapi::api::{
    apps::v1::Deployment,
    autoscaling::v2::HorizontalPodAutoscaler,
    core::v1::{Secret, Service, ServiceAccount},
    networking::v1::Ingress,
};

use super::{ChildKind, Cleanup};
use crate::crd::microservice::{is_overridden, Microservice};
use crate::errors::Error;
use crate::manifests::{self, workload_name};

pub struct ServiceAccounts;

impl ChildKind for ServiceAccounts {
    type Object = ServiceAccount;
    const NAME: &'static str = "ServiceAccount";

    fn wanted(microservice: &Microservice) -> bool {
        !microservice.spec.disable_service_account_creation
    }

    fn generate(microservice: &Microservice) -> Result<Vec<ServiceAccount>, Error> {
        Ok(vec![manifests::service_account(microservice)?])
    }

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error> {
        Ok(Cleanup::ByName(vec![workload_name(microservice)?]))
    }

    fn merge_auto_assigned(desired: &mut ServiceAccount, current: &ServiceAccount) {
        if desired.secrets.is_none() {
            desired.secrets = current.secrets.clone();
        }
    }
}

pub struct ServiceAccountSecrets;

impl ChildKind for ServiceAccountSecrets {
    type Object = Secret;
    const NAME: &'static str = "Secret";

    fn wanted(microservice: &Microservice) -> bool {
        !microservice.spec.disable_service_account_creation
    }

    fn generate(microservice: &Microservice) -> Result<Vec<Secret>, Error> {
        Ok(vec![manifests::service_account_secret(microservice)?])
    }

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error> {
        let name = manifests::service_account_secret_name(&workload_name(microservice)?);
        Ok(Cleanup::ByName(vec![name]))
    }

    // token, ca.crt and namespace are written by the token controller
    fn merge_auto_assigned(desired: &mut Secret, current: &Secret) {
        if desired.data.is_none() {
            desired.data = current.data.clone();
        }
    }
}

pub struct Deployments;

impl ChildKind for Deployments {
    type Object = Deployment;
    const NAME: &'static str = "Deployment";

    fn wanted(_microservice: &Microservice) -> bool {
        true
    }

    fn generate(microservice: &Microservice) -> Result<Vec<Deployment>, Error> {
        Ok(vec![manifests::deployment(microservice)?])
    }

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error> {
        Ok(Cleanup::ByName(vec![workload_name(microservice)?]))
    }
}

pub struct Autoscalers;

impl ChildKind for Autoscalers {
    type Object = HorizontalPodAutoscaler;
    const NAME: &'static str = "HorizontalPodAutoscaler";

    fn wanted(microservice: &Microservice) -> bool {
        microservice.spec.autoscaling.is_some()
    }

    fn overridden(microservice: &Microservice) -> bool {
        is_overridden(microservice)
    }

    fn generate(microservice: &Microservice) -> Result<Vec<HorizontalPodAutoscaler>, Error> {
        Ok(manifests::horizontal_pod_autoscaler(microservice)?.into_iter().collect())
    }

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error> {
        Ok(Cleanup::ByName(vec![workload_name(microservice)?]))
    }
}

pub struct Services;

impl ChildKind for Services {
    type Object = Service;
    const NAME: &'static str = "Service";

    fn wanted(microservice: &Microservice) -> bool {
        !microservice.spec.ingress.is_empty()
    }

    fn generate(microservice: &Microservice) -> Result<Vec<Service>, Error> {
        Ok(vec![manifests::service(microservice)?])
    }

    fn cleanup(microservice: &Microservice) -> Result<Cleanup, Error> {
        Ok(Cleanup::ByName(vec![workload_name(microservice)?]))
    }

    fn merge_auto_assigned(desired: &mut Service, current: &Service) {
        let (wanted, have) = match (desired.spec.as_mut(), current.spec.as_ref()) {
            (Some(wanted), Some(have)) => (wanted, have),
            _ => return,
        };
        wanted.cluster_ip = wanted.cluster_ip.take().or_else(|| have.cluster_ip.clone());
        wanted.cluster_ips = wanted.cluster_ips.take().or_else(|| have.cluster_ips.clone());
        wanted.ip_families = wanted.ip_families.take().or_else(|| have.ip_families.clone());
        wanted.ip_family_policy = wanted.ip_family_policy.take().or_else(|| have.ip_family_policy.clone());
        wanted.health_check_node_port = wanted.health_check_node_port.or(have.health_check_node_port);

        if let (Some(ports), Some(existing)) = (wanted.ports.as_mut(), have.ports.as_ref()) {
            for port in ports.iter_mut().filter(|port| port.node_port.is_none()) {
                port.node_port = existing
                    .iter()
                    .find(|assigned| assigned.name == port.name)
                    .and_then(|assigned| assigned.node_port);
            }
        }
    }
}

pub struct Ingresses;

impl ChildKind for Ingresses {
    type Object = Ingress;
    const NAME: &'static str = "Ingress";

    fn wanted(microservice: &Microservice) -> bool {
        !microservice.spec.ingress.is_empty() && microservice.spec.ingress_enabled != Some(false)
    }

    fn generate(microservice: &Microservice) -> Result<Vec<Ingress>, Error> {
        manifests::ingresses(microservice)
    }

    // one object per rule, so renamed or dropped rules are found through ownership
    fn cleanup(_microservice: &Microservice) -> Result<Cleanup, Error> {
        Ok(Cleanup::ByOwner)
    }
}
