use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscalerSpec;

use crate::crd::microservice::{IngressRule, Microservice, MicroserviceSpec};
use crate::crd::scheduled_autoscaler::{Schedule, ScheduledAutoscaler, ScheduledAutoscalerSpec};
use crate::store::{MemoryStore, Store};

pub const NAMESPACE: &str = "default";

pub fn labels() -> BTreeMap<String, String> {
    vec![("app".to_owned(), "orders".to_owned())].into_iter().collect()
}

pub fn rule(name: &str, port: i32, hosts: &[&str], paths: &[&str]) -> IngressRule {
    IngressRule {
        name: name.to_owned(),
        container_port: port,
        hosts: hosts.iter().map(|host| host.to_string()).collect(),
        paths: paths.iter().map(|path| path.to_string()).collect(),
        annotations: BTreeMap::new(),
    }
}

pub fn autoscaling(min: i32, max: i32) -> HorizontalPodAutoscalerSpec {
    HorizontalPodAutoscalerSpec {
        min_replicas: Some(min),
        max_replicas: max,
        ..HorizontalPodAutoscalerSpec::default()
    }
}

// Workload with every child kind wanted
pub fn spec() -> MicroserviceSpec {
    MicroserviceSpec {
        image: "registry.example.com/orders:1.4.2".to_owned(),
        replicas: 2,
        labels: labels(),
        env: vec![
            ("LOG_LEVEL".to_owned(), "info".to_owned()),
            ("DB_HOST".to_owned(), "orders-db".to_owned()),
        ]
        .into_iter()
        .collect(),
        ingress: vec![rule("http", 8080, &["orders.example.com"], &["/api"])],
        autoscaling: Some(autoscaling(2, 5)),
        ..MicroserviceSpec::default()
    }
}

pub fn microservice(name: &str, spec: MicroserviceSpec) -> Microservice {
    let mut microservice = Microservice::new(name, spec);
    microservice.metadata.namespace = Some(NAMESPACE.to_owned());
    microservice
}

// As if it had been read back from the API server
pub fn persisted(name: &str, spec: MicroserviceSpec) -> Microservice {
    let mut microservice = microservice(name, spec);
    microservice.metadata.uid = Some(format!("{}-uid", name));
    microservice
}

pub async fn create_microservice(store: &MemoryStore, name: &str, spec: MicroserviceSpec) -> Microservice {
    store.create(&microservice(name, spec)).await.unwrap()
}

pub async fn get_microservice(store: &MemoryStore, name: &str) -> Microservice {
    store.get(NAMESPACE, name).await.unwrap().unwrap()
}

pub fn schedule(name: &str, cron: &str, min: i32, max: i32) -> Schedule {
    Schedule {
        name: name.to_owned(),
        cron: cron.to_owned(),
        min_replicas: min,
        max_replicas: max,
    }
}

pub fn scheduled_autoscaler(name: &str, target: &str, schedules: Vec<Schedule>) -> ScheduledAutoscaler {
    let mut scheduled_autoscaler = ScheduledAutoscaler::new(
        name,
        ScheduledAutoscalerSpec {
            microservice_name: target.to_owned(),
            schedules,
        },
    );
    scheduled_autoscaler.metadata.namespace = Some(NAMESPACE.to_owned());
    scheduled_autoscaler
}

pub async fn get_scheduled_autoscaler(store: &MemoryStore, name: &str) -> Option<ScheduledAutoscaler> {
    store.get(NAMESPACE, name).await.unwrap()
}
