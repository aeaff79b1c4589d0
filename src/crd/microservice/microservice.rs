use std::collections::BTreeMap;

use k8s_openapi::api::{
    autoscaling::v2::HorizontalPodAutoscalerSpec,
    core::v1::{Probe, ResourceRequirements, Toleration},
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::{RunningState, WithStatus};

/// A long-running workload together with its identity, network endpoint, routing
/// rules and autoscaling policy.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "microservice.example.com",
    version = "v1beta1",
    kind = "Microservice",
    namespaced,
    status = "MicroserviceStatus",
    shortname = "ms",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceSpec {
    pub image: String,
    pub replicas: i32,
    /// Labels of every child, also used as the pod selector.
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default)]
    pub pod_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
    /// `false` keeps the Service but drops every Ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<HorizontalPodAutoscalerSpec>,
    #[serde(default)]
    pub disable_service_account_creation: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    pub name: String,
    pub container_port: i32,
    #[serde(rename = "host", default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunningState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl WithStatus for Microservice {
    type Status = MicroserviceStatus;

    fn status(&self) -> Option<&MicroserviceStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Option<MicroserviceStatus> {
        &mut self.status
    }

    fn state(status: &MicroserviceStatus) -> Option<RunningState> {
        status.state
    }
}
