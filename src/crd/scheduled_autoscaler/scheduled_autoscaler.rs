use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::{RunningState, WithStatus};
use crate::scheduler::EntryId;

/// Replica bounds applied to a Microservice's autoscaler on a calendar schedule.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "microservice.example.com",
    version = "v1beta1",
    kind = "ScheduledAutoscaler",
    namespaced,
    status = "ScheduledAutoscalerStatus",
    shortname = "sas",
    printcolumn = r#"{"name":"Microservice","type":"string","jsonPath":".spec.microserviceName"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAutoscalerSpec {
    pub microservice_name: String,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub name: String,
    /// Five-field cron, six or seven fields with seconds, `@daily` style
    /// descriptors or `@every <n><ms|s|m|h>`. Evaluated in UTC.
    pub cron: String,
    pub min_replicas: i32,
    pub max_replicas: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAutoscalerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunningState>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Cron entries registered for this object in the running controller.
    #[serde(default)]
    pub scheduled_crons: Vec<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl WithStatus for ScheduledAutoscaler {
    type Status = ScheduledAutoscalerStatus;

    fn status(&self) -> Option<&ScheduledAutoscalerStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Option<ScheduledAutoscalerStatus> {
        &mut self.status
    }

    fn state(status: &ScheduledAutoscalerStatus) -> Option<RunningState> {
        status.state
    }
}
