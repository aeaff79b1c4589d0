use k8s_openapi::api::autoscaling::v2::{CrossVersionObjectReference, HorizontalPodAutoscaler};

use super::{child_metadata, workload_name};
use crate::crd::microservice::Microservice;
use crate::errors::Error;

/// The single HorizontalPodAutoscaler of a Microservice, or `None` when autoscaling is
/// not declared. A scale target without a name points at the Microservice's Deployment.
pub fn horizontal_pod_autoscaler(microservice: &Microservice) -> Result<Option<HorizontalPodAutoscaler>, Error> {
    let mut spec = match &microservice.spec.autoscaling {
        Some(autoscaling) => autoscaling.clone(),
        None => return Ok(None),
    };
    let name = workload_name(microservice)?;

    if spec.scale_target_ref.name.is_empty() {
        spec.scale_target_ref = CrossVersionObjectReference {
            api_version: Some("apps/v1".to_string()),
            kind: "Deployment".to_string(),
            name: name.clone(),
        };
    }

    Ok(Some(HorizontalPodAutoscaler {
        metadata: child_metadata(microservice, name, microservice.metadata.annotations.clone())?,
        spec: Some(spec),
        ..HorizontalPodAutoscaler::default()
    }))
}
