use log::{error, info};

use crate::crd::metrics::reconcile_happened;
use crate::crd::{update_status, RunningState};
use crate::engine::{
    ensure,
    kinds::{Autoscalers, Deployments, Ingresses, ServiceAccountSecrets, ServiceAccounts, Services},
};
use crate::errors::Error;
use crate::store::Store;
use crate::utils::object_key;

pub mod microservice;
pub use microservice::*;

/// Set to `"true"` by a firing schedule. While present the autoscaling step leaves
/// the HorizontalPodAutoscaler alone. Nothing clears it.
pub const OVERRIDE_ANNOTATION: &str = "scheduledautoscaler.override";

pub fn is_overridden(microservice: &Microservice) -> bool {
    microservice
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(OVERRIDE_ANNOTATION))
        .map(|value| value == "true")
        .unwrap_or(false)
}

/// One reconcile pass over a Microservice and its children.
///
/// A new object or an unobserved generation is first moved to `reconciling`. The
/// children are then brought in line in a fixed order; the first failure is written
/// to the status and returned. A clean pass ends in `stable`.
pub async fn reconcile_microservice<S: Store>(store: &S, microservice: &Microservice) -> Result<(), Error> {
    let mut microservice = microservice.clone();
    let key = object_key(&microservice);
    let status = microservice.status.clone().unwrap_or_default();

    if status.state.is_none() || status.observed_generation != microservice.metadata.generation {
        let reconciling = MicroserviceStatus {
            state: Some(RunningState::Reconciling),
            ..status
        };
        update_status(store, &mut microservice, reconciling).await?;
    }

    match ensure_children(store, &microservice).await {
        Ok(()) => {
            let mut status = microservice.status.clone().unwrap_or_default();
            status.state = Some(RunningState::Stable);
            status.observed_generation = microservice.metadata.generation;
            update_status(store, &mut microservice, status).await?;
            reconcile_happened("microservice", "success");
            Ok(())
        }
        Err(err) => {
            error!("Failed to reconcile Microservice '{}': {}", key, err);
            let mut status = microservice.status.clone().unwrap_or_default();
            status.state = Some(RunningState::Reconciling);
            status.error = err.to_string();
            if let Err(status_err) = update_status(store, &mut microservice, status).await {
                error!("Failed to record error on Microservice '{}': {}", key, status_err);
            }
            reconcile_happened("microservice", "error");
            Err(err)
        }
    }
}

async fn ensure_children<S: Store>(store: &S, microservice: &Microservice) -> Result<(), Error> {
    ensure::<ServiceAccounts, S>(store, microservice).await?;
    ensure::<ServiceAccountSecrets, S>(store, microservice).await?;
    ensure::<Deployments, S>(store, microservice).await?;
    ensure::<Autoscalers, S>(store, microservice).await?;
    ensure::<Services, S>(store, microservice).await?;
    ensure::<Ingresses, S>(store, microservice).await?;
    info!("Children of Microservice '{}' are up to date", object_key(microservice));
    Ok(())
}
