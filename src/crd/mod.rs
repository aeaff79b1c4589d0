use std::fmt;
use std::fmt::Debug;

use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::store::{Store, StoreObject};
use crate::utils::object_key;

pub mod metrics;
pub mod microservice;
pub mod scheduled_autoscaler;

/// Progress of a custom resource as reported in its status.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    Reconciling,
    // kept for compatibility with existing objects, nothing sets it
    Ready,
    Stable,
}

impl fmt::Display for RunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunningState::Reconciling => "reconciling",
            RunningState::Ready => "ready",
            RunningState::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// A custom resource whose status carries a [`RunningState`].
pub trait WithStatus: StoreObject {
    type Status: Clone + Debug + Default + PartialEq + Send + Sync;

    fn status(&self) -> Option<&Self::Status>;
    fn status_mut(&mut self) -> &mut Option<Self::Status>;
    fn state(status: &Self::Status) -> Option<RunningState>;
}

/// Write `status` to the store unless `obj` already carries exactly that status.
/// On success `obj` is replaced by the stored object, so it holds the new resourceVersion.
pub async fn update_status<K, S>(store: &S, obj: &mut K, status: K::Status) -> Result<(), Error>
where
    K: WithStatus,
    S: Store + ?Sized,
{
    if obj.status() == Some(&status) {
        return Ok(());
    }
    let previous = obj.status().and_then(K::state);
    let next = K::state(&status);

    let mut updated = obj.clone();
    *updated.status_mut() = Some(status);
    *obj = store.update_status(&updated).await?;

    if previous != next {
        if let Some(state) = next {
            info!("{} '{}' is now {}", K::kind(&()), object_key(obj), state);
        }
    }
    Ok(())
}
