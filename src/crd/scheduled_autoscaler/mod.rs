use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use log::{debug, error, info, warn};

use crate::crd::metrics::{reconcile_happened, schedule_fired};
use crate::crd::microservice::{Microservice, OVERRIDE_ANNOTATION};
use crate::crd::{update_status, RunningState};
use crate::errors::Error;
use crate::scheduler::{CronScheduler, EntryId};
use crate::store::Store;
use crate::utils::{object_key, plural_str};

pub mod scheduled_autoscaler;
pub use scheduled_autoscaler::*;

pub const FINALIZER: &str = "microservice.example.com/finalizer";

pub fn has_finalizer(scheduled_autoscaler: &ScheduledAutoscaler) -> bool {
    scheduled_autoscaler
        .metadata
        .finalizers
        .as_ref()
        .map(|finalizers| finalizers.iter().any(|finalizer| finalizer == FINALIZER))
        .unwrap_or(false)
}

/// Keeps the cron entries of every ScheduledAutoscaler in step with its spec.
///
/// Entries live in the process-wide [`CronScheduler`] and are recorded in the
/// object's status. A finalizer holds deletion back until they are released.
pub struct Supervisor<S> {
    store: Arc<S>,
    scheduler: Arc<CronScheduler>,
}

impl<S> Clone for Supervisor<S> {
    fn clone(&self) -> Self {
        Supervisor {
            store: self.store.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<S: Store> Supervisor<S> {
    pub fn new(store: Arc<S>, scheduler: Arc<CronScheduler>) -> Self {
        Supervisor { store, scheduler }
    }

    pub async fn reconcile(&self, scheduled_autoscaler: &ScheduledAutoscaler) -> Result<(), Error> {
        let mut scheduled_autoscaler = scheduled_autoscaler.clone();

        if scheduled_autoscaler.metadata.deletion_timestamp.is_some() {
            if has_finalizer(&scheduled_autoscaler) {
                self.teardown(&mut scheduled_autoscaler).await?;
            }
            return Ok(());
        }

        if !has_finalizer(&scheduled_autoscaler) {
            scheduled_autoscaler
                .metadata
                .finalizers
                .get_or_insert_with(Vec::new)
                .push(FINALIZER.to_string());
            scheduled_autoscaler = self.store.update(&scheduled_autoscaler).await?;
            debug!("Added finalizer to ScheduledAutoscaler '{}'", object_key(&scheduled_autoscaler));
        }

        if !self.needs_sync(&scheduled_autoscaler) {
            return Ok(());
        }
        let result = self.sync(&mut scheduled_autoscaler).await;
        reconcile_happened("scheduled_autoscaler", if result.is_ok() { "success" } else { "error" });
        result
    }

    /// True when the spec has not been applied yet, or when the recorded entries are
    /// not all live in this process, for example after a restart.
    pub fn needs_sync(&self, scheduled_autoscaler: &ScheduledAutoscaler) -> bool {
        let status = match &scheduled_autoscaler.status {
            Some(status) => status,
            None => return true,
        };
        if status.state.is_none() || status.observed_generation != scheduled_autoscaler.metadata.generation {
            return true;
        }
        let key = object_key(scheduled_autoscaler);
        !status
            .scheduled_crons
            .iter()
            .all(|id| self.scheduler.owner_of(*id).as_deref() == Some(key.as_str()))
    }

    async fn sync(&self, scheduled_autoscaler: &mut ScheduledAutoscaler) -> Result<(), Error> {
        let key = object_key(scheduled_autoscaler);
        let status = scheduled_autoscaler.status.clone().unwrap_or_default();
        let reconciling = ScheduledAutoscalerStatus {
            state: Some(RunningState::Reconciling),
            ..status.clone()
        };
        update_status(&*self.store, scheduled_autoscaler, reconciling).await?;

        self.release(&key, &status.scheduled_crons);

        let schedules = scheduled_autoscaler.spec.schedules.clone();
        let mut registered = Vec::with_capacity(schedules.len());
        for schedule in &schedules {
            match self.register(scheduled_autoscaler, schedule) {
                Ok(id) => registered.push(id),
                Err(err) => {
                    self.release(&key, &registered);
                    return self.record_failure(scheduled_autoscaler, err).await;
                }
            }
        }

        let mut status = scheduled_autoscaler.status.clone().unwrap_or_default();
        status.state = Some(RunningState::Stable);
        status.scheduled_crons = registered.clone();
        status.observed_generation = scheduled_autoscaler.metadata.generation;
        if let Err(err) = update_status(&*self.store, scheduled_autoscaler, status).await {
            self.release(&key, &registered);
            return Err(err);
        }

        info!(
            "Registered {} {} for ScheduledAutoscaler '{}'",
            registered.len(),
            plural_str(registered.len(), "schedules"),
            key
        );
        Ok(())
    }

    fn register(&self, scheduled_autoscaler: &ScheduledAutoscaler, schedule: &Schedule) -> Result<EntryId, Error> {
        let namespace = scheduled_autoscaler
            .metadata
            .namespace
            .clone()
            .ok_or(Error::MissingKey(".metadata.namespace"))?;
        let job = ScaleJob::new(
            self.store.clone(),
            namespace,
            scheduled_autoscaler.spec.microservice_name.clone(),
            schedule.clone(),
        );
        self.scheduler
            .register(&object_key(scheduled_autoscaler), &schedule.cron, move || {
                let job = job.clone();
                async move { job.run().await }
            })
    }

    async fn record_failure(&self, scheduled_autoscaler: &mut ScheduledAutoscaler, err: Error) -> Result<(), Error> {
        let key = object_key(scheduled_autoscaler);
        error!("Failed to schedule ScheduledAutoscaler '{}': {}", key, err);
        let mut status = scheduled_autoscaler.status.clone().unwrap_or_default();
        status.state = Some(RunningState::Reconciling);
        status.error = err.to_string();
        status.scheduled_crons = Vec::new();
        if let Err(status_err) = update_status(&*self.store, scheduled_autoscaler, status).await {
            error!("Failed to record error on ScheduledAutoscaler '{}': {}", key, status_err);
        }
        Err(err)
    }

    /// Remove the entries in `ids` that `owner` registered. Entries from another owner
    /// or an earlier process are left alone.
    fn release(&self, owner: &str, ids: &[EntryId]) {
        for id in ids {
            match self.scheduler.owner_of(*id) {
                Some(ref entry_owner) if entry_owner == owner => {
                    self.scheduler.remove(*id);
                }
                Some(_) => warn!("Cron entry {} is not owned by '{}', skipping", id, owner),
                None => debug!("Cron entry {} of '{}' is already gone", id, owner),
            }
        }
    }

    async fn teardown(&self, scheduled_autoscaler: &mut ScheduledAutoscaler) -> Result<(), Error> {
        let key = object_key(scheduled_autoscaler);
        let recorded = scheduled_autoscaler
            .status
            .as_ref()
            .map(|status| status.scheduled_crons.clone())
            .unwrap_or_default();
        self.release(&key, &recorded);
        let leftover = self.scheduler.remove_owned(&key);
        if leftover > 0 {
            warn!("Removed {} unrecorded cron entries of '{}'", leftover, key);
        }

        if let Some(finalizers) = scheduled_autoscaler.metadata.finalizers.as_mut() {
            finalizers.retain(|finalizer| finalizer != FINALIZER);
        }
        self.store.update(scheduled_autoscaler).await?;
        info!("Released cron entries of deleted ScheduledAutoscaler '{}'", key);
        Ok(())
    }
}

/// What a cron entry does when it fires: pin the target's autoscaler to the
/// schedule's bounds and mark the Microservice as overridden.
pub struct ScaleJob<S> {
    store: Arc<S>,
    namespace: String,
    microservice_name: String,
    schedule: Schedule,
}

impl<S> Clone for ScaleJob<S> {
    fn clone(&self) -> Self {
        ScaleJob {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            microservice_name: self.microservice_name.clone(),
            schedule: self.schedule.clone(),
        }
    }
}

impl<S: Store> ScaleJob<S> {
    pub fn new(store: Arc<S>, namespace: String, microservice_name: String, schedule: Schedule) -> Self {
        ScaleJob {
            store,
            namespace,
            microservice_name,
            schedule,
        }
    }

    /// Fire once. Failures are logged and counted, nobody is waiting for the result.
    pub async fn run(&self) {
        let target = format!("{}/{}", self.namespace, self.microservice_name);
        match self.apply().await {
            Ok(()) => {
                info!(
                    "Schedule '{}' scaled '{}' to {}-{} replicas",
                    self.schedule.name, target, self.schedule.min_replicas, self.schedule.max_replicas
                );
                schedule_fired("success");
            }
            Err(err) => {
                error!("Schedule '{}' failed to scale '{}': {}", self.schedule.name, target, err);
                schedule_fired("error");
            }
        }
    }

    pub async fn apply(&self) -> Result<(), Error> {
        let mut hpa: HorizontalPodAutoscaler = self
            .store
            .get(&self.namespace, &self.microservice_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "HorizontalPodAutoscaler '{}/{}'",
                    self.namespace, self.microservice_name
                ))
            })?;
        let spec = hpa.spec.get_or_insert_with(Default::default);
        spec.max_replicas = self.schedule.max_replicas;
        spec.min_replicas = Some(self.schedule.min_replicas);
        self.store.update(&hpa).await?;

        let mut microservice: Microservice = self
            .store
            .get(&self.namespace, &self.microservice_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Microservice '{}/{}'", self.namespace, self.microservice_name)))?;
        microservice
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(OVERRIDE_ANNOTATION.to_string(), "true".to_string());
        self.store.update(&microservice).await?;
        Ok(())
    }
}
