use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::{future::join, StreamExt};
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Secret, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kube::{
    api::{Api, ListParams},
    runtime::controller::{Action, Context, Controller},
    Client, Resource,
};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize};

pub mod crd;
pub mod engine;
pub mod errors;
pub mod manifests;
pub mod scheduler;
pub mod store;
pub mod utils;
pub mod views;

#[cfg(test)]
mod tests;

use crate::crd::{
    microservice::{reconcile_microservice, Microservice},
    scheduled_autoscaler::{ScheduledAutoscaler, Supervisor},
};
use crate::errors::Error;
use crate::scheduler::CronScheduler;
use crate::store::KubeStore;
use crate::views::AppState;

#[derive(Deserialize, Debug, Clone)]
pub struct ControllerEnvironmentConfig {
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Namespace to watch, every namespace when unset or empty.
    #[serde(default)]
    pub watch_namespace: Option<String>,
    #[serde(default = "default_requeue_secs")]
    pub requeue_secs: u64,
    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

fn default_server_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_server_port() -> u16 {
    8888
}

fn default_requeue_secs() -> u64 {
    30
}

fn default_store_timeout_secs() -> u64 {
    15
}

impl Default for ControllerEnvironmentConfig {
    fn default() -> Self {
        ControllerEnvironmentConfig {
            server_host: default_server_host(),
            server_port: default_server_port(),
            watch_namespace: None,
            requeue_secs: default_requeue_secs(),
            store_timeout_secs: default_store_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub watch_namespace: Option<String>,
    pub requeue_after: Duration,
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env_config(env_config: ControllerEnvironmentConfig) -> Result<Self, Error> {
        if env_config.server_host.trim().is_empty() {
            return Err(Error::InvalidConfig("SERVER_HOST is empty".to_owned()));
        }
        if env_config.requeue_secs == 0 {
            return Err(Error::InvalidConfig("REQUEUE_SECS must be positive".to_owned()));
        }
        if env_config.store_timeout_secs == 0 {
            return Err(Error::InvalidConfig("STORE_TIMEOUT_SECS must be positive".to_owned()));
        }
        Ok(Config {
            server_host: env_config.server_host,
            server_port: env_config.server_port,
            watch_namespace: env_config.watch_namespace.filter(|namespace| !namespace.trim().is_empty()),
            requeue_after: Duration::from_secs(env_config.requeue_secs),
            store_timeout: Duration::from_secs(env_config.store_timeout_secs),
        })
    }
}

/// Shared by both reconcilers.
pub struct Data {
    pub store: Arc<KubeStore>,
    pub supervisor: Supervisor<KubeStore>,
    pub config: Config,
}

async fn reconcile_microservice_object(microservice: Arc<Microservice>, ctx: Context<Data>) -> Result<Action, Error> {
    let data = ctx.get_ref();
    reconcile_microservice(&*data.store, &microservice).await?;
    Ok(Action::await_change())
}

async fn reconcile_scheduled_autoscaler(
    scheduled_autoscaler: Arc<ScheduledAutoscaler>,
    ctx: Context<Data>,
) -> Result<Action, Error> {
    ctx.get_ref().supervisor.reconcile(&scheduled_autoscaler).await?;
    Ok(Action::await_change())
}

fn error_policy(error: &Error, ctx: Context<Data>) -> Action {
    let requeue_after = ctx.get_ref().config.requeue_after;
    warn!("Reconcile failed, retrying in {}s: {}", requeue_after.as_secs(), error);
    Action::requeue(requeue_after)
}

fn api<K>(client: &Client, namespace: &Option<String>) -> Api<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Build the Microservice and ScheduledAutoscaler controllers.
///
/// Returns the state the HTTP views read from, and a future that drives both
/// controllers until their watches end.
pub fn init_controller(client: Client, config: Config) -> (AppState<KubeStore>, impl Future<Output = ()>) {
    let store = Arc::new(KubeStore::new(client.clone(), config.store_timeout));
    let scheduler = Arc::new(CronScheduler::new());
    let namespace = config.watch_namespace.clone();

    let context = Context::new(Data {
        store: store.clone(),
        supervisor: Supervisor::new(store.clone(), scheduler.clone()),
        config,
    });

    // HorizontalPodAutoscalers are not watched, a scheduled override writing one
    // does not start a pass.
    let microservices = Controller::new(api::<Microservice>(&client, &namespace), ListParams::default())
        .owns(api::<ServiceAccount>(&client, &namespace), ListParams::default())
        .owns(api::<Secret>(&client, &namespace), ListParams::default())
        .owns(api::<Deployment>(&client, &namespace), ListParams::default())
        .owns(api::<Service>(&client, &namespace), ListParams::default())
        .owns(api::<Ingress>(&client, &namespace), ListParams::default())
        .run(reconcile_microservice_object, error_policy, context.clone())
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(
                    "Reconciled Microservice '{}/{}'",
                    object.namespace.as_deref().unwrap_or_default(),
                    object.name
                ),
                Err(err) => warn!("Microservice controller error: {}", err),
            }
        });

    let scheduled_autoscalers = Controller::new(
        api::<ScheduledAutoscaler>(&client, &namespace),
        ListParams::default(),
    )
    .run(reconcile_scheduled_autoscaler, error_policy, context)
    .for_each(|result| async move {
        match result {
            Ok((object, _)) => debug!(
                "Reconciled ScheduledAutoscaler '{}/{}'",
                object.namespace.as_deref().unwrap_or_default(),
                object.name
            ),
            Err(err) => warn!("ScheduledAutoscaler controller error: {}", err),
        }
    });

    let state = AppState::new(store, scheduler, namespace);
    let controllers = async move {
        join(microservices, scheduled_autoscalers).await;
    };
    (state, controllers)
}
