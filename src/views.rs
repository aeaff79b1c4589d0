use std::sync::Arc;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};

use crate::crd::{microservice::Microservice, scheduled_autoscaler::ScheduledAutoscaler};
use crate::errors::Error;
use crate::scheduler::{CronScheduler, Entry};
use crate::store::Store;

pub struct AppState<S> {
    pub store: Arc<S>,
    pub scheduler: Arc<CronScheduler>,
    /// Namespace the controllers watch, `None` for all of them.
    pub namespace: Option<String>,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>, scheduler: Arc<CronScheduler>, namespace: Option<String>) -> Self {
        AppState {
            store,
            scheduler,
            namespace,
        }
    }
}

// Simple health check endpoint
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::new(StatusCode::OK)
}

// List current microservices
pub async fn microservices<S: Store>(
    data: web::Data<AppState<S>>,
    _req: HttpRequest,
) -> Result<web::Json<Vec<Microservice>>, Error> {
    let microservices = data.store.list::<Microservice>(data.namespace.as_deref()).await?;
    Ok(web::Json(microservices))
}

// Get a microservice by name, the first match when several namespaces are watched
pub async fn get_microservice<S: Store>(
    data: web::Data<AppState<S>>,
    name: web::Path<String>,
) -> Result<web::Json<Microservice>, Error> {
    let name = name.into_inner();
    data.store
        .list::<Microservice>(data.namespace.as_deref())
        .await?
        .into_iter()
        .find(|microservice| microservice.metadata.name.as_deref() == Some(name.as_str()))
        .map(web::Json)
        .ok_or_else(|| Error::NotFound(format!("Microservice '{}'", name)))
}

pub async fn scheduled_autoscalers<S: Store>(
    data: web::Data<AppState<S>>,
    _req: HttpRequest,
) -> Result<web::Json<Vec<ScheduledAutoscaler>>, Error> {
    let scheduled_autoscalers = data.store.list::<ScheduledAutoscaler>(data.namespace.as_deref()).await?;
    Ok(web::Json(scheduled_autoscalers))
}

// Cron entries registered in this process
pub async fn schedules<S: Store>(data: web::Data<AppState<S>>, _req: HttpRequest) -> web::Json<Vec<Entry>> {
    web::Json(data.scheduler.entries())
}
