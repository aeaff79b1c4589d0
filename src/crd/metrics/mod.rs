use kube::Error;
use lazy_static::lazy_static;
use prometheus::{IntCounterVec, IntGauge, Opts, Registry};

pub const METRICS_NAMESPACE: &str = "microservice_controller";

lazy_static! {
    pub static ref KUBE_ERRORS: IntCounterVec = IntCounterVec::new(
      Opts::new("kube_errors", "microservice-controller k8s related errors")
      .namespace(METRICS_NAMESPACE),
      &["action", "kube_name"]
    ).unwrap();
    pub static ref ERRORS: IntCounterVec = IntCounterVec::new(
      Opts::new("errors", "microservice-controller errors")
      .namespace(METRICS_NAMESPACE),
      &["name"]
    ).unwrap();
    pub static ref RECONCILES: IntCounterVec = IntCounterVec::new(
      Opts::new("reconciles", "reconcile passes by resource kind and outcome")
      .namespace(METRICS_NAMESPACE),
      &["kind", "result"]
    ).unwrap();
    pub static ref SCHEDULE_FIRINGS: IntCounterVec = IntCounterVec::new(
      Opts::new("schedule_firings", "scheduled autoscaler overrides by outcome")
      .namespace(METRICS_NAMESPACE),
      &["result"]
    ).unwrap();
    pub static ref CRON_ENTRIES: IntGauge = IntGauge::with_opts(
      Opts::new("cron_entries", "cron entries currently registered")
      .namespace(METRICS_NAMESPACE)
    ).unwrap();
}

pub fn custom_metrics(registry: &Registry) {
  registry.register(Box::new(KUBE_ERRORS.clone())).unwrap();
  registry.register(Box::new(ERRORS.clone())).unwrap();
  registry.register(Box::new(RECONCILES.clone())).unwrap();
  registry.register(Box::new(SCHEDULE_FIRINGS.clone())).unwrap();
  registry.register(Box::new(CRON_ENTRIES.clone())).unwrap();
}

pub fn kube_error_name(err: &Error) -> &'static str {
  match err {
    Error::Api(_) => "api",
    Error::HyperError(_) => "hyper_error",
    Error::Service(_) => "service_error",
    Error::HttpError(_) => "http_error",
    Error::SerdeError(_) => "serde_error",
    Error::BuildRequest(_) => "request_build",
    _ => "other",
  }
}

pub fn kube_error_happened(action: &str, err: &Error) {
  KUBE_ERRORS.with_label_values(&[action, kube_error_name(err)]).inc_by(1);
}

pub fn error_happened(name: &str) {
  ERRORS.with_label_values(&[name]).inc_by(1);
}

pub fn reconcile_happened(kind: &str, result: &str) {
  RECONCILES.with_label_values(&[kind, result]).inc_by(1);
}

pub fn schedule_fired(result: &str) {
  SCHEDULE_FIRINGS.with_label_values(&[result]).inc_by(1);
}
