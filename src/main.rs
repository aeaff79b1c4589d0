use actix_web::{middleware, web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use kube::client::Client;
use log::{debug, info, warn};
use microservice_controller::{
    crd, errors::Error, init_controller, store::KubeStore, views, Config, ControllerEnvironmentConfig,
};
use prometheus::Registry;

#[actix_rt::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let env_config = envy::from_env::<ControllerEnvironmentConfig>()
        .map_err(|err| Error::InvalidConfig(format!("failed to load environment config: {}", err)))?;
    debug!("Environment config: {:?}", &env_config);
    let config = Config::from_env_config(env_config)?;
    info!("Starting with config: {:?}", config);

    let bind_address = format!("{}:{}", &config.server_host, config.server_port);

    let client = Client::try_default().await?;
    let (state, controller) = init_controller(client, config);
    let state = web::Data::new(state);

    let registry = Registry::new();
    crd::metrics::custom_metrics(&registry);
    let prometheus = PrometheusMetricsBuilder::new(crd::metrics::METRICS_NAMESPACE)
        .registry(registry)
        .endpoint("/metrics")
        .build()
        .map_err(|err| Error::InvalidConfig(format!("failed to set up metrics: {}", err)))?;

    let run = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default().exclude("/health").exclude("/metrics"))
            .wrap(middleware::Compress::default())
            .service(web::resource("/health").to(views::health))
            .service(web::resource("/microservices").to(views::microservices::<KubeStore>))
            .service(web::resource("/microservices/{name}").to(views::get_microservice::<KubeStore>))
            .service(web::resource("/scheduledautoscalers").to(views::scheduled_autoscalers::<KubeStore>))
            .service(web::resource("/schedules").to(views::schedules::<KubeStore>))
    })
    .bind(&bind_address)?
    .run();

    tokio::select! {
        _ = controller => warn!("controller drained"),
        result = run => match result {
            Ok(()) => info!("actix exited"),
            Err(err) => warn!("actix exited with error: {}", err),
        },
    }
    Ok(())
}
