use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};

use microservice_controller::crd::{microservice::Microservice, scheduled_autoscaler::ScheduledAutoscaler};
use microservice_controller::scheduler::{CronScheduler, Entry};
use microservice_controller::store::MemoryStore;
use microservice_controller::views::{self, AppState};

mod helpers;

async fn app_state() -> (Arc<MemoryStore>, Arc<CronScheduler>, web::Data<AppState<MemoryStore>>) {
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(CronScheduler::new());
    let _: Microservice = helpers::apply_example(&store, "example-microservice.yaml").await;
    let _: ScheduledAutoscaler = helpers::apply_example(&store, "example-scheduled-autoscaler.yaml").await;
    let state = web::Data::new(AppState::new(store.clone(), scheduler.clone(), None));
    (store, scheduler, state)
}

#[actix_rt::test]
async fn test_view_health() {
    let req = test::TestRequest::default().to_http_request();
    let resp = views::health(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_view_microservices() {
    let (_, _, state) = app_state().await;
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(web::resource("/microservices").to(views::microservices::<MemoryStore>))
            .service(web::resource("/microservices/{name}").to(views::get_microservice::<MemoryStore>)),
    )
    .await;

    let req = test::TestRequest::get().uri("/microservices").to_request();
    let microservices: Vec<Microservice> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(microservices.len(), 1);

    let req = test::TestRequest::get().uri("/microservices/orders").to_request();
    let microservice: Microservice = test::call_and_read_body_json(&app, req).await;
    assert_eq!(microservice.spec.image, "registry.example.com/orders:1.4.2");

    let req = test::TestRequest::get().uri("/microservices/unknown").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_view_scheduled_autoscalers() {
    let (_, _, state) = app_state().await;
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(web::resource("/scheduledautoscalers").to(views::scheduled_autoscalers::<MemoryStore>)),
    )
    .await;

    let req = test::TestRequest::get().uri("/scheduledautoscalers").to_request();
    let scheduled_autoscalers: Vec<ScheduledAutoscaler> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(scheduled_autoscalers.len(), 1);
    assert_eq!(scheduled_autoscalers[0].spec.microservice_name, "orders");
}

#[actix_rt::test]
async fn test_view_schedules() {
    let (_, scheduler, state) = app_state().await;
    let id = scheduler
        .register("default/orders-business-hours", "@daily", || async {})
        .unwrap();
    let app = test::init_service(
        App::new()
            .app_data(state)
            .service(web::resource("/schedules").to(views::schedules::<MemoryStore>)),
    )
    .await;

    let req = test::TestRequest::get().uri("/schedules").to_request();
    let entries: Vec<Entry> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(entries[0].owner, "default/orders-business-hours");
}
