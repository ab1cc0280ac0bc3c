use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    guard,
    middleware::{Condition, Logger},
    web, App, Error,
};
use actix_web_lab::middleware::from_fn;
use database::collection::Collection;
use tokio::sync::watch;

use crate::{
    consts::consts::{DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT},
    handlers::handlers::{
        create_person, delete_person, get_people, get_people_by_name, get_person, update_person,
        EndpointHandler,
    },
    middleware::{
        metrics::{observe_requests, render_metrics, RequestMetrics},
        validate::{validate_person, validate_person_update},
    },
};

/// Everything the app needs, cloned into every HTTP worker
#[derive(Clone)]
pub struct ApiState {
    collection: Arc<dyn Collection>,
    read_timeout: Duration,
    write_timeout: Duration,
    shutdown: Option<watch::Receiver<bool>>,
    metrics: web::Data<RequestMetrics>,
    log_http: bool,
}

impl ApiState {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self {
            collection,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            shutdown: None,
            metrics: web::Data::new(RequestMetrics::default()),
            log_http: false,
        }
    }

    pub fn set_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn set_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn set_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn set_metrics(mut self, metrics: RequestMetrics) -> Self {
        self.metrics = web::Data::new(metrics);
        self
    }

    pub fn set_log_http(mut self, log_http: bool) -> Self {
        self.log_http = log_http;
        self
    }

    fn endpoint_handler(&self, timeout: Duration) -> web::Data<EndpointHandler> {
        web::Data::new(
            EndpointHandler::new(self.collection.clone())
                .set_timeout(timeout)
                .set_shutdown(self.shutdown.clone()),
        )
    }
}

/// Route table
///
/// `/person/{id}` is split into one resource per method, reads and writes run with different
/// timeouts and only `PUT` goes through the validation middleware.
pub fn build_app(
    state: ApiState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let read = state.endpoint_handler(state.read_timeout);
    let write = state.endpoint_handler(state.write_timeout);
    let metrics_endpoint = state.metrics.endpoint().to_string();

    App::new()
        .app_data(state.metrics.clone())
        .service(
            web::resource("/person")
                .app_data(write.clone())
                .wrap(from_fn(validate_person))
                .route(web::post().to(create_person)),
        )
        .service(
            web::resource("/person/{id}")
                .guard(guard::Get())
                .app_data(read.clone())
                .route(web::get().to(get_person)),
        )
        .service(
            web::resource("/person/{id}")
                .guard(guard::Put())
                .app_data(write.clone())
                .wrap(from_fn(validate_person_update))
                .route(web::put().to(update_person)),
        )
        .service(
            web::resource("/person/{id}")
                .guard(guard::Delete())
                .app_data(write)
                .route(web::delete().to(delete_person)),
        )
        .service(
            web::resource("/personName/{name}")
                .app_data(read.clone())
                .route(web::get().to(get_people_by_name)),
        )
        .service(
            web::resource("/people")
                .app_data(read)
                .route(web::get().to(get_people)),
        )
        .service(web::resource(metrics_endpoint).route(web::get().to(render_metrics)))
        .wrap(from_fn(observe_requests))
        .wrap(Cors::permissive())
        .wrap(Condition::new(state.log_http, Logger::default()))
}
