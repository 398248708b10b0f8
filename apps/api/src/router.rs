use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use booking_queue_cell::router::queue_routes;
use doctor_cell::router::doctor_routes;
use package_cell::router::package_routes;
use shared_config::AppConfig;

use crate::state::AppServices;

pub fn create_router(config: Arc<AppConfig>, services: AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital queue API is running!" }))
        .nest("/doctors", doctor_routes(config.clone(), services.availability))
        .nest("/appointments", appointment_routes(config.clone(), services.booking))
        .nest("/queue", queue_routes(config.clone(), services.queue))
        .nest("/packages", package_routes(config, services.ledger))
}
