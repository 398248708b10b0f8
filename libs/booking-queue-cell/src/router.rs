use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::queue::QueueService;

pub fn queue_routes(config: Arc<AppConfig>, queue: Arc<QueueService>) -> Router {
    Router::new()
        .route("/", get(handlers::get_queue))
        .route("/{appointment_id}/check-in", post(handlers::check_in))
        .route("/{appointment_id}/start", post(handlers::start_consultation))
        .route("/{appointment_id}/complete", post(handlers::complete_consultation))
        .route("/{appointment_id}/no-show", post(handlers::mark_no_show))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(queue)
}
