use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::availability::AvailabilityService;

pub fn doctor_routes(config: Arc<AppConfig>, availability: Arc<AvailabilityService>) -> Router {
    Router::new()
        .route("/{doctor_id}/slots", get(handlers::get_slots))
        .route("/{doctor_id}/leave", get(handlers::check_leave))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(availability)
}
