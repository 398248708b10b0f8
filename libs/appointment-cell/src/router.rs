use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::booking::BookingService;

pub fn appointment_routes(config: Arc<AppConfig>, booking: Arc<BookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment).patch(handlers::update_appointment))
        .route("/{appointment_id}/postpone", post(handlers::postpone_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(booking)
}
