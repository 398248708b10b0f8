use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::ledger::PackageLedger;

pub fn package_routes(config: Arc<AppConfig>, ledger: Arc<PackageLedger>) -> Router {
    Router::new()
        .route("/{assignment_id}", get(handlers::get_package))
        .route("/{assignment_id}/consume", post(handlers::consume_visit))
        .route("/{assignment_id}/refund", post(handlers::refund_visit))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(ledger)
}
