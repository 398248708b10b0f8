use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::models::{ConsumeVisitRequest, PackageAssignment};
use crate::services::ledger::PackageLedger;

#[axum::debug_handler]
pub async fn get_package(
    State(ledger): State<Arc<PackageLedger>>,
    Path(assignment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let assignment = ledger.get(hospital_id, assignment_id).await?;

    Ok(Json(render(&assignment)))
}

#[axum::debug_handler]
pub async fn consume_visit(
    State(ledger): State<Arc<PackageLedger>>,
    Path(assignment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<ConsumeVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let assignment = ledger.consume(hospital_id, assignment_id, request).await?;

    Ok(Json(render(&assignment)))
}

#[axum::debug_handler]
pub async fn refund_visit(
    State(ledger): State<Arc<PackageLedger>>,
    Path(assignment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let assignment = ledger.refund(hospital_id, assignment_id).await?;

    Ok(Json(render(&assignment)))
}

fn render(assignment: &PackageAssignment) -> Value {
    json!({
        "assignment": assignment,
        "remaining_visits": assignment.remaining_visits(),
    })
}
