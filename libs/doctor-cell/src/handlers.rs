use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::models::SlotQuery;
use crate::services::availability::AvailabilityService;

#[axum::debug_handler]
pub async fn get_slots(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let slots = service.get_slots(hospital_id, doctor_id, query.date).await?;
    let available = slots.iter().filter(|slot| slot.available).count();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
        "available_count": available,
    })))
}

#[axum::debug_handler]
pub async fn check_leave(
    State(service): State<Arc<AvailabilityService>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let leave = service.check_leave(hospital_id, doctor_id, query.date).await?;

    Ok(Json(json!(leave)))
}
