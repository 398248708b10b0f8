use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use uuid::Uuid;

use appointment_cell::models::AppointmentResponse;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::models::{CheckInRequest, CheckInResponse, CompleteRequest, NoShowRequest, QueueQuery, QueueSnapshot};
use crate::services::queue::QueueService;

#[axum::debug_handler]
pub async fn get_queue(
    State(queue): State<Arc<QueueService>>,
    Query(query): Query<QueueQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<QueueSnapshot>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let snapshot = queue.get_queue(hospital_id, query.date, query.doctor_id).await?;

    Ok(Json(snapshot))
}

#[axum::debug_handler]
pub async fn check_in(
    State(queue): State<Arc<QueueService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    request: Option<Json<CheckInRequest>>,
) -> Result<Json<CheckInResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;
    let request = request.map(|Json(body)| body).unwrap_or_default();

    let response = queue.check_in(hospital_id, appointment_id, request).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn start_consultation(
    State(queue): State<Arc<QueueService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;

    Ok(Json(queue.start(hospital_id, appointment_id).await?))
}

#[axum::debug_handler]
pub async fn complete_consultation(
    State(queue): State<Arc<QueueService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    request: Option<Json<CompleteRequest>>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;
    let request = request.map(|Json(body)| body).unwrap_or_default();

    Ok(Json(queue.complete(hospital_id, appointment_id, request.diagnosis).await?))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(queue): State<Arc<QueueService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    request: Option<Json<NoShowRequest>>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;
    let request = request.map(|Json(body)| body).unwrap_or_default();

    Ok(Json(queue.mark_no_show(hospital_id, appointment_id, request.reason).await?))
}
