use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_hospital;

use crate::models::{
    AppointmentFilter, AppointmentResponse, CancelAppointmentRequest, CreateAppointmentBody,
    ListAppointmentsQuery, PostponeAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::booking::BookingService;

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(booking): State<Arc<BookingService>>,
    Extension(user): Extension<User>,
    Json(body): Json<CreateAppointmentBody>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    let hospital_id = require_hospital(&user)?;

    let response = booking.create(hospital_id, body.appointment, &body.preferences).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let appointment = booking.get(hospital_id, appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(booking): State<Arc<BookingService>>,
    Query(query): Query<ListAppointmentsQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let hospital_id = require_hospital(&user)?;
    let filter = AppointmentFilter::from(query);

    let appointments = booking.list(hospital_id, &filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let response = booking.update(hospital_id, appointment_id, request).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn postpone_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<PostponeAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let response = booking.postpone(hospital_id, appointment_id, request).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(booking): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let hospital_id = require_hospital(&user)?;

    let response = booking.cancel(hospital_id, appointment_id, request).await?;

    Ok(Json(response))
}
