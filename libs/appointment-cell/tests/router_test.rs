mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

use common::{wednesday, Clinic};

fn app(clinic: &Clinic, config: &TestConfig) -> Router {
    Router::new().nest("/appointments", appointment_routes(config.to_arc(), clinic.booking.clone()))
}

fn token_for(hospital_id: Option<Uuid>, config: &TestConfig) -> String {
    let user = match hospital_id {
        Some(hospital_id) => TestUser::receptionist("desk@example.com", hospital_id),
        None => TestUser::unscoped("desk@example.com"),
    };
    JwtTestUtils::create_test_token(&user, &config.jwt_secret, None)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_body(clinic: &Clinic, time: &str) -> Value {
    json!({
        "patient_id": clinic.patient.id,
        "doctor_id": clinic.doctor.id,
        "appointment_date": wednesday(),
        "appointment_time": time,
        "appointment_type": "consultation",
        "preferences": { "smart_defaults": false }
    })
}

#[tokio::test]
async fn create_then_conflict_over_http() {
    let clinic = Clinic::new().await;
    let config = TestConfig::default();
    let token = token_for(Some(clinic.hospital_id), &config);

    let created = app(&clinic, &config)
        .oneshot(json_request(Method::POST, "/appointments", Some(&token), booking_body(&clinic, "09:30")))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json(created).await;
    assert_eq!(body["appointment"]["status"], "scheduled");
    assert_eq!(body["appointment"]["appointment_time"], "09:30");

    let conflict = app(&clinic, &config)
        .oneshot(json_request(Method::POST, "/appointments", Some(&token), booking_body(&clinic, "09:30")))
        .await
        .unwrap();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(conflict).await["code"], "conflict");
}

#[tokio::test]
async fn illegal_transition_is_unprocessable() {
    let clinic = Clinic::new().await;
    let config = TestConfig::default();
    let token = token_for(Some(clinic.hospital_id), &config);
    let booked = clinic.book(wednesday(), common::t(10, 0)).await;

    let response = app(&clinic, &config)
        .oneshot(json_request(
            Method::PATCH,
            &format!("/appointments/{}", booked.id),
            Some(&token),
            json!({ "status": "completed" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn callers_need_a_token_and_a_hospital() {
    let clinic = Clinic::new().await;
    let config = TestConfig::default();

    let anonymous = app(&clinic, &config)
        .oneshot(json_request(Method::POST, "/appointments", None, booking_body(&clinic, "09:00")))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let unscoped = token_for(None, &config);
    let forbidden = app(&clinic, &config)
        .oneshot(json_request(Method::POST, "/appointments", Some(&unscoped), booking_body(&clinic, "09:00")))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn other_hospitals_see_not_found() {
    let clinic = Clinic::new().await;
    let config = TestConfig::default();
    let booked = clinic.book(wednesday(), common::t(9, 0)).await;
    let outsider = token_for(Some(Uuid::new_v4()), &config);

    let response = app(&clinic, &config)
        .oneshot(
            Request::builder()
                .uri(format!("/appointments/{}", booked.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", outsider))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "not_found");
}
