mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use booking_queue_cell::queue_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

use common::{jan, t, Desk};

fn app(desk: &Desk, config: &TestConfig) -> Router {
    Router::new().nest("/queue", queue_routes(config.to_arc(), desk.queue.clone()))
}

fn authorized(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn queue_and_check_in_over_http() {
    let desk = Desk::open().await;
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(
        &TestUser::receptionist("desk@example.com", desk.hospital_id),
        &config.jwt_secret,
        None,
    );
    desk.book(0, jan(10), t(9, 0)).await;
    let second = desk.book(0, jan(10), t(9, 30)).await;

    let listed = app(&desk, &config)
        .oneshot(authorized(
            Method::GET,
            &format!("/queue?date=2024-01-10&doctor_id={}", desk.doctor_id(0)),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    let snapshot = read_json(listed).await;
    assert_eq!(snapshot["total"], 2);
    assert_eq!(snapshot["items"][1]["queue_token"], 2);
    assert_eq!(snapshot["items"][1]["appointment_time"], "09:30");

    let checked_in = app(&desk, &config)
        .oneshot(authorized(Method::POST, &format!("/queue/{}/check-in", second.id), &token))
        .await
        .unwrap();
    assert_eq!(checked_in.status(), StatusCode::OK);
    let body = read_json(checked_in).await;
    assert_eq!(body["queue_position"], 2);
    assert_eq!(body["appointment"]["status"], "confirmed");
}

#[tokio::test]
async fn completing_a_scheduled_visit_is_rejected() {
    let desk = Desk::open().await;
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(
        &TestUser::receptionist("desk@example.com", desk.hospital_id),
        &config.jwt_secret,
        None,
    );
    let booked = desk.book(0, jan(10), t(9, 0)).await;

    let response = app(&desk, &config)
        .oneshot(authorized(Method::POST, &format!("/queue/{}/complete", booked.id), &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn queue_requires_a_token() {
    let desk = Desk::open().await;
    let config = TestConfig::default();

    let response = app(&desk, &config)
        .oneshot(Request::builder().uri("/queue?date=2024-01-10").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
