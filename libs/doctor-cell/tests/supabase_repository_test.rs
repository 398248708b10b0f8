use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::services::{DoctorRepository, SupabaseDoctorRepository};
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

async fn repository(server: &MockServer) -> SupabaseDoctorRepository {
    let config = TestConfig::default().with_supabase_url(server.uri()).to_app_config();
    SupabaseDoctorRepository::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn doctor_row_is_decoded_with_its_calendar() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let hospital_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": doctor_id,
            "hospital_id": hospital_id,
            "first_name": "Ravi",
            "last_name": "Kumar",
            "specialization": "Cardiology",
            "is_active": true,
            "consultation_fee": 800.0,
            "available_days": ["Mon", "Wed", "Fri"],
            "available_from": "09:00:00",
            "available_to": "13:00:00",
            "slot_duration_minutes": 20
        }])))
        .mount(&server)
        .await;

    let doctor = repository(&server).await.get_doctor(doctor_id).await.unwrap().unwrap();

    assert_eq!(doctor.hospital_id, hospital_id);
    assert_eq!(doctor.availability.available_days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    assert_eq!(doctor.availability.available_to, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
    assert_eq!(doctor.availability.slot_minutes(30), 20);
}

#[tokio::test]
async fn missing_doctor_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(repository(&server).await.get_doctor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn booked_slots_query_excludes_cancelled_rows() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let hospital_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("appointment_date", "eq.2024-01-10"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": appointment_id, "appointment_time": "09:30:00" }
        ])))
        .mount(&server)
        .await;

    let booked = repository(&server).await
        .booked_slots(hospital_id, doctor_id, date)
        .await
        .unwrap();

    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].appointment_id, appointment_id);
    assert_eq!(booked[0].time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
}
