use assert_matches::assert_matches;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::test_utils::slot_time;
use appointment_cell::{HttpSlotAvailabilityClient, RemoteError, SlotAvailabilityClient, SlotRef};

fn slot() -> SlotRef {
    SlotRef::new(Uuid::new_v4(), slot_time(9))
}

#[tokio::test]
async fn test_check_availability_posts_slot_and_reads_flag() {
    let mock_server = MockServer::start().await;
    let slot = slot();

    Mock::given(method("POST"))
        .and(path("/schedule/slots/availability"))
        .and(body_partial_json(json!({
            "doctor_id": slot.doctor_id,
            "slot_time": slot.slot_time,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_available": false,
            "reason": "doctor on leave"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&mock_server.uri());
    let availability = assert_ok!(client.check_availability(slot).await);

    assert!(!availability.available);
    assert_eq!(availability.reason, "doctor on leave");
}

#[tokio::test]
async fn test_check_availability_tolerates_missing_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/slots/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_available": true })))
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&format!("{}/", mock_server.uri()));
    let availability = assert_ok!(client.check_availability(slot()).await);

    assert!(availability.available);
    assert!(availability.reason.is_empty());
}

#[tokio::test]
async fn test_set_availability_sends_target_state() {
    let mock_server = MockServer::start().await;
    let slot = slot();

    Mock::given(method("POST"))
        .and(path("/schedule/slots/change"))
        .and(body_partial_json(json!({
            "doctor_id": slot.doctor_id,
            "is_available": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&mock_server.uri());
    assert!(assert_ok!(client.set_availability(slot, false).await));
}

#[tokio::test]
async fn test_set_availability_reports_refusal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/slots/change"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&mock_server.uri());
    assert!(!assert_ok!(client.set_availability(slot(), true).await));
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/slots/change"))
        .respond_with(ResponseTemplate::new(503).set_body_string("schedule database offline"))
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&mock_server.uri());
    let err = assert_err!(client.set_availability(slot(), true).await);

    assert_matches!(
        err,
        RemoteError::Status { status: 503, ref body } if body == "schedule database offline"
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/slots/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": "maybe" })))
        .mount(&mock_server)
        .await;

    let client = HttpSlotAvailabilityClient::with_base_url(&mock_server.uri());
    let err = assert_err!(client.check_availability(slot()).await);

    assert_matches!(err, RemoteError::InvalidResponse(_));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let client = HttpSlotAvailabilityClient::with_base_url("http://127.0.0.1:1");
    let err = assert_err!(client.check_availability(slot()).await);

    assert_matches!(err, RemoteError::Transport(_));
}
