use assert_matches::assert_matches;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::test_utils::{slot_time, TestConfig};
use appointment_cell::{
    Appointment, AppointmentStatus, AppointmentStore, InMemoryAppointmentStore, StoreError,
    SupabaseAppointmentStore,
};
use shared_database::SupabaseClient;

fn supabase_store(mock_server: &MockServer) -> SupabaseAppointmentStore {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    SupabaseAppointmentStore::with_client(SupabaseClient::new(&config))
}

fn appointment() -> Appointment {
    Appointment::scheduled(Uuid::new_v4(), Uuid::new_v4(), slot_time(9), "first visit".to_string())
}

// ==============================================================================
// SUPABASE
// ==============================================================================

#[tokio::test]
async fn test_create_inserts_and_returns_row() {
    let mock_server = MockServer::start().await;
    let record = appointment();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "id": record.id,
            "status": "scheduled",
            "notes": "first visit"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([record])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let created = assert_ok!(store.create(&record).await);

    assert_eq!(created, record);
}

#[tokio::test]
async fn test_get_by_id_filters_soft_deleted_rows() {
    let mock_server = MockServer::start().await;
    let record = appointment();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", record.id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let loaded = assert_ok!(store.get_by_id(record.id).await);

    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_empty_result_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let err = assert_err!(store.get_by_id(Uuid::new_v4()).await);

    assert_matches!(err, StoreError::NotFound);
}

#[tokio::test]
async fn test_update_patches_mutable_fields() {
    let mock_server = MockServer::start().await;
    let mut record = appointment();
    record.status = AppointmentStatus::Completed;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", record.id)))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let updated = assert_ok!(store.update(&record).await);

    assert_eq!(updated.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn test_update_never_patches_identity_fields() {
    let mock_server = MockServer::start().await;
    let record = appointment();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut moved = record.clone();
    moved.doctor_id = Uuid::new_v4();
    moved.user_id = Uuid::new_v4();
    moved.date = slot_time(17);
    let store = supabase_store(&mock_server);
    assert_ok!(store.update(&moved).await);

    let requests = mock_server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let fields = body.as_object().unwrap();
    assert!(fields.contains_key("status"));
    assert!(fields.contains_key("notes"));
    for identity in ["id", "user_id", "doctor_id", "date", "created_at"] {
        assert!(!fields.contains_key(identity), "{} must not be patched", identity);
    }
}

#[tokio::test]
async fn test_delete_is_a_soft_delete() {
    let mock_server = MockServer::start().await;
    let mut record = appointment();
    record.deleted_at = Some(record.updated_at);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", record.id)))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    assert_ok!(store.delete(record.id).await);
}

#[tokio::test]
async fn test_delete_of_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let err = assert_err!(store.delete(Uuid::new_v4()).await);

    assert_matches!(err, StoreError::NotFound);
}

#[tokio::test]
async fn test_lists_are_ordered_by_date() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .and(query_param("order", "date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    assert!(assert_ok!(store.list_by_user(user_id).await).is_empty());
}

#[tokio::test]
async fn test_server_error_is_database_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("connection pool exhausted"))
        .mount(&mock_server)
        .await;

    let store = supabase_store(&mock_server);
    let err = assert_err!(store.list_by_doctor(Uuid::new_v4()).await);

    assert_matches!(err, StoreError::Database(ref msg) if msg.contains("connection pool exhausted"));
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[tokio::test]
async fn test_in_memory_soft_delete_hides_record() {
    let store = InMemoryAppointmentStore::new();
    let record = assert_ok!(store.create(&appointment()).await);

    assert_ok!(store.delete(record.id).await);

    assert_matches!(store.get_by_id(record.id).await, Err(StoreError::NotFound));
    assert_matches!(store.delete(record.id).await, Err(StoreError::NotFound));
    assert!(assert_ok!(store.list_by_user(record.user_id).await).is_empty());
    assert_eq!(store.live_count().await, 0);
}

#[tokio::test]
async fn test_in_memory_update_keeps_created_at() {
    let store = InMemoryAppointmentStore::new();
    let record = assert_ok!(store.create(&appointment()).await);

    let mut changed = record.clone();
    changed.status = AppointmentStatus::Canceled;
    changed.created_at = slot_time(1);
    let updated = assert_ok!(store.update(&changed).await);

    assert_eq!(updated.status, AppointmentStatus::Canceled);
    assert_eq!(updated.created_at, record.created_at);
    assert!(updated.updated_at >= record.updated_at);
}

#[tokio::test]
async fn test_in_memory_update_ignores_identity_fields() {
    let store = InMemoryAppointmentStore::new();
    let record = assert_ok!(store.create(&appointment()).await);

    let mut moved = record.clone();
    moved.doctor_id = Uuid::new_v4();
    moved.date = slot_time(17);
    moved.notes = "bring previous scans".to_string();
    let updated = assert_ok!(store.update(&moved).await);

    assert_eq!(updated.doctor_id, record.doctor_id);
    assert_eq!(updated.date, record.date);
    assert_eq!(updated.notes, "bring previous scans");
    assert!(assert_ok!(store.list_by_doctor(moved.doctor_id).await).is_empty());
}

#[tokio::test]
async fn test_in_memory_rejects_duplicate_id() {
    let store = InMemoryAppointmentStore::new();
    let record = appointment();
    assert_ok!(store.create(&record).await);

    assert_matches!(store.create(&record).await, Err(StoreError::Database(_)));
}
