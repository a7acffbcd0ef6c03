#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use autouni_api::rest::models::{DeviceQuery, EnergyLevel, EnergyPeriod, EnergyQuery};
use autouni_api::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use autouni_api::{ApiClient, Error, MemorySessionStore, SessionEvent, SessionStore, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient, Arc<MemorySessionStore>) {
    let server = MockServer::start().await;
    let store = Arc::new(MemorySessionStore::new());
    let client = ApiClient::with_client(
        &server.uri(),
        reqwest::Client::new(),
        30,
        Arc::clone(&store) as Arc<dyn SessionStore>,
    )
    .unwrap();
    (server, client, store)
}

fn seed_tokens(store: &MemorySessionStore, access: &str, refresh: &str) {
    store.set(ACCESS_TOKEN_KEY, access).unwrap();
    store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
    store
        .set(USER_KEY, r#"{"id":"u1","email":"ops@campus.edu","name":"Ops","role":"ADMIN"}"#)
        .unwrap();
}

fn device_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "roomId": "room-101",
        "name": format!("Light {id}"),
        "type": "LIGHT",
        "status": status,
        "lastSeen": "2026-03-01T10:00:00Z",
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-03-01T10:00:00Z"
    })
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_persists_session() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "ops@campus.edu", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": "u1", "email": "ops@campus.edu", "name": "Ops", "role": "ADMIN" },
            "accessToken": "acc-1",
            "refreshToken": "ref-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let password: SecretString = "hunter2".to_string().into();
    let login = client.login("ops@campus.edu", &password).await.unwrap();

    assert_eq!(login.user.name, "Ops");
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("acc-1"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-1"));
    assert!(store.get(USER_KEY).unwrap().contains("ops@campus.edu"));
    assert_eq!(*client.session_events().borrow(), SessionEvent::Authenticated);
}

#[tokio::test]
async fn test_login_rejected_does_not_refresh() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let password: SecretString = "nope".to_string().into();
    let result = client.login("ops@campus.edu", &password).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(store.get(ACCESS_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn test_bearer_header_is_sent() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("GET"))
        .and(path("/devices/stats"))
        .and(header("Authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activeDevices": 12,
            "totalDevices": 40
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = client.device_stats().await.unwrap();
    assert_eq!(stats.active_devices, 12);
    assert_eq!(stats.total_devices, 40);
}

#[tokio::test]
async fn test_401_refreshes_once_and_retries() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "stale", "ref-1");

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "ref-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([device_json("d1", "ON")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices(&DeviceQuery::default()).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].status, "ON");
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
    // refresh token not rotated by the server, old one kept
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-1"));
}

#[tokio::test]
async fn test_second_401_is_not_refreshed_again() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "stale", "ref-1");

    Mock::given(method("GET"))
        .and(path("/buildings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "fresh",
            "refreshToken": "ref-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.list_buildings().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    // Session survives: the refresh itself worked.
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-2"));
    assert_eq!(*client.session_events().borrow(), SessionEvent::Authenticated);
}

#[tokio::test]
async fn test_failed_refresh_clears_session() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "stale", "revoked");
    let events = client.session_events();

    Mock::given(method("GET"))
        .and(path("/devices/d1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Refresh token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = client.get_device("d1").await;

    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
    assert!(store.get(ACCESS_TOKEN_KEY).is_none());
    assert!(store.get(REFRESH_TOKEN_KEY).is_none());
    assert!(store.get(USER_KEY).is_none());
    assert_eq!(*events.borrow(), SessionEvent::Expired);
}

#[tokio::test]
async fn test_401_without_refresh_token_expires_session() {
    let (server, client, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.me().await;
    assert!(matches!(result, Err(Error::SessionExpired)));
    assert_eq!(*client.session_events().borrow(), SessionEvent::Expired);
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();

    assert!(store.get(ACCESS_TOKEN_KEY).is_none());
    assert_eq!(*client.session_events().borrow(), SessionEvent::Anonymous);
}

#[tokio::test]
async fn test_restore_session_reads_store() {
    let (_server, client, store) = setup().await;
    assert!(client.restore_session().is_none());

    seed_tokens(&store, "acc-1", "ref-1");
    let session = client.restore_session().unwrap();
    assert_eq!(session.user.unwrap().email, "ops@campus.edu");
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_with_filters() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("status", "ON"))
        .and(query_param("roomId", "room-101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            device_json("d1", "ON"),
            device_json("d2", "ON"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = DeviceQuery {
        status: Some("ON".into()),
        room_id: Some("room-101".into()),
        ..DeviceQuery::default()
    };
    let devices = client.list_devices(&query).await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].id, "d2");
}

#[tokio::test]
async fn test_control_device_sends_command_and_value() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("POST"))
        .and(path("/devices/d1/control"))
        .and(body_json(json!({ "command": "set_intensity", "value": 40 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "ON",
            "message": "intensity set"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = json!(40);
    let ack = client
        .control_device("d1", "set_intensity", Some(&value))
        .await
        .unwrap();
    assert_eq!(ack.status, "ON");
    assert_eq!(ack.message.as_deref(), Some("intensity set"));
}

#[tokio::test]
async fn test_control_device_error_carries_status() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("POST"))
        .and(path("/devices/missing/control"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Device not found" })),
        )
        .mount(&server)
        .await;

    let err = client.control_device("missing", "on", None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "API error (HTTP 404): Device not found");
}

#[tokio::test]
async fn test_bulk_control_parses_partial_failure() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("POST"))
        .and(path("/devices/bulk-control"))
        .and(body_json(json!({ "deviceIds": ["d1", "d2", "d3"], "command": "off" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "affectedDevices": 2,
            "failedDevices": ["d3"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids = vec!["d1".to_owned(), "d2".to_owned(), "d3".to_owned()];
    let resp = client.bulk_control(&ids, "off").await.unwrap();
    assert!(!resp.success);
    assert_eq!(resp.affected_devices, 2);
    assert_eq!(resp.failed_devices, vec!["d3".to_owned()]);
    assert!(resp.results.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("GET"))
        .and(path("/devices/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client.device_stats().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>gateway</html>"),
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_with_multibyte_text_is_deserialization_error() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    // 'ç' straddles the 200-byte preview cut
    let body = format!("{}ção não encontrado", "x".repeat(199));
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let err = client.list_devices(&DeviceQuery::default()).await.unwrap_err();
    match err {
        Error::Deserialization { body: raw, message } => {
            assert_eq!(raw, body);
            assert!(message.contains("body preview"));
        }
        other => panic!("expected Deserialization, got: {other:?}"),
    }
}

// ── Energy ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_energy_stats_query_params() {
    let (server, client, store) = setup().await;
    seed_tokens(&store, "acc-1", "ref-1");

    Mock::given(method("GET"))
        .and(path("/energy/stats"))
        .and(query_param("period", "week"))
        .and(query_param("level", "building"))
        .and(query_param("id", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalEnergy": 1520.5,
            "peakDemand": 48000.0,
            "trend": -3.2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = EnergyQuery {
        period: EnergyPeriod::Week,
        level: EnergyLevel::Building,
        id: Some("b1".into()),
        ..EnergyQuery::default()
    };
    let stats = client.energy_stats(&query).await.unwrap();
    assert!((stats.total_energy - 1520.5).abs() < f64::EPSILON);
    assert_eq!(stats.trend, Some(-3.2));
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = ApiClient::new(&server.uri(), &transport, store).unwrap();

    Mock::given(method("GET"))
        .and(path("/buildings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = client.list_buildings().await;
    assert!(
        matches!(result, Err(Error::Timeout { .. })),
        "expected Timeout, got: {result:?}"
    );
}
