//! HttpRemoteStatusSource against a wiremock gateway: request shape,
//! decoding, and the status-code to PortError mapping.

use std::time::Duration;

use legalstat_adapters::{HttpRemoteConfig, HttpRemoteStatusSource, RetryPolicy};
use legalstat_core::{PatentId, PortError, RemoteStatusSource, Timestamp};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> HttpRemoteStatusSource {
    let mut config = HttpRemoteConfig::new(server.uri()).with_token("test-token");
    config.timeout = Duration::from_secs(5);
    config.retry = RetryPolicy::none();
    HttpRemoteStatusSource::new(config).expect("source builds")
}

fn patent(id: &str) -> PatentId {
    PatentId::new(id).expect("valid patent id")
}

#[tokio::test]
async fn fetch_decodes_office_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patents/US11234567B2/legal-status"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "PATENTED CASE",
            "jurisdiction": "us",
            "effective_date": "2024-08-13T00:00:00Z",
            "next_action": "3.5 year maintenance fee",
            "next_deadline": "2028-02-13T00:00:00+00:00",
            "source": "USPTO"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = source(&server)
        .fetch_remote_status(&patent("US11234567B2"))
        .await
        .expect("fetch succeeds");

    assert_eq!(record.status, "PATENTED CASE");
    assert_eq!(record.jurisdiction.as_str(), "US");
    assert_eq!(record.source, "USPTO");
    assert_eq!(
        record.effective_date,
        Timestamp::parse("2024-08-13T00:00:00Z").unwrap()
    );
    assert_eq!(record.raw_payload["source"], "USPTO");
}

#[tokio::test]
async fn not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patents/CN404/legal-status"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown application"))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_remote_status(&patent("CN404"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn server_error_maps_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patents/EP1/legal-status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("register maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_remote_status(&patent("EP1"))
        .await
        .unwrap_err();
    match err {
        PortError::Unavailable(msg) => assert!(msg.contains("register maintenance")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn client_error_maps_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patents/JP1/legal-status"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_remote_status(&patent("JP1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Rejected(_)), "got {err:?}");
}

#[tokio::test]
async fn malformed_body_maps_to_serialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patents/KR1/legal-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "등록"})))
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_remote_status(&patent("KR1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Serialization(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_gateway_is_unavailable() {
    let mut config = HttpRemoteConfig::new("http://127.0.0.1:1");
    config.timeout = Duration::from_millis(200);
    config.retry = RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    };
    let source = HttpRemoteStatusSource::new(config).expect("source builds");

    let err = source.fetch_remote_status(&patent("US1")).await.unwrap_err();
    assert!(matches!(err, PortError::Unavailable(_)), "got {err:?}");
}
