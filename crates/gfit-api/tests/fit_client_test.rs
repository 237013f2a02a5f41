#![allow(clippy::unwrap_used)]
// Integration tests for `FitClient` and `AuthManager` using wiremock.

use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gfit_api::auth::ClientSecret;
use gfit_api::{AuthManager, ConsentFlow, Credentials, Error, FitClient, LocalRedirectFlow, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const STREAM_ID: &str =
    "derived:com.google.step_count.delta:1099052750196:Pavlis:gFit stepper:1000001:MyDataSource";

async fn setup() -> (MockServer, TransportConfig) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default().with_base_url(&base).unwrap();
    (server, transport)
}

fn credentials() -> Credentials {
    Credentials {
        client_id: "test-client-id".into(),
        client_secret: SecretString::from("test-client-secret"),
        refresh_token: SecretString::from("test-refresh-token"),
    }
}

/// Mount a happy-path token endpoint.
async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-access-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

/// Mount a data-source registration endpoint that reports creation.
async fn mount_data_source_created(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataSources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataStreamId": STREAM_ID
        })))
        .mount(server)
        .await;
}

fn day_window() -> (chrono::NaiveDateTime, chrono::NaiveDateTime) {
    let start = NaiveDate::from_ymd_opt(2022, 8, 1)
        .unwrap()
        .and_hms_opt(5, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(2022, 8, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    (start, end)
}

// ── Token refresh tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_token_refresh_success() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;

    let http = transport.build_client().unwrap();
    let auth = AuthManager::new(credentials(), http, transport.token_url.clone());

    let token = auth.access_token().await.unwrap();
    assert_eq!(token, "ya29.test-access-token");
}

#[tokio::test]
async fn test_token_refresh_sends_grant_fields() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test-refresh-token"))
        .and(body_string_contains("client_id=test-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-access-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = transport.build_client().unwrap();
    let auth = AuthManager::new(credentials(), http, transport.token_url.clone());
    auth.access_token().await.unwrap();
}

#[tokio::test]
async fn test_token_refresh_is_cached() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.cached",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = transport.build_client().unwrap();
    let auth = AuthManager::new(credentials(), http, transport.token_url.clone());

    let first = auth.access_token().await.unwrap();
    let second = auth.access_token().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_token_refresh_failure_surfaces_body() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
        )
        .mount(&server)
        .await;

    let http = transport.build_client().unwrap();
    let auth = AuthManager::new(credentials(), http, transport.token_url.clone());

    match auth.access_token().await {
        Err(Error::TokenRefresh { status, ref body }) => {
            assert_eq!(status, 400);
            assert!(
                body.contains("invalid_grant"),
                "expected raw body, got: {body}"
            );
        }
        other => panic!("expected TokenRefresh error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_access_token_rejected() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "definitely-not-a-google-token"
        })))
        .mount(&server)
        .await;

    let http = transport.build_client().unwrap();
    let auth = AuthManager::new(credentials(), http, transport.token_url.clone());

    let result = auth.access_token().await;
    assert!(
        matches!(result, Err(Error::MalformedAccessToken { .. })),
        "expected MalformedAccessToken, got: {result:?}"
    );
}

// ── Data source tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_connect_creates_data_source() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    assert_eq!(client.data_source_id(), STREAM_ID);
}

#[tokio::test]
async fn test_conflict_resolves_existing_id() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataSources"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": 409,
                "status": "ALREADY_EXISTS",
                "message": "Data Source: XYZ already exists"
            }
        })))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    assert_eq!(client.data_source_id(), "XYZ");

    // Idempotent: resolving again yields the same id.
    let again = client.ensure_data_source().await.unwrap();
    assert_eq!(again, "XYZ");
}

#[tokio::test]
async fn test_conflict_with_unknown_wording_fails() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataSources"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": 409,
                "status": "ALREADY_EXISTS",
                "message": "Source XYZ is taken"
            }
        })))
        .mount(&server)
        .await;

    let result = FitClient::connect(credentials(), &transport).await;
    assert!(
        matches!(result, Err(Error::DataSource { .. })),
        "expected DataSource error, got error: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_unexpected_api_error_propagates() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataSources"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "status": "PERMISSION_DENIED",
                "message": "Request had insufficient authentication scopes."
            }
        })))
        .mount(&server)
        .await;

    match FitClient::connect(credentials(), &transport).await {
        Err(Error::Api {
            status,
            ref code,
            ref message,
        }) => {
            assert_eq!(status, 403);
            assert_eq!(code.as_deref(), Some("PERMISSION_DENIED"));
            assert!(message.contains("scopes"));
        }
        other => panic!("expected Api error, got: {:?}", other.err()),
    }
}

// ── Aggregate read tests ────────────────────────────────────────────

#[tokio::test]
async fn test_get_steps_decodes_buckets() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataset:aggregate"))
        .and(body_partial_json(json!({
            "bucketByTime": {"durationMillis": 86_400_000},
            "aggregateBy": [{
                "dataTypeName": "com.google.step_count.delta"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucket": [{
                "startTimeMillis": "1659322800000",
                "endTimeMillis": "1659326400000",
                "dataset": [{
                    "dataSourceId": "derived:com.google.step_count.delta:aggregated",
                    "point": [{
                        "startTimeNanos": "1659322800000000000",
                        "endTimeNanos": "1659326400000000000",
                        "dataTypeName": "com.google.step_count.delta",
                        "value": [{"intVal": 2000}]
                    }]
                }]
            }]
        })))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    let (start, end) = day_window();
    let result = client.get_steps(start, end).await.unwrap();

    assert_eq!(result.bucket.len(), 1);
    assert_eq!(result.total_steps(), 2000);
}

// ── Dataset write tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_set_steps_verifies_echo() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/\d+-\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataSourceId": STREAM_ID,
            "point": [{
                "dataTypeName": "com.google.step_count.delta",
                "value": [{"intVal": 1500}]
            }]
        })))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    let (start, end) = day_window();
    let echoed = client.set_steps(start, end, 1500).await.unwrap();
    assert_eq!(echoed.first_int_val(), Some(1500));
}

#[tokio::test]
async fn test_set_steps_echo_mismatch_fails() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/\d+-\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "point": [{"value": [{"intVal": 1400}]}]
        })))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    let (start, end) = day_window();

    match client.set_steps(start, end, 1500).await {
        Err(Error::WriteVerification { expected, got }) => {
            assert_eq!(expected, 1500);
            assert_eq!(got, Some(1400));
        }
        other => panic!("expected WriteVerification error, got: {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_set_steps_empty_echo_fails() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/\d+-\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    let (start, end) = day_window();

    let result = client.set_steps(start, end, 1500).await;
    assert!(
        matches!(result, Err(Error::WriteVerification { got: None, .. })),
        "expected WriteVerification with no echo, got: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_write_then_read_reflects_value() {
    let (server, transport) = setup().await;
    mount_token_endpoint(&server).await;
    mount_data_source_created(&server).await;

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/fitness/v1/users/me/dataSources/.+/datasets/\d+-\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "point": [{"value": [{"intVal": 2750}]}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/fitness/v1/users/me/dataset:aggregate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bucket": [{
                "dataset": [{"point": [{"value": [{"intVal": 2750}]}]}]
            }]
        })))
        .mount(&server)
        .await;

    let client = FitClient::connect(credentials(), &transport).await.unwrap();
    let (start, end) = day_window();

    client.set_steps(start, end, 2750).await.unwrap();
    let read_back = client.get_steps(start, end).await.unwrap();
    assert_eq!(read_back.total_steps(), 2750);
}

// ── Consent flow tests ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_local_redirect_flow_exchanges_code() {
    let (server, transport) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v4/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=test-auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "refresh_token": "1//refresh-me",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let secret = ClientSecret {
        client_id: "test-client-id".into(),
        client_secret: SecretString::from("test-client-secret"),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
    };

    let port = 38_291;
    let flow = LocalRedirectFlow::from_transport(&transport)
        .unwrap()
        .with_port(port);

    // Play the browser: hit the loopback listener with the redirect once
    // the flow is accepting connections.
    let browser = tokio::spawn(async move {
        let url = format!("http://127.0.0.1:{port}/?code=test-auth-code");
        for _ in 0..50 {
            if let Ok(resp) = reqwest::get(&url).await {
                return resp.text().await.unwrap();
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("consent listener never came up");
    });

    let pair = flow.authorize(&secret).await.unwrap();
    assert_eq!(pair.access_token, "ya29.fresh");
    assert_eq!(pair.refresh_token, "1//refresh-me");

    let page = browser.await.unwrap();
    assert!(page.contains("you may close this window"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_redirect_flow_rejects_denied_consent() {
    let (_server, transport) = setup().await;

    let secret = ClientSecret {
        client_id: "test-client-id".into(),
        client_secret: SecretString::from("test-client-secret"),
        auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
    };

    let port = 38_292;
    let flow = LocalRedirectFlow::from_transport(&transport)
        .unwrap()
        .with_port(port);

    let browser = tokio::spawn(async move {
        let url = format!("http://127.0.0.1:{port}/?error=access_denied");
        for _ in 0..50 {
            if reqwest::get(&url).await.is_ok() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("consent listener never came up");
    });

    let result = flow.authorize(&secret).await;
    match result {
        Err(Error::ConsentFlow(ref msg)) => assert!(msg.contains("access_denied")),
        other => panic!("expected ConsentFlow error, got: {:?}", other.err()),
    }
    browser.await.unwrap();
}
