//! Device registration against an HTTP registry.
//!
//! Uses wiremock to stand in for the API server.

use std::sync::Arc;
use std::time::Duration;

use charter_push::notifications::{PushSubscriptionHandle, SubscriptionKeys};
use charter_push::registration::{
    DeviceRegistrationClient, HttpRegistryBackend, RegistrationCache, TokenProvider,
};
use charter_push::{PushError, RegistrationStatus};
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn handle() -> PushSubscriptionHandle {
    PushSubscriptionHandle {
        endpoint: "https://push.example.com/v1/abc123".to_string(),
        expiration_time: None,
        keys: SubscriptionKeys {
            p256dh: "BPk".to_string(),
            auth: "au7h".to_string(),
        },
    }
}

fn client(
    server: &MockServer,
    cache: RegistrationCache,
) -> DeviceRegistrationClient<HttpRegistryBackend> {
    client_for(&server.uri(), cache)
}

fn client_for(
    uri: &str,
    cache: RegistrationCache,
) -> DeviceRegistrationClient<HttpRegistryBackend> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(Some("tok_123".to_string()));
    let backend = HttpRegistryBackend::new(uri, Duration::from_secs(5)).unwrap();
    DeviceRegistrationClient::new(backend, tokens, cache)
}

/// Serve one request: read it fully, then answer with `response` and hang up.
async fn serve_once(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let body_len = text
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + body_len {
                    break;
                }
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_posts_endpoint_and_keys_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .and(header("authorization", "Bearer tok_123"))
        .and(body_json(json!({
            "endpoint": "https://push.example.com/v1/abc123",
            "keys": {"p256dh": "BPk", "auth": "au7h"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory());
    assert_eq!(client.register_device(&handle()).await, Ok(RegistrationStatus::Registered));
    // Second call is served from the cache; `expect(1)` verifies on drop.
    assert_eq!(client.register_device(&handle()).await, Ok(RegistrationStatus::Cached));
}

#[tokio::test]
async fn test_empty_success_body_counts_as_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory());
    assert_eq!(client.register_device(&handle()).await, Ok(RegistrationStatus::Registered));
}

#[tokio::test]
async fn test_server_error_is_registration_failed_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("registration_cache.json");
    let client = client(&server, RegistrationCache::open(&cache_path));

    match client.register_device(&handle()).await {
        Err(PushError::RegistrationFailed(reason)) => {
            assert!(reason.contains("500"), "reason: {reason}");
            assert!(reason.contains("database unavailable"), "reason: {reason}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!cache_path.exists());
    assert!(!client.is_cached(&handle().endpoint));
}

#[tokio::test]
async fn test_refusal_carries_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accepted": false, "reason": "device limit reached"})),
        )
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory());
    assert_eq!(
        client.register_device(&handle()).await,
        Err(PushError::RegistrationFailed("device limit reached".to_string()))
    );
}

#[tokio::test]
async fn test_unparseable_body_is_registration_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory());
    assert!(matches!(
        client.register_device(&handle()).await,
        Err(PushError::RegistrationFailed(_))
    ));
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory())
        .with_timeout(Duration::from_millis(100));
    let result = client.register_device(&handle()).await;
    assert!(matches!(result, Err(PushError::RegistrationFailed(_))), "got {result:?}");
    assert!(!client.is_cached(&handle().endpoint));
}

#[tokio::test]
async fn test_refresh_reregisters_cached_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, RegistrationCache::in_memory());
    client.register_device(&handle()).await.unwrap();
    assert_eq!(client.refresh_device(&handle()).await, Ok(RegistrationStatus::Registered));
}

#[tokio::test]
async fn test_truncated_success_body_is_registration_failed() {
    // Declares 200 bytes, sends a fragment of a refusal, then closes.
    let uri = serve_once(concat!(
        "HTTP/1.1 200 OK\r\n",
        "Content-Type: application/json\r\n",
        "Content-Length: 200\r\n",
        "\r\n",
        "{\"accepted\":false,\"rea",
    ))
    .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("registration_cache.json");
    let client = client_for(&uri, RegistrationCache::open(&cache_path));

    let result = client.register_device(&handle()).await;
    assert!(matches!(result, Err(PushError::RegistrationFailed(_))), "got {result:?}");
    assert!(!client.is_cached(&handle().endpoint));
    assert!(!cache_path.exists());
}
