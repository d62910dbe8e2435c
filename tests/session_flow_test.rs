//! End-to-end push setup: local platform, in-process agent, HTTP registry.

use std::sync::Arc;
use std::time::Duration;

use charter_push::agent::RecordingHost;
use charter_push::notifications::VapidKeys;
use charter_push::platform::{LocalPlatform, Permission, PushPlatform};
use charter_push::registration::{
    DeviceRegistrationClient, HttpRegistryBackend, RegistrationCache, TokenProvider,
};
use charter_push::{
    NotificationConfigPatch, RegistrationOrchestrator, SessionOutcome, SubscriptionManager,
};
use reqwest::Url;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCOPE: &str = "https://app.example.com/";

/// One "page load": fresh platform view over shared on-disk state.
struct Session {
    host: Arc<RecordingHost>,
    platform: Arc<LocalPlatform<RecordingHost>>,
    orchestrator: RegistrationOrchestrator<LocalPlatform<RecordingHost>, HttpRegistryBackend>,
}

fn session(dir: &TempDir, server: &MockServer, vapid: &VapidKeys, token: Option<&str>) -> Session {
    session_with(dir, server, vapid, token, Permission::Granted)
}

fn session_with(
    dir: &TempDir,
    server: &MockServer,
    vapid: &VapidKeys,
    token: Option<&str>,
    prompt_answer: Permission,
) -> Session {
    let host = Arc::new(RecordingHost::new());
    let platform = Arc::new(
        LocalPlatform::new(Arc::clone(&host), Url::parse(SCOPE).unwrap())
            .with_prompt_answer(prompt_answer)
            .with_subscription_file(dir.path().join("push_subscription.json")),
    );
    let tokens: Arc<dyn TokenProvider> = Arc::new(token.map(str::to_string));

    let subscriptions =
        SubscriptionManager::new(Arc::clone(&platform), vapid.public_key_base64url())
            .unwrap()
            .with_agent_config(NotificationConfigPatch {
                app_name: Some("Charter Pro".to_string()),
                ..Default::default()
            });
    let registration = DeviceRegistrationClient::new(
        HttpRegistryBackend::new(&server.uri(), Duration::from_secs(5)).unwrap(),
        Arc::clone(&tokens),
        RegistrationCache::open(dir.path().join("registration_cache.json")),
    );

    Session {
        host,
        platform,
        orchestrator: RegistrationOrchestrator::new(tokens, subscriptions, registration),
    }
}

async fn accepting_registry(expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push/devices"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_second_session_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(1).await;

    let first = session(&dir, &server, &vapid, Some("tok"));
    assert_eq!(first.orchestrator.run_session().await, SessionOutcome::Registered);
    let endpoint = first
        .platform
        .existing_subscription()
        .await
        .unwrap()
        .unwrap()
        .endpoint;

    let second = session(&dir, &server, &vapid, Some("tok"));
    assert_eq!(second.orchestrator.run_session().await, SessionOutcome::Cached);
    assert_eq!(second.platform.subscribe_calls(), 0);
    assert_eq!(
        second.platform.existing_subscription().await.unwrap().unwrap().endpoint,
        endpoint
    );
}

#[tokio::test]
async fn test_anonymous_session_does_nothing() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(0).await;

    let s = session(&dir, &server, &vapid, None);
    assert_eq!(s.orchestrator.run_session().await, SessionOutcome::Skipped);
    assert_eq!(s.platform.agents_started(), 0);
    assert!(!dir.path().join("push_subscription.json").exists());
    assert!(!dir.path().join("registration_cache.json").exists());
}

#[tokio::test]
async fn test_revoked_subscription_registers_new_endpoint() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(2).await;

    let first = session(&dir, &server, &vapid, Some("tok"));
    assert_eq!(first.orchestrator.run_session().await, SessionOutcome::Registered);
    first.platform.revoke_subscription().unwrap();

    let second = session(&dir, &server, &vapid, Some("tok"));
    assert_eq!(second.orchestrator.run_session().await, SessionOutcome::Registered);
    assert_eq!(second.platform.subscribe_calls(), 1);
}

#[tokio::test]
async fn test_denied_permission_is_advisory_only() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(0).await;

    let s = session_with(&dir, &server, &vapid, Some("tok"), Permission::Denied);
    let outcome = s.orchestrator.run_session().await;
    assert!(outcome.advisory().is_some(), "got {outcome:?}");
    assert_eq!(s.platform.subscribe_calls(), 0);
}

#[tokio::test]
async fn test_push_and_click_after_setup() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(1).await;

    let s = session(&dir, &server, &vapid, Some("tok"));
    s.orchestrator.run_session().await;

    let shown = s
        .platform
        .deliver_push(Some(
            br#"{"title":"New match","body":"3 charters","data":{"url":"/search/42"}}"#.to_vec(),
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shown.title, "Charter Pro: New match");
    assert_eq!(s.host.visible().len(), 1);

    let navigated = s.platform.click(shown).await.unwrap();
    assert_eq!(navigated.as_deref(), Some("https://app.example.com/search/42"));
    assert_eq!(s.host.opened_windows(), vec!["https://app.example.com/search/42".to_string()]);
    assert!(s.host.visible().is_empty());
}

#[tokio::test]
async fn test_cold_started_agent_renders_defaults_until_next_session() {
    let dir = TempDir::new().unwrap();
    let vapid = VapidKeys::generate().unwrap();
    let server = accepting_registry(1).await;

    let s = session(&dir, &server, &vapid, Some("tok"));
    s.orchestrator.run_session().await;
    s.platform.terminate_agent();

    let shown = s
        .platform
        .deliver_push(Some(br#"{"title":"Hello","body":""}"#.to_vec()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shown.title, "Charter Search: Hello");

    // The next session resends the overrides to the running agent.
    let next = session(&dir, &server, &vapid, Some("tok"));
    assert_eq!(next.orchestrator.run_session().await, SessionOutcome::Cached);
    let shown = next
        .platform
        .deliver_push(Some(br#"{"title":"Hello","body":""}"#.to_vec()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shown.title, "Charter Pro: Hello");
}
