//! Push setup session.

use std::sync::Arc;

use anyhow::Result;

use crate::agent::RecordingHost;
use crate::orchestrator::{RegistrationOrchestrator, SessionOutcome};
use crate::platform::{LocalPlatform, Permission};
use crate::registration::{
    DeviceRegistrationClient, HttpRegistryBackend, RegistrationCache, TokenProvider,
};
use crate::subscription::SubscriptionManager;
use crate::Config;

/// Orchestrator wired from `config`: local platform, HTTP registry,
/// file-backed registration cache.
pub fn build(
    config: &Config,
    platform: LocalPlatform<RecordingHost>,
) -> Result<RegistrationOrchestrator<LocalPlatform<RecordingHost>, HttpRegistryBackend>> {
    if config.application_server_key.is_empty() {
        anyhow::bail!(
            "No application server key configured \
             (set CHARTER_PUSH_VAPID_PUBLIC_KEY or run `charter-push vapid generate`)"
        );
    }

    let tokens: Arc<dyn TokenProvider> = Arc::new(config.clone());
    let subscriptions =
        SubscriptionManager::new(Arc::new(platform), &config.application_server_key)?
            .with_agent_config(config.notification.clone());
    let backend = HttpRegistryBackend::new(&config.server_url, config.request_timeout())?;
    let registration = DeviceRegistrationClient::new(
        backend,
        Arc::clone(&tokens),
        RegistrationCache::open(config.registration_cache_path()?),
    )
    .with_timeout(config.request_timeout());

    Ok(RegistrationOrchestrator::new(tokens, subscriptions, registration))
}

/// Run one session and print its outcome as JSON.
///
/// `force` re-registers a cached endpoint; `deny` makes the simulated user
/// refuse the permission prompt. Without a token the session is skipped
/// before any other configuration is checked.
pub async fn register(config: &Config, force: bool, deny: bool) -> Result<SessionOutcome> {
    if !config.has_token() {
        log::info!("[Session] Anonymous session, push setup not attempted");
        return print_outcome(SessionOutcome::Skipped);
    }

    let mut platform = super::local_platform(config)?;
    if deny {
        platform = platform.with_prompt_answer(Permission::Denied);
    }

    let orchestrator = build(config, platform)?.with_forced_refresh(force);
    print_outcome(orchestrator.run_session().await)
}

fn print_outcome(outcome: SessionOutcome) -> Result<SessionOutcome> {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_session_skips_without_server_key() {
        let config = Config::default();
        assert!(config.application_server_key.is_empty());

        let outcome = register(&config, false, false).await.expect("register");
        assert_eq!(outcome, SessionOutcome::Skipped);
    }

    #[test]
    fn test_signed_in_session_requires_server_key() {
        let config = Config {
            token: "tok".to_string(),
            ..Config::default()
        };
        let platform = crate::commands::local_platform(&config).expect("platform");
        let err = build(&config, platform).expect_err("missing key");
        assert!(err.to_string().contains("No application server key"));
    }
}
