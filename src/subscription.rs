//! Subscription manager: agent installed, subscription in hand.
//!
//! [`SubscriptionManager::ensure_subscription`] is the foreground's single
//! entry point for getting a usable [`PushSubscriptionHandle`]:
//!
//! 1. Register the notification agent and wait until it is active
//! 2. Resend the branding config (the agent may have cold-started)
//! 3. Reuse an existing, unexpired subscription
//! 4. Otherwise settle permission and subscribe with the VAPID key
//!
//! There is no retry here. A failed call is retried, if at all, by a later
//! session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::agent::{AgentMessage, NotificationConfigPatch};
use crate::constants::SUBSCRIBE_TIMEOUT;
use crate::error::PushError;
use crate::notifications::{decode_application_server_key, PushSubscriptionHandle};
use crate::platform::{AgentRegistration, Permission, PushPlatform};

/// Obtains push subscriptions from a platform.
#[derive(Debug)]
pub struct SubscriptionManager<P: PushPlatform> {
    platform: Arc<P>,
    application_server_key: Vec<u8>,
    agent_config: Option<NotificationConfigPatch>,
    subscribe_timeout: Duration,
}

impl<P: PushPlatform> SubscriptionManager<P> {
    /// Create a manager that subscribes with the given base64url VAPID
    /// public key.
    pub fn new(platform: Arc<P>, application_server_key_b64: &str) -> Result<Self> {
        Ok(Self {
            platform,
            application_server_key: decode_application_server_key(application_server_key_b64)?,
            agent_config: None,
            subscribe_timeout: SUBSCRIBE_TIMEOUT,
        })
    }

    /// Branding overrides to send to the agent once it is ready.
    pub fn with_agent_config(mut self, config: NotificationConfigPatch) -> Self {
        self.agent_config = Some(config);
        self
    }

    /// Bound on a single subscribe call.
    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    /// Make sure the agent is running and return a usable subscription.
    pub async fn ensure_subscription(&self) -> Result<PushSubscriptionHandle, PushError> {
        let registration = self
            .platform
            .register_agent()
            .await
            .map_err(|e| PushError::AgentUnavailable(format!("{e:#}")))?;
        self.sync_agent_config(&registration);

        match self.platform.existing_subscription().await {
            Ok(Some(existing)) if !existing.is_expired(Utc::now()) => {
                log::debug!(
                    "[Push] Reusing subscription ...{}",
                    existing.endpoint_for_log()
                );
                return Ok(existing);
            }
            Ok(Some(expired)) => {
                log::info!(
                    "[Push] Subscription ...{} expired, renewing",
                    expired.endpoint_for_log()
                );
            }
            Ok(None) => {}
            Err(e) => return Err(PushError::SubscriptionFailed(format!("{e:#}"))),
        }

        let permission = match self.platform.permission() {
            Permission::Default => self.platform.request_permission().await,
            decided => decided,
        };
        if permission != Permission::Granted {
            log::info!("[Push] Notification permission is {permission:?}");
            return Err(PushError::PermissionDenied);
        }

        match tokio::time::timeout(
            self.subscribe_timeout,
            self.platform.subscribe(&self.application_server_key),
        )
        .await
        {
            Ok(Ok(subscription)) => {
                log::info!(
                    "[Push] New subscription ...{}",
                    subscription.endpoint_for_log()
                );
                Ok(subscription)
            }
            Ok(Err(e)) => Err(PushError::SubscriptionFailed(format!("{e:#}"))),
            Err(elapsed) => Err(PushError::SubscriptionFailed(format!(
                "subscribe timed out after {:?} ({elapsed})",
                self.subscribe_timeout
            ))),
        }
    }

    fn sync_agent_config(&self, registration: &AgentRegistration) {
        let Some(ref config) = self.agent_config else {
            return;
        };
        if config.is_empty() {
            return;
        }
        log::debug!(
            "[Push] Sending config to agent at {} (fresh={})",
            registration.scope,
            registration.freshly_started
        );
        self.platform
            .post_message(AgentMessage::config_update(config.clone()));
    }
}
