//! Foreground view of the host platform.
//!
//! The [`SubscriptionManager`] talks to the platform only through
//! [`PushPlatform`]: registering the notification agent, reading and asking
//! for notification permission, and obtaining push subscriptions. Errors
//! come back as `anyhow::Error`; the manager classifies them.
//!
//! [`SubscriptionManager`]: crate::subscription::SubscriptionManager

pub mod local;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::AgentMessage;
use crate::notifications::PushSubscriptionHandle;

pub use local::LocalPlatform;

/// Notification permission as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// The user has not decided yet; asking will show a prompt.
    Default,
    /// Notifications allowed.
    Granted,
    /// Notifications blocked.
    Denied,
}

/// Result of registering the notification agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentRegistration {
    /// Scope the agent controls.
    pub scope: String,
    /// `true` when this registration started a new agent (fresh install or
    /// cold start), meaning the agent holds default config only.
    pub freshly_started: bool,
}

/// Platform operations the foreground relies on.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Register the notification agent (if needed) and wait until it is
    /// active.
    async fn register_agent(&self) -> Result<AgentRegistration>;

    /// The agent registration's current subscription, if any.
    async fn existing_subscription(&self) -> Result<Option<PushSubscriptionHandle>>;

    /// Current notification permission, without prompting.
    fn permission(&self) -> Permission;

    /// Prompt the user for notification permission. Waits for the answer.
    async fn request_permission(&self) -> Permission;

    /// Create a new subscription scoped to `application_server_key`
    /// (uncompressed P-256 point). Replaces any previous subscription.
    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscriptionHandle>;

    /// Fire-and-forget message to the active agent.
    fn post_message(&self, message: AgentMessage);
}
