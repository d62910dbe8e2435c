//! Error taxonomy for the push provisioning pipeline.
//!
//! Every failure that can reach the [`RegistrationOrchestrator`] is one of
//! these variants. None of them is fatal to the host application: the
//! orchestrator downgrades all of them to an advisory message.
//!
//! [`RegistrationOrchestrator`]: crate::orchestrator::RegistrationOrchestrator

use thiserror::Error;

/// Failure while provisioning push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// The platform cannot host the notification agent (no secure context,
    /// unsupported platform, registration refused).
    #[error("notification agent unavailable: {0}")]
    AgentUnavailable(String),

    /// The user declined notification permission.
    #[error("notification permission denied")]
    PermissionDenied,

    /// The platform or push service failed to produce a subscription.
    #[error("push subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The device registry rejected the subscription or was unreachable.
    #[error("device registration failed: {0}")]
    RegistrationFailed(String),
}

impl PushError {
    /// Whether a later session may succeed without new user action.
    ///
    /// `AgentUnavailable` and `PermissionDenied` are terminal until the
    /// environment or the user's decision changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionFailed(_) | Self::RegistrationFailed(_)
        )
    }

    /// Human-readable summary surfaced to the UI layer.
    pub fn advisory(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Notifications are blocked. Enable them in your browser settings to get updates."
                    .to_string()
            }
            other => format!("Failed to setup push notifications: {other}"),
        }
    }
}
