//! Push subscription handle issued by the platform.
//!
//! The foreground never creates these itself: the platform mints one when
//! asked to subscribe and hands back the endpoint plus the browser-side key
//! material that the backend needs to encrypt pushes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key material attached to a subscription (both base64url).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key.
    pub p256dh: String,
    /// Shared auth secret.
    pub auth: String,
}

/// A platform push subscription.
///
/// The endpoint is unique and stable until the subscription is renewed or
/// revoked, so it doubles as the device registry key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionHandle {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// When the push service will stop accepting messages, if it says.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
    /// Encryption keys for this subscription.
    pub keys: SubscriptionKeys,
}

impl PushSubscriptionHandle {
    /// Whether the subscription has expired as of `now`.
    ///
    /// Subscriptions without an expiration never expire on their own.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|at| at <= now)
    }

    /// Shortened endpoint for log lines.
    pub fn endpoint_for_log(&self) -> &str {
        let tail_start = self.endpoint.len().saturating_sub(12);
        self.endpoint.get(tail_start..).unwrap_or(&self.endpoint)
    }
}
