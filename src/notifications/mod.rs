//! Web push primitives shared by the foreground and the agent.
//!
//! # Architecture
//!
//! ```text
//! Backend sends web push (RFC 8030) to the platform push service
//!     ↓
//! Push service wakes the notification agent
//!     ↓
//! Agent renders an OS notification
//!     ↓
//! Click opens the deep link in a client window
//! ```
//!
//! # VAPID Keys
//!
//! The backend owns a P-256 VAPID keypair (RFC 8292). The foreground only
//! holds the public half, which it passes to the platform as the
//! application server key when subscribing.
//!
//! # Push Subscriptions
//!
//! The platform returns a [`PushSubscriptionHandle`] (endpoint + keys). The
//! foreground forwards it to the device registry; the endpoint is the
//! registry key and the registration cache key.

pub mod subscription;
pub mod vapid;

pub use subscription::{PushSubscriptionHandle, SubscriptionKeys};
pub use vapid::{decode_application_server_key, VapidKeys};
