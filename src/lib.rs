//! Charter Push - push notification provisioning.
//!
//! Gets a signed-in user's device from "no push" to "registered with the
//! backend", and renders the pushes that arrive afterwards.
//!
//! # Architecture
//!
//! The crate splits into a foreground half that runs once per session and a
//! background agent that the platform wakes per event:
//!
//! - **Orchestrator** - one setup attempt per session, never blocking
//! - **Subscription manager** - agent registration, permission, subscribe
//! - **Registration client** - endpoint → device registry, cached
//! - **Agent** - renders pushes, routes clicks, holds branding config
//! - **Platform** - host seam; [`platform::LocalPlatform`] runs it in-process
//!
//! # Modules
//!
//! - [`agent`] - Notification agent and its runtime
//! - [`subscription`] - Subscription manager
//! - [`registration`] - Device registration client and cache
//! - [`orchestrator`] - Per-session sequencing
//! - [`config`] - Configuration loading/saving

pub mod agent;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod notifications;
pub mod orchestrator;
pub mod platform;
pub mod registration;
pub mod subscription;

// Re-export commonly used types
pub use agent::{
    NotificationAgent, NotificationConfig, NotificationConfigPatch, RenderedNotification,
};
pub use config::Config;
pub use error::PushError;
pub use notifications::PushSubscriptionHandle;
pub use orchestrator::{RegistrationOrchestrator, SessionOutcome};
pub use registration::{DeviceRegistrationClient, RegistrationStatus};
pub use subscription::SubscriptionManager;
