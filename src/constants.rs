//! Application-wide constants for charter-push.
//!
//! Centralizes timeouts, default branding and the fixed notification
//! presentation values so the agent and the foreground agree on them.
//!
//! # Categories
//!
//! - **Timeouts**: Network and platform operation timeouts
//! - **Branding**: Default notification config values
//! - **Presentation**: Fixed notification options applied by the agent
//! - **Storage**: File names under the config directory

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP client request timeout for device registry calls.
///
/// Applies to individual requests. Expiry maps to `RegistrationFailed`.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a platform subscribe call (push service round trip).
///
/// Permission prompts are not covered; they wait on the user indefinitely.
pub const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Branding
// ============================================================================

/// Default application name prefixed to every notification title.
pub const DEFAULT_APP_NAME: &str = "Charter Search";

/// Default notification icon (relative to the app origin).
pub const DEFAULT_NOTIFICATION_ICON: &str = "/notification-icon.png";

/// Default notification badge (relative to the app origin).
pub const DEFAULT_NOTIFICATION_BADGE: &str = "/notification-badge.png";

// ============================================================================
// Presentation
// ============================================================================

/// Grouping tag shared by every notification from this app.
///
/// A new notification replaces the visual slot of the previous one.
pub const NOTIFICATION_TAG: &str = "charter-notification";

/// Vibration pattern in milliseconds (vibrate, pause, vibrate).
pub const VIBRATE_PATTERN: [u32; 3] = [200, 100, 200];

/// Message type tag for foreground → agent configuration updates.
pub const CONFIG_UPDATE_MESSAGE: &str = "CONFIG_UPDATE";

// ============================================================================
// Server & Storage
// ============================================================================

/// Default backend server URL.
pub const DEFAULT_SERVER_URL: &str = "https://api.chartersearch.com";

/// Default application origin; also the agent scope for resolving deep links.
pub const DEFAULT_APP_ORIGIN: &str = "https://app.chartersearch.com";

/// Device registry path, appended to the server URL.
pub const DEVICE_REGISTRY_PATH: &str = "/api/push/devices";

/// Registration cache file name under the config directory.
pub const REGISTRATION_CACHE_FILE: &str = "registration_cache.json";

/// Durable local-platform subscription file name under the config directory.
pub const SUBSCRIPTION_FILE: &str = "push_subscription.json";

/// Base URL the local platform mints subscription endpoints under.
pub const LOCAL_PUSH_SERVICE_URL: &str = "https://push.local.chartersearch.com/v1";
