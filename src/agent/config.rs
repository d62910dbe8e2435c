//! Notification branding config held by the agent.
//!
//! The agent starts every process lifetime with [`NotificationConfig::default`]
//! and only learns overrides from `CONFIG_UPDATE` messages. Updates merge
//! cumulatively: a field set by an earlier update survives a later update
//! that omits it. Nothing survives an agent restart, so the foreground
//! resends its overrides on every session start.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_APP_NAME, DEFAULT_NOTIFICATION_BADGE, DEFAULT_NOTIFICATION_ICON};

/// Branding applied to every rendered notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    /// Prefix for notification titles (`"{app_name}: {title}"`).
    pub app_name: String,
    /// Icon URI.
    pub notification_icon: String,
    /// Badge URI (monochrome status-bar glyph on mobile).
    pub notification_badge: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            notification_icon: DEFAULT_NOTIFICATION_ICON.to_string(),
            notification_badge: DEFAULT_NOTIFICATION_BADGE.to_string(),
        }
    }
}

impl NotificationConfig {
    /// Overlay the fields present in `patch`; absent fields are left alone.
    ///
    /// Returns `true` if anything changed.
    pub fn apply(&mut self, patch: &NotificationConfigPatch) -> bool {
        let before = self.clone();
        if let Some(ref app_name) = patch.app_name {
            self.app_name.clone_from(app_name);
        }
        if let Some(ref icon) = patch.notification_icon {
            self.notification_icon.clone_from(icon);
        }
        if let Some(ref badge) = patch.notification_badge {
            self.notification_badge.clone_from(badge);
        }
        *self != before
    }
}

/// Partial config as carried by a `CONFIG_UPDATE` message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfigPatch {
    /// Replacement app name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Replacement icon URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_icon: Option<String>,
    /// Replacement badge URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_badge: Option<String>,
}

impl NotificationConfigPatch {
    /// Whether the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.app_name.is_none()
            && self.notification_icon.is_none()
            && self.notification_badge.is_none()
    }
}

/// Process-wide config owned by one agent instance.
///
/// Lives exactly as long as the agent; a cold start builds a fresh one.
#[derive(Debug, Default)]
pub struct ConfigState {
    current: RwLock<NotificationConfig>,
}

impl ConfigState {
    /// Config at its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the config as it is right now.
    pub fn current(&self) -> NotificationConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge `patch` into the current config. Returns `true` if it changed.
    pub fn apply(&self, patch: &NotificationConfigPatch) -> bool {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(patch)
    }

    /// Drop every override.
    pub fn reset(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            NotificationConfig::default();
    }
}
