//! Push payloads and the notifications rendered from them.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::NotificationConfig;
use crate::constants::{NOTIFICATION_TAG, VIBRATE_PATTERN};

/// Action button offered on a notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Identifier reported back when the button is pressed.
    pub action: String,
    /// Button label.
    pub title: String,
    /// Optional button icon URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// JSON body of a push message as sent by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    /// Notification headline (prefixed with the app name when rendered).
    pub title: String,
    /// Notification body text.
    #[serde(default)]
    pub body: String,
    /// Side-channel data; `url` is the click deep link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Action buttons, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,
}

impl PushPayload {
    /// Parse the raw bytes of a push message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Push payload is not a valid notification JSON")
    }
}

/// Options passed to the host when showing a notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    /// Body text.
    pub body: String,
    /// Icon URI from the current config.
    pub icon: String,
    /// Badge URI from the current config.
    pub badge: String,
    /// Payload data plus the render `timestamp`.
    pub data: Map<String, Value>,
    /// Action buttons (empty when the payload had none).
    pub actions: Vec<NotificationAction>,
    /// Vibration pattern.
    pub vibrate: Vec<u32>,
    /// Grouping tag; identical for every notification from this app.
    pub tag: String,
    /// Re-alert even though the tag replaces an existing notification.
    pub renotify: bool,
    /// Keep the notification on screen until the user acts on it.
    pub require_interaction: bool,
    /// Play the platform sound.
    pub silent: bool,
    /// Render time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A notification ready to hand to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedNotification {
    /// Full title, `"{app_name}: {payload title}"`.
    pub title: String,
    /// Display options.
    pub options: NotificationOptions,
}

impl RenderedNotification {
    /// Render `payload` with the branding in `config` at time `now`.
    pub fn render(payload: PushPayload, config: &NotificationConfig, now: DateTime<Utc>) -> Self {
        let timestamp = now.timestamp_millis();

        let mut data = payload.data.unwrap_or_default();
        data.insert("timestamp".to_string(), Value::from(timestamp));

        Self {
            title: format!("{}: {}", config.app_name, payload.title),
            options: NotificationOptions {
                body: payload.body,
                icon: config.notification_icon.clone(),
                badge: config.notification_badge.clone(),
                data,
                actions: payload.actions.unwrap_or_default(),
                vibrate: VIBRATE_PATTERN.to_vec(),
                tag: NOTIFICATION_TAG.to_string(),
                renotify: true,
                require_interaction: true,
                silent: false,
                timestamp,
            },
        }
    }

    /// Deep link carried in the side-channel data, if any.
    ///
    /// Only a non-empty string `url` counts.
    pub fn deep_link(&self) -> Option<&str> {
        self.options
            .data
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time")
    }

    #[test]
    fn test_render_without_data() {
        let payload =
            PushPayload::from_bytes(br#"{"title":"Quote ready","body":"3 operators replied"}"#)
                .expect("parse");
        let rendered =
            RenderedNotification::render(payload, &NotificationConfig::default(), fixed_now());

        assert_eq!(rendered.title, "Charter Search: Quote ready");
        assert_eq!(rendered.options.body, "3 operators replied");
        assert_eq!(rendered.options.icon, "/notification-icon.png");
        assert_eq!(rendered.options.badge, "/notification-badge.png");
        assert_eq!(rendered.options.tag, "charter-notification");
        assert!(rendered.options.renotify);
        assert!(rendered.options.require_interaction);
        assert!(!rendered.options.silent);
        assert_eq!(rendered.options.vibrate, vec![200, 100, 200]);
        assert!(rendered.options.actions.is_empty());
        assert_eq!(rendered.options.data.len(), 1);
        assert_eq!(
            rendered.options.data["timestamp"],
            Value::from(fixed_now().timestamp_millis())
        );
        assert!(rendered.deep_link().is_none());
    }

    #[test]
    fn test_render_merges_data_and_keeps_action_order() {
        let payload = PushPayload::from_bytes(
            br#"{
                "title": "Trip update",
                "body": "Departure moved",
                "data": {"url": "/trips/42", "tripId": 42},
                "actions": [
                    {"action": "view", "title": "View"},
                    {"action": "dismiss", "title": "Dismiss", "icon": "/x.png"}
                ]
            }"#,
        )
        .expect("parse");
        let rendered =
            RenderedNotification::render(payload, &NotificationConfig::default(), fixed_now());

        assert_eq!(rendered.deep_link(), Some("/trips/42"));
        assert_eq!(rendered.options.data["tripId"], 42);
        assert!(rendered.options.data.contains_key("timestamp"));
        let actions: Vec<&str> = rendered
            .options
            .actions
            .iter()
            .map(|a| a.action.as_str())
            .collect();
        assert_eq!(actions, ["view", "dismiss"]);
        assert_eq!(rendered.options.actions[1].icon.as_deref(), Some("/x.png"));
    }

    #[test]
    fn test_payload_rejects_garbage() {
        assert!(PushPayload::from_bytes(b"not json").is_err());
        assert!(PushPayload::from_bytes(br#"{"body":"no title"}"#).is_err());
        assert!(PushPayload::from_bytes(br#"{"title":"t","data":[1,2]}"#).is_err());
    }

    #[test]
    fn test_non_string_url_is_not_a_deep_link() {
        let payload = PushPayload::from_bytes(br#"{"title":"t","body":"b","data":{"url":7}}"#)
            .expect("parse");
        let rendered =
            RenderedNotification::render(payload, &NotificationConfig::default(), fixed_now());
        assert!(rendered.deep_link().is_none());
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let payload = PushPayload::from_bytes(br#"{"title":"t","body":"b"}"#).expect("parse");
        let rendered =
            RenderedNotification::render(payload, &NotificationConfig::default(), fixed_now());
        let json = serde_json::to_value(&rendered).expect("serialize");
        assert_eq!(json["options"]["requireInteraction"], true);
    }
}
