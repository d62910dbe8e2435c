//! Render push payloads through a local notification agent.
//!
//! Useful for checking branding and deep links without a push service:
//! the payload goes through exactly the handlers a real push would.

use anyhow::Result;
use serde::Serialize;

use crate::agent::{AgentMessage, MetricsSnapshot, RenderedNotification};
use crate::platform::PushPlatform;
use crate::Config;

/// What `render` printed.
#[derive(Debug, Serialize)]
pub struct RenderReport {
    /// The notification shown, if the payload produced one.
    pub notification: Option<RenderedNotification>,
    /// Where a click navigated, when a click was simulated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
    /// Agent counters after handling.
    pub metrics: Option<MetricsSnapshot>,
}

/// Deliver `payload` (raw push data; `None` for a payload-less push) and
/// optionally click the result.
pub async fn render(config: &Config, payload: Option<String>, click: bool) -> Result<RenderReport> {
    let platform = super::local_platform(config)?;
    platform.register_agent().await?;
    if !config.notification.is_empty() {
        platform.post_message(AgentMessage::config_update(config.notification.clone()));
    }

    let notification = platform.deliver_push(payload.map(String::into_bytes)).await?;

    let navigated_to = match notification {
        Some(ref shown) if click => platform.click(shown.clone()).await?,
        _ => None,
    };

    let report = RenderReport {
        notification,
        navigated_to,
        metrics: platform.agent().map(|agent| agent.metrics()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}
