//! Background notification agent.
//!
//! The agent is the long-lived half of the pipeline. It outlives any open
//! application window, is woken by the host for push deliveries and
//! notification clicks, and may be suspended between any two events.
//!
//! # Lifecycle
//!
//! ```text
//! Installing ──(activate)──► Activated
//! ```
//!
//! Install asks the host to skip waiting so a new agent version supersedes
//! the old one immediately; activate claims all open clients. Once
//! activated, every handler is stateless apart from the [`ConfigState`],
//! and even that resets to defaults on a cold start.
//!
//! # Events
//!
//! - **Message**: `CONFIG_UPDATE` merges branding overrides
//! - **Push**: renders a [`RenderedNotification`] through the host
//! - **NotificationClick**: closes the notification, opens its deep link
//!
//! Handlers are driven by [`runtime::spawn`], which runs them one at a time
//! and signals completion only after the host side effect finished.

pub mod config;
pub mod host;
pub mod message;
pub mod payload;
pub mod runtime;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Url;
use serde::Serialize;

pub use config::{ConfigState, NotificationConfig, NotificationConfigPatch};
pub use host::{NotificationHost, RecordingHost};
pub use message::AgentMessage;
pub use payload::{NotificationAction, NotificationOptions, PushPayload, RenderedNotification};
pub use runtime::{AgentHandle, AgentState};

/// Event counters for one agent lifetime.
#[derive(Debug, Default)]
pub struct AgentMetrics {
    rendered: AtomicU64,
    empty_pushes: AtomicU64,
    malformed_pushes: AtomicU64,
    clicks: AtomicU64,
    navigations: AtomicU64,
    config_updates: AtomicU64,
}

/// Point-in-time copy of [`AgentMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Notifications handed to the host.
    pub rendered: u64,
    /// Push events that arrived without a payload.
    pub empty_pushes: u64,
    /// Push events whose payload could not be parsed.
    pub malformed_pushes: u64,
    /// Notification clicks handled.
    pub clicks: u64,
    /// Clicks that opened a window.
    pub navigations: u64,
    /// Config update messages applied.
    pub config_updates: u64,
}

impl AgentMetrics {
    /// Copy the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rendered: self.rendered.load(Ordering::Relaxed),
            empty_pushes: self.empty_pushes.load(Ordering::Relaxed),
            malformed_pushes: self.malformed_pushes.load(Ordering::Relaxed),
            clicks: self.clicks.load(Ordering::Relaxed),
            navigations: self.navigations.load(Ordering::Relaxed),
            config_updates: self.config_updates.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Notification agent bound to a host and an app scope.
pub struct NotificationAgent<H: NotificationHost> {
    host: Arc<H>,
    scope: Url,
    config: ConfigState,
    metrics: Arc<AgentMetrics>,
}

impl<H: NotificationHost> std::fmt::Debug for NotificationAgent<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationAgent")
            .field("scope", &self.scope.as_str())
            .field("config", &self.config.current())
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

impl<H: NotificationHost> NotificationAgent<H> {
    /// Cold-start an agent. Config begins at its defaults.
    ///
    /// `scope` is the app origin; relative deep links resolve against it.
    pub fn new(host: Arc<H>, scope: Url) -> Self {
        Self {
            host,
            scope,
            config: ConfigState::new(),
            metrics: Arc::new(AgentMetrics::default()),
        }
    }

    /// Current branding config.
    pub fn config(&self) -> NotificationConfig {
        self.config.current()
    }

    /// Shared handle to this agent's counters.
    pub fn metrics(&self) -> Arc<AgentMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Install: drop any config and supersede the previous agent version.
    pub async fn on_install(&self) -> Result<()> {
        self.config.reset();
        self.host
            .skip_waiting()
            .await
            .context("Host refused skip-waiting")?;
        log::info!("[Agent] Installed (scope={})", self.scope);
        Ok(())
    }

    /// Activate: take over open clients without waiting for a reload.
    pub async fn on_activate(&self) -> Result<()> {
        self.host
            .claim_clients()
            .await
            .context("Host refused to hand over clients")?;
        log::info!("[Agent] Activated and controlling clients");
        Ok(())
    }

    /// Apply a foreground message. Nothing is sent back.
    pub fn on_message(&self, message: &AgentMessage) {
        match message {
            AgentMessage::ConfigUpdate { config } => {
                let changed = self.config.apply(config);
                AgentMetrics::bump(&self.metrics.config_updates);
                log::debug!("[Agent] Config update applied (changed={changed})");
            }
            AgentMessage::Unknown => {
                log::debug!("[Agent] Ignoring message of unknown type");
            }
        }
    }

    /// Handle a push delivery.
    ///
    /// Returns the rendered notification, or `None` when the push carried no
    /// payload. Empty pushes are logged and counted rather than rendered.
    pub async fn on_push(&self, data: Option<&[u8]>) -> Result<Option<RenderedNotification>> {
        let Some(bytes) = data.filter(|b| !b.is_empty()) else {
            AgentMetrics::bump(&self.metrics.empty_pushes);
            log::warn!(
                "[Agent] Push event without payload, nothing rendered ({} so far)",
                self.metrics.empty_pushes.load(Ordering::Relaxed)
            );
            return Ok(None);
        };

        let payload = match PushPayload::from_bytes(bytes) {
            Ok(payload) => payload,
            Err(e) => {
                AgentMetrics::bump(&self.metrics.malformed_pushes);
                log::error!("[Agent] Dropping malformed push ({} bytes): {e:#}", bytes.len());
                return Err(e);
            }
        };

        let notification =
            RenderedNotification::render(payload, &self.config.current(), Utc::now());
        self.host
            .show_notification(&notification)
            .await
            .context("Host failed to show notification")?;
        AgentMetrics::bump(&self.metrics.rendered);

        Ok(Some(notification))
    }

    /// Handle a click on one of our notifications.
    ///
    /// Returns the URL a window was opened at, if any.
    pub async fn on_notification_click(
        &self,
        notification: &RenderedNotification,
    ) -> Result<Option<String>> {
        AgentMetrics::bump(&self.metrics.clicks);
        self.host
            .close_notification(notification)
            .await
            .context("Host failed to close notification")?;

        let Some(link) = notification.deep_link() else {
            log::debug!("[Agent] Click without deep link, no navigation");
            return Ok(None);
        };

        let url = self
            .scope
            .join(link)
            .with_context(|| format!("Invalid deep link '{link}'"))?;
        self.host
            .open_window(url.as_str())
            .await
            .with_context(|| format!("Host failed to open window at {url}"))?;
        AgentMetrics::bump(&self.metrics.navigations);

        Ok(Some(url.to_string()))
    }
}
