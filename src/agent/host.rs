//! Host platform seam for the notification agent.
//!
//! The agent never touches the OS directly. Everything user-visible goes
//! through a [`NotificationHost`], which the embedding platform implements.
//! [`RecordingHost`] is the in-process implementation used by the local
//! platform and the CLI.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use super::payload::RenderedNotification;

/// Operations the agent needs from its host.
///
/// Each call returns once the host has finished the side effect; the agent
/// awaits it before completing the triggering event.
#[async_trait]
pub trait NotificationHost: Send + Sync + 'static {
    /// Display a notification, replacing any visible one with the same tag.
    async fn show_notification(&self, notification: &RenderedNotification) -> Result<()>;

    /// Dismiss a displayed notification.
    async fn close_notification(&self, notification: &RenderedNotification) -> Result<()>;

    /// Open (or focus) a client window at `url`.
    async fn open_window(&self, url: &str) -> Result<()>;

    /// Activate this agent version without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of every open client of this app.
    async fn claim_clients(&self) -> Result<()>;
}

/// Entries kept per history list (`shown`, `closed`, `opened_windows`).
pub const HISTORY_LIMIT: usize = 256;

#[derive(Debug, Default)]
struct Recorded {
    shown: Vec<RenderedNotification>,
    visible: Vec<RenderedNotification>,
    closed: Vec<RenderedNotification>,
    opened_windows: Vec<String>,
    skip_waiting_calls: usize,
    claim_calls: usize,
}

/// Host that logs every side effect and keeps a record of it.
///
/// Visible notifications follow tag semantics: showing a notification
/// replaces the visible one that shares its tag. History lists keep the
/// most recent [`HISTORY_LIMIT`] entries; older ones are dropped.
#[derive(Debug, Default)]
pub struct RecordingHost {
    inner: Mutex<Recorded>,
}

impl RecordingHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Recently shown notifications, oldest first.
    pub fn shown(&self) -> Vec<RenderedNotification> {
        self.with(|r| r.shown.clone())
    }

    /// Notifications currently on screen.
    pub fn visible(&self) -> Vec<RenderedNotification> {
        self.with(|r| r.visible.clone())
    }

    /// Notifications dismissed through the host.
    pub fn closed(&self) -> Vec<RenderedNotification> {
        self.with(|r| r.closed.clone())
    }

    /// URLs of windows opened, in order.
    pub fn opened_windows(&self) -> Vec<String> {
        self.with(|r| r.opened_windows.clone())
    }

    /// Number of skip-waiting requests (one per install).
    pub fn skip_waiting_calls(&self) -> usize {
        self.with(|r| r.skip_waiting_calls)
    }

    /// Number of client-claim requests (one per activation).
    pub fn claim_calls(&self) -> usize {
        self.with(|r| r.claim_calls)
    }
}

#[async_trait]
impl NotificationHost for RecordingHost {
    async fn show_notification(&self, notification: &RenderedNotification) -> Result<()> {
        log::info!(
            "[Host] Showing notification '{}' (tag={})",
            notification.title,
            notification.options.tag
        );
        self.with(|r| {
            r.visible.retain(|n| n.options.tag != notification.options.tag);
            r.visible.push(notification.clone());
            push_bounded(&mut r.shown, notification.clone());
        });
        Ok(())
    }

    async fn close_notification(&self, notification: &RenderedNotification) -> Result<()> {
        log::debug!("[Host] Closing notification '{}'", notification.title);
        self.with(|r| {
            r.visible.retain(|n| n != notification);
            push_bounded(&mut r.closed, notification.clone());
        });
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        log::info!("[Host] Opening window at {url}");
        self.with(|r| push_bounded(&mut r.opened_windows, url.to_string()));
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<()> {
        self.with(|r| r.skip_waiting_calls += 1);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        self.with(|r| r.claim_calls += 1);
        Ok(())
    }
}

fn push_bounded<T>(list: &mut Vec<T>, item: T) {
    if list.len() >= HISTORY_LIMIT {
        list.drain(..=list.len() - HISTORY_LIMIT);
    }
    list.push(item);
}
