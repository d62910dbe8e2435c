//! Event loop for one agent lifetime.
//!
//! [`spawn`] moves a [`NotificationAgent`] onto its own tokio task and
//! returns an [`AgentHandle`]. The task installs and activates the agent,
//! then takes events off an unbounded channel one at a time.
//!
//! # Completion
//!
//! Push and click events carry a oneshot sender. The task replies only after
//! the handler returned, i.e. after the host finished rendering or opening
//! the window, so a dispatcher that awaits the reply knows the side effect
//! happened before it lets the agent be suspended.
//!
//! Messages carry no reply channel. A message posted after the agent task
//! has gone away is dropped.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;

use super::{
    AgentMessage, AgentMetrics, MetricsSnapshot, NotificationAgent, NotificationHost,
    RenderedNotification,
};

/// Lifecycle state of a running agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    /// Install/activate handlers have not finished yet.
    Installing,
    /// Controlling clients and handling events.
    Activated,
}

/// Event delivered to the agent task.
#[derive(Debug)]
enum AgentEvent {
    Message(AgentMessage),
    Push {
        data: Option<Vec<u8>>,
        done: oneshot::Sender<Result<Option<RenderedNotification>>>,
    },
    NotificationClick {
        notification: RenderedNotification,
        done: oneshot::Sender<Result<Option<String>>>,
    },
}

/// Handle to a running agent. Cheap to clone.
///
/// Dropping every handle closes the event channel and lets the agent task
/// finish.
#[derive(Clone, Debug)]
pub struct AgentHandle {
    events: mpsc::UnboundedSender<AgentEvent>,
    state: watch::Receiver<AgentState>,
    metrics: Arc<AgentMetrics>,
    task: Arc<AbortHandle>,
}

/// Start `agent` on a new task.
///
/// Must be called from within a tokio runtime.
pub fn spawn<H: NotificationHost>(agent: NotificationAgent<H>) -> AgentHandle {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AgentEvent>();
    let (state_tx, state_rx) = watch::channel(AgentState::Installing);
    let metrics = agent.metrics();

    let task = tokio::spawn(async move {
        if let Err(e) = agent.on_install().await {
            log::warn!("[Agent] Install step failed: {e:#}");
        }
        if let Err(e) = agent.on_activate().await {
            log::warn!("[Agent] Activate step failed: {e:#}");
        }
        state_tx.send_replace(AgentState::Activated);

        while let Some(event) = events_rx.recv().await {
            match event {
                AgentEvent::Message(message) => agent.on_message(&message),
                AgentEvent::Push { data, done } => {
                    let result = agent.on_push(data.as_deref()).await;
                    let _ = done.send(result);
                }
                AgentEvent::NotificationClick { notification, done } => {
                    let result = agent.on_notification_click(&notification).await;
                    let _ = done.send(result);
                }
            }
        }

        log::debug!("[Agent] Event channel closed, agent exiting");
    });

    AgentHandle {
        events: events_tx,
        state: state_rx,
        metrics,
        task: Arc::new(task.abort_handle()),
    }
}

impl AgentHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Wait until install and activate have run.
    pub async fn ready(&self) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == AgentState::Activated)
            .await
            .map(|_| ())
            .map_err(|e| anyhow!("Agent stopped before activating: {e}"))
    }

    /// Whether the agent task is still accepting events.
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    /// Post a message without waiting for, or getting, any reply.
    pub fn post_message(&self, message: AgentMessage) {
        if self.events.send(AgentEvent::Message(message)).is_err() {
            log::debug!("[Agent] Message posted to a stopped agent was dropped");
        }
    }

    /// Deliver a push and wait until it has been handled.
    pub async fn push(&self, data: Option<Vec<u8>>) -> Result<Option<RenderedNotification>> {
        let (done, reply) = oneshot::channel();
        self.events
            .send(AgentEvent::Push { data, done })
            .map_err(|e| anyhow!("Agent is not running: {e}"))?;
        reply
            .await
            .map_err(|e| anyhow!("Agent stopped before finishing push: {e}"))?
    }

    /// Deliver a notification click and wait until it has been handled.
    pub async fn click(&self, notification: RenderedNotification) -> Result<Option<String>> {
        let (done, reply) = oneshot::channel();
        self.events
            .send(AgentEvent::NotificationClick { notification, done })
            .map_err(|e| anyhow!("Agent is not running: {e}"))?;
        reply
            .await
            .map_err(|e| anyhow!("Agent stopped before finishing click: {e}"))?
    }

    /// Counters for this agent lifetime.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop the agent task, discarding all of its in-memory state.
    pub fn terminate(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{NotificationConfigPatch, RecordingHost};
    use reqwest::Url;

    fn start() -> (Arc<RecordingHost>, AgentHandle) {
        let host = Arc::new(RecordingHost::new());
        let scope = Url::parse("https://app.example.com/").expect("scope");
        let handle = spawn(NotificationAgent::new(Arc::clone(&host), scope));
        (host, handle)
    }

    #[tokio::test]
    async fn test_lifecycle_runs_before_events() {
        let (host, handle) = start();
        handle.ready().await.expect("ready");

        assert_eq!(handle.state(), AgentState::Activated);
        assert_eq!(host.skip_waiting_calls(), 1);
        assert_eq!(host.claim_calls(), 1);
    }

    #[tokio::test]
    async fn test_messages_apply_in_send_order_before_later_push() {
        let (host, handle) = start();
        handle.post_message(AgentMessage::config_update(NotificationConfigPatch {
            app_name: Some("First".to_string()),
            ..Default::default()
        }));
        handle.post_message(AgentMessage::config_update(NotificationConfigPatch {
            app_name: Some("Second".to_string()),
            ..Default::default()
        }));

        let rendered = handle
            .push(Some(br#"{"title":"t","body":"b"}"#.to_vec()))
            .await
            .expect("push")
            .expect("rendered");

        assert_eq!(rendered.title, "Second: t");
        assert_eq!(host.shown().len(), 1, "push completes only after rendering");
        assert_eq!(handle.metrics().config_updates, 2);
    }

    #[tokio::test]
    async fn test_click_roundtrip() {
        let (host, handle) = start();
        let rendered = handle
            .push(Some(br#"{"title":"t","body":"b","data":{"url":"/inbox"}}"#.to_vec()))
            .await
            .expect("push")
            .expect("rendered");

        let opened = handle.click(rendered).await.expect("click");
        assert_eq!(opened.as_deref(), Some("https://app.example.com/inbox"));
        assert_eq!(host.opened_windows().len(), 1);
    }

    #[tokio::test]
    async fn test_terminated_agent_rejects_events() {
        let (_host, handle) = start();
        handle.ready().await.expect("ready");
        handle.terminate();
        tokio::task::yield_now().await;

        // Aborting is asynchronous; poll until the receiver is gone.
        for _ in 0..100 {
            if !handle.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_running());
        assert!(handle.push(None).await.is_err());
        // Posting to a stopped agent is silently dropped.
        handle.post_message(AgentMessage::Unknown);
    }
}
