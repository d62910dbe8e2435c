//! Registration orchestrator: one push setup attempt per session.
//!
//! Runs from the app's root page once the session is known. Never blocks
//! or fails the page: every outcome is a [`SessionOutcome`], and failures
//! become a user-facing advisory string.
//!
//! ```text
//! run_session()            (first call only; later calls replay the outcome)
//!     │
//!     ├─ no token ─────────────────────────────────► Skipped (nothing touched)
//!     ├─ SubscriptionManager::ensure_subscription
//!     └─ DeviceRegistrationClient::register_device
//!            ├─ Ok(status) ───────────────────────► Registered | Cached | Skipped
//!            └─ Err(e) ───────────────────────────► Advisory(e.advisory())
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::PushError;
use crate::platform::PushPlatform;
use crate::registration::{
    DeviceRegistrationClient, RegistrationStatus, RegistryBackend, TokenProvider,
};
use crate::subscription::SubscriptionManager;

/// What one session's push setup ended with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Device newly registered.
    Registered,
    /// Device was already registered.
    Cached,
    /// Anonymous session; nothing attempted.
    Skipped,
    /// Setup failed; show this to the user, non-blocking.
    Advisory(String),
}

impl SessionOutcome {
    /// Short status name.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Cached => "cached",
            Self::Skipped => "skipped",
            Self::Advisory(_) => "advisory",
        }
    }

    /// The advisory message, if setup failed.
    pub fn advisory(&self) -> Option<&str> {
        match self {
            Self::Advisory(message) => Some(message),
            _ => None,
        }
    }
}

impl From<RegistrationStatus> for SessionOutcome {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Registered => Self::Registered,
            RegistrationStatus::Cached => Self::Cached,
            RegistrationStatus::Skipped => Self::Skipped,
        }
    }
}

/// Sequences subscription and registration for a session.
pub struct RegistrationOrchestrator<P: PushPlatform, B: RegistryBackend> {
    tokens: Arc<dyn TokenProvider>,
    subscriptions: SubscriptionManager<P>,
    registration: DeviceRegistrationClient<B>,
    force_refresh: bool,
    outcome: OnceCell<SessionOutcome>,
}

impl<P, B> std::fmt::Debug for RegistrationOrchestrator<P, B>
where
    P: PushPlatform,
    B: RegistryBackend,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationOrchestrator")
            .field("force_refresh", &self.force_refresh)
            .field("outcome", &self.outcome.get())
            .finish_non_exhaustive()
    }
}

impl<P: PushPlatform, B: RegistryBackend> RegistrationOrchestrator<P, B> {
    /// Create an orchestrator. `tokens` should be the same provider the
    /// registration client reads.
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        subscriptions: SubscriptionManager<P>,
        registration: DeviceRegistrationClient<B>,
    ) -> Self {
        Self {
            tokens,
            subscriptions,
            registration,
            force_refresh: false,
            outcome: OnceCell::new(),
        }
    }

    /// Re-register even when the endpoint is cached.
    pub fn with_forced_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// The registration client.
    pub fn registration(&self) -> &DeviceRegistrationClient<B> {
        &self.registration
    }

    /// Outcome of this session, if it already ran.
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.get()
    }

    /// Run push setup for this session. Concurrent and repeated calls share
    /// the first run's outcome.
    pub async fn run_session(&self) -> SessionOutcome {
        self.outcome.get_or_init(|| self.run_once()).await.clone()
    }

    async fn run_once(&self) -> SessionOutcome {
        if self.tokens.token().is_none() {
            log::info!("[Session] Anonymous session, push setup not attempted");
            return SessionOutcome::Skipped;
        }

        match self.provision().await {
            Ok(status) => {
                log::info!("[Session] Push setup finished: {status}");
                status.into()
            }
            Err(e) => {
                log::warn!(
                    "[Session] Push setup failed (retryable={}): {e}",
                    e.is_retryable()
                );
                SessionOutcome::Advisory(e.advisory())
            }
        }
    }

    async fn provision(&self) -> Result<RegistrationStatus, PushError> {
        let handle = self.subscriptions.ensure_subscription().await?;
        if self.force_refresh {
            self.registration.refresh_device(&handle).await
        } else {
            self.registration.register_device(&handle).await
        }
    }
}
