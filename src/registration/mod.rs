//! Device registration client.
//!
//! Ties a push subscription to the signed-in user by registering its
//! endpoint with the device registry, at most once per endpoint.
//!
//! # Architecture
//!
//! ```text
//! register_device(handle)
//!     │
//!     ├─ cache hit (status = registered) ──────────► Cached
//!     ├─ no session token ─────────────────────────► Skipped
//!     └─ RegistryBackend::register (bounded)
//!            ├─ accepted ─► cache.record_success ──► Registered
//!            └─ error / refused / timeout ─────────► RegistrationFailed
//! ```
//!
//! The cache is written only after the registry accepted, so a failure
//! leaves the next session free to try again. [`DeviceRegistrationClient::refresh_device`]
//! bypasses the cache read for a forced re-registration.

pub mod backend;
pub mod cache;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::constants::HTTP_REQUEST_TIMEOUT;
use crate::error::PushError;
use crate::notifications::PushSubscriptionHandle;

pub use backend::{
    DeviceRegistrationRequest, HttpRegistryBackend, RegistrationResponse, RegistryBackend,
};
pub use cache::{CacheEntry, CachedStatus, RegistrationCache};

/// Outcome of a successful registration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// The registry accepted the endpoint just now.
    Registered,
    /// The endpoint was already registered; no network call was made.
    Cached,
    /// No session token; nothing was attempted.
    Skipped,
}

impl RegistrationStatus {
    /// Wire form: `registered`, `cached` or `skipped`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Cached => "cached",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the current session's auth token.
///
/// Read on every call, so signing in or out between calls is observed.
pub trait TokenProvider: Send + Sync {
    /// The bearer token, or `None` when anonymous.
    fn token(&self) -> Option<String>;
}

impl TokenProvider for Option<String> {
    fn token(&self) -> Option<String> {
        self.clone().filter(|t| !t.is_empty())
    }
}

impl TokenProvider for Mutex<Option<String>> {
    fn token(&self) -> Option<String> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }
}

/// Registers subscription endpoints with the device registry.
pub struct DeviceRegistrationClient<B: RegistryBackend> {
    backend: B,
    tokens: Arc<dyn TokenProvider>,
    cache: Mutex<RegistrationCache>,
    timeout: Duration,
}

impl<B: RegistryBackend + fmt::Debug> fmt::Debug for DeviceRegistrationClient<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistrationClient")
            .field("backend", &self.backend)
            .field("has_token", &self.tokens.token().is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<B: RegistryBackend> DeviceRegistrationClient<B> {
    /// Create a client over `backend`, caching into `cache`.
    pub fn new(backend: B, tokens: Arc<dyn TokenProvider>, cache: RegistrationCache) -> Self {
        Self {
            backend,
            tokens,
            cache: Mutex::new(cache),
            timeout: HTTP_REQUEST_TIMEOUT,
        }
    }

    /// Bound on a single registry call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `endpoint` is recorded as registered.
    pub fn is_cached(&self, endpoint: &str) -> bool {
        self.lock_cache().is_registered(endpoint)
    }

    /// Register `handle` unless its endpoint is already cached.
    pub async fn register_device(
        &self,
        handle: &PushSubscriptionHandle,
    ) -> Result<RegistrationStatus, PushError> {
        self.reconcile(handle, false).await
    }

    /// Register `handle` even if its endpoint is cached.
    pub async fn refresh_device(
        &self,
        handle: &PushSubscriptionHandle,
    ) -> Result<RegistrationStatus, PushError> {
        self.reconcile(handle, true).await
    }

    async fn reconcile(
        &self,
        handle: &PushSubscriptionHandle,
        force: bool,
    ) -> Result<RegistrationStatus, PushError> {
        if !force && self.is_cached(&handle.endpoint) {
            log::debug!(
                "[Registration] Endpoint ...{} already registered",
                handle.endpoint_for_log()
            );
            return Ok(RegistrationStatus::Cached);
        }

        let Some(token) = self.tokens.token() else {
            log::info!("[Registration] No session token, skipping device registration");
            return Ok(RegistrationStatus::Skipped);
        };

        let request = DeviceRegistrationRequest::from(handle);
        let response =
            match tokio::time::timeout(self.timeout, self.backend.register(&request, &token)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    log::warn!("[Registration] Registry call failed: {e:#}");
                    return Err(PushError::RegistrationFailed(format!("{e:#}")));
                }
                Err(_) => {
                    log::warn!("[Registration] Registry call timed out after {:?}", self.timeout);
                    return Err(PushError::RegistrationFailed(format!(
                        "device registry did not answer within {:?}",
                        self.timeout
                    )));
                }
            };

        if !response.accepted {
            let reason = response
                .reason
                .unwrap_or_else(|| "rejected by device registry".to_string());
            log::warn!("[Registration] Registry refused endpoint: {reason}");
            return Err(PushError::RegistrationFailed(reason));
        }

        // The registry has the endpoint; a cache write failure only costs a
        // redundant call next session.
        if let Err(e) = self.remember(&handle.endpoint) {
            log::warn!("[Registration] Failed to persist registration cache: {e:#}");
        }
        log::info!(
            "[Registration] Registered endpoint ...{}",
            handle.endpoint_for_log()
        );
        Ok(RegistrationStatus::Registered)
    }

    fn remember(&self, endpoint: &str) -> anyhow::Result<()> {
        self.lock_cache().record_success(endpoint)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, RegistrationCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
