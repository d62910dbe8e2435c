//! In-process platform host.
//!
//! `LocalPlatform` plays the role a browser plays for a web app: it hosts the
//! notification agent on a tokio task, tracks notification permission, mints
//! push subscriptions, and wakes the agent for push deliveries and clicks.
//!
//! # Cold starts
//!
//! [`LocalPlatform::terminate_agent`] drops the running agent the way a host
//! suspends an idle background worker. The next registration, push or click
//! starts a fresh agent whose config is back at its defaults.
//!
//! # Durable subscription
//!
//! With [`LocalPlatform::with_subscription_file`] the current subscription is
//! written to disk, so later processes reuse the same endpoint just like a
//! browser profile does across page loads.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use chrono::{DateTime, Utc};
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use reqwest::Url;

use super::{AgentRegistration, Permission, PushPlatform};
use crate::agent::{
    self, AgentHandle, AgentMessage, NotificationAgent, NotificationHost, RenderedNotification,
};
use crate::constants::LOCAL_PUSH_SERVICE_URL;
use crate::notifications::{PushSubscriptionHandle, SubscriptionKeys};

/// Length of the subscription auth secret in bytes.
const AUTH_SECRET_LEN: usize = 16;

/// Platform host running the agent in-process.
pub struct LocalPlatform<H: NotificationHost> {
    host: Arc<H>,
    scope: Url,
    permission: Mutex<Permission>,
    prompt_answer: Permission,
    agent: Mutex<Option<AgentHandle>>,
    subscription: Mutex<Option<PushSubscriptionHandle>>,
    subscription_path: Option<PathBuf>,
    push_service_url: String,
    subscribe_failure: Mutex<Option<String>>,
    subscribe_calls: AtomicUsize,
    agents_started: AtomicUsize,
}

impl<H: NotificationHost> std::fmt::Debug for LocalPlatform<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPlatform")
            .field("scope", &self.scope.as_str())
            .field("permission", &self.permission())
            .field("subscription_path", &self.subscription_path)
            .field("agents_started", &self.agents_started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<H: NotificationHost> LocalPlatform<H> {
    /// Create a platform for the app at `scope`.
    ///
    /// Permission starts undecided and the simulated user grants it when
    /// prompted.
    pub fn new(host: Arc<H>, scope: Url) -> Self {
        Self {
            host,
            scope,
            permission: Mutex::new(Permission::Default),
            prompt_answer: Permission::Granted,
            agent: Mutex::new(None),
            subscription: Mutex::new(None),
            subscription_path: None,
            push_service_url: LOCAL_PUSH_SERVICE_URL.to_string(),
            subscribe_failure: Mutex::new(None),
            subscribe_calls: AtomicUsize::new(0),
            agents_started: AtomicUsize::new(0),
        }
    }

    /// Start with an already-decided permission.
    pub fn with_permission(self, permission: Permission) -> Self {
        *lock(&self.permission) = permission;
        self
    }

    /// What the user answers when prompted.
    pub fn with_prompt_answer(mut self, answer: Permission) -> Self {
        self.prompt_answer = answer;
        self
    }

    /// Persist the subscription at `path`, loading any subscription already
    /// stored there. An unreadable file is treated as no subscription.
    pub fn with_subscription_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match load_subscription(&path) {
            Ok(existing) => *lock(&self.subscription) = existing,
            Err(e) => log::warn!("[Platform] Ignoring unreadable subscription file: {e:#}"),
        }
        self.subscription_path = Some(path);
        self
    }

    /// Whether the scope qualifies as a secure context (https or loopback).
    pub fn is_secure_context(&self) -> bool {
        match self.scope.scheme() {
            "https" => true,
            "http" => matches!(
                self.scope.host_str(),
                Some("localhost" | "127.0.0.1" | "[::1]")
            ),
            _ => false,
        }
    }

    /// The running agent, if there is one.
    pub fn agent(&self) -> Option<AgentHandle> {
        lock(&self.agent).clone().filter(AgentHandle::is_running)
    }

    /// How many agent instances this platform has started.
    pub fn agents_started(&self) -> usize {
        self.agents_started.load(Ordering::SeqCst)
    }

    /// How many times [`PushPlatform::subscribe`] produced a subscription.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent subscribe calls fail with `reason` (or succeed again).
    pub fn set_subscribe_failure(&self, reason: Option<String>) {
        *lock(&self.subscribe_failure) = reason;
    }

    /// Suspend the agent; its in-memory state is lost.
    pub fn terminate_agent(&self) {
        if let Some(handle) = lock(&self.agent).take() {
            log::info!("[Platform] Terminating agent");
            handle.terminate();
        }
    }

    /// Revoke the current subscription, as a push service or user would.
    pub fn revoke_subscription(&self) -> Result<()> {
        *lock(&self.subscription) = None;
        if let Some(ref path) = self.subscription_path {
            if path.exists() {
                fs::remove_file(path).context("Failed to remove subscription file")?;
            }
        }
        Ok(())
    }

    /// Set the current subscription's expiration time.
    pub fn set_subscription_expiry(&self, at: Option<DateTime<Utc>>) -> Result<()> {
        let updated = {
            let mut guard = lock(&self.subscription);
            let Some(subscription) = guard.as_mut() else {
                return Ok(());
            };
            subscription.expiration_time = at;
            subscription.clone()
        };
        self.persist(&updated)
    }

    /// Deliver a push message, waking the agent if needed, and wait until it
    /// has been handled.
    pub async fn deliver_push(
        &self,
        data: Option<Vec<u8>>,
    ) -> Result<Option<RenderedNotification>> {
        let (handle, _) = self.ensure_agent();
        handle.push(data).await
    }

    /// Report a click on `notification`, waking the agent if needed.
    pub async fn click(&self, notification: RenderedNotification) -> Result<Option<String>> {
        let (handle, _) = self.ensure_agent();
        handle.click(notification).await
    }

    fn ensure_agent(&self) -> (AgentHandle, bool) {
        let mut slot = lock(&self.agent);
        if let Some(handle) = slot.as_ref().filter(|h| h.is_running()) {
            return (handle.clone(), false);
        }

        let handle = agent::runtime::spawn(NotificationAgent::new(
            Arc::clone(&self.host),
            self.scope.clone(),
        ));
        self.agents_started.fetch_add(1, Ordering::SeqCst);
        log::info!("[Platform] Started notification agent for {}", self.scope);
        *slot = Some(handle.clone());
        (handle, true)
    }

    fn persist(&self, subscription: &PushSubscriptionHandle) -> Result<()> {
        let Some(ref path) = self.subscription_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create subscription directory")?;
        }
        fs::write(path, serde_json::to_string_pretty(subscription)?)
            .context("Failed to write subscription file")?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    fn mint_subscription(&self) -> PushSubscriptionHandle {
        let secret = p256::SecretKey::random(&mut OsRng);
        let p256dh = BASE64URL.encode(secret.public_key().to_encoded_point(false).as_bytes());

        let mut auth = [0u8; AUTH_SECRET_LEN];
        OsRng.fill_bytes(&mut auth);

        PushSubscriptionHandle {
            endpoint: format!("{}/{}", self.push_service_url, uuid::Uuid::new_v4().simple()),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh,
                auth: BASE64URL.encode(auth),
            },
        }
    }
}

#[async_trait]
impl<H: NotificationHost> PushPlatform for LocalPlatform<H> {
    async fn register_agent(&self) -> Result<AgentRegistration> {
        anyhow::ensure!(
            self.is_secure_context(),
            "Notification agents require a secure context, {} is not one",
            self.scope
        );

        let (handle, freshly_started) = self.ensure_agent();
        handle.ready().await?;

        Ok(AgentRegistration {
            scope: self.scope.to_string(),
            freshly_started,
        })
    }

    async fn existing_subscription(&self) -> Result<Option<PushSubscriptionHandle>> {
        Ok(lock(&self.subscription).clone())
    }

    fn permission(&self) -> Permission {
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> Permission {
        let mut permission = lock(&self.permission);
        if *permission == Permission::Default {
            log::info!("[Platform] Prompting for notification permission");
            *permission = self.prompt_answer;
        }
        *permission
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> Result<PushSubscriptionHandle> {
        anyhow::ensure!(
            self.permission() == Permission::Granted,
            "Notification permission has not been granted"
        );
        anyhow::ensure!(
            application_server_key.len() == 65 && application_server_key[0] == 0x04,
            "applicationServerKey must be an uncompressed P-256 point"
        );
        if let Some(reason) = lock(&self.subscribe_failure).clone() {
            anyhow::bail!("Push service error: {reason}");
        }

        let subscription = self.mint_subscription();
        self.persist(&subscription)?;
        *lock(&self.subscription) = Some(subscription.clone());
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        log::info!(
            "[Platform] Created push subscription ...{}",
            subscription.endpoint_for_log()
        );
        Ok(subscription)
    }

    fn post_message(&self, message: AgentMessage) {
        match self.agent() {
            Some(handle) => handle.post_message(message),
            None => log::debug!("[Platform] No running agent, message dropped"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_subscription(path: &Path) -> Result<Option<PushSubscriptionHandle>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let subscription = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(subscription))
}
