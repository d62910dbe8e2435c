//! Device registry backend.
//!
//! `POST {server_url}/api/push/devices` with the session's bearer token and
//! `{ endpoint, keys: { p256dh, auth } }`. The registry answers
//! `{ "accepted": bool, "reason"?: string }`; a 2xx with an empty body counts
//! as accepted.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::DEVICE_REGISTRY_PATH;
use crate::notifications::{PushSubscriptionHandle, SubscriptionKeys};

/// Body of a registration call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceRegistrationRequest {
    /// Subscription endpoint (the registry key).
    pub endpoint: String,
    /// Subscription key material.
    pub keys: SubscriptionKeys,
}

impl From<&PushSubscriptionHandle> for DeviceRegistrationRequest {
    fn from(handle: &PushSubscriptionHandle) -> Self {
        Self {
            endpoint: handle.endpoint.clone(),
            keys: handle.keys.clone(),
        }
    }
}

/// Registry verdict.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RegistrationResponse {
    /// Whether the registry stored the endpoint.
    #[serde(default = "accepted_by_default")]
    pub accepted: bool,
    /// Why the registry refused, if it did.
    #[serde(default)]
    pub reason: Option<String>,
}

fn accepted_by_default() -> bool {
    true
}

impl RegistrationResponse {
    /// An accepting response.
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    /// A refusing response with `reason`.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Where registration calls go.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Register `request` on behalf of the holder of `token`.
    ///
    /// `Err` means the call itself failed (transport, non-2xx, bad body);
    /// a refusal is an `Ok` response with `accepted: false`.
    async fn register(
        &self,
        request: &DeviceRegistrationRequest,
        token: &str,
    ) -> Result<RegistrationResponse>;
}

#[async_trait]
impl<T: RegistryBackend + ?Sized> RegistryBackend for std::sync::Arc<T> {
    async fn register(
        &self,
        request: &DeviceRegistrationRequest,
        token: &str,
    ) -> Result<RegistrationResponse> {
        (**self).register(request, token).await
    }
}

/// Registry reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistryBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistryBackend {
    /// Backend for the server at `server_url`, with a per-request timeout.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, server_url))
    }

    /// Backend sharing an existing client (connection pooling).
    pub fn with_client(client: reqwest::Client, server_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", server_url.trim_end_matches('/'), DEVICE_REGISTRY_PATH),
        }
    }

    /// Full registry URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RegistryBackend for HttpRegistryBackend {
    async fn register(
        &self,
        request: &DeviceRegistrationRequest,
        token: &str,
    ) -> Result<RegistrationResponse> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .context("Device registry request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Device registry returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            );
        }

        // A body that fails to arrive is not an empty body.
        let body = response
            .text()
            .await
            .context("Failed to read device registry response")?;
        if body.trim().is_empty() {
            return Ok(RegistrationResponse::accepted());
        }

        serde_json::from_str(&body).context("Invalid device registry response")
    }
}
