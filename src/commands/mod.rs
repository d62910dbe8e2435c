//! CLI subcommand implementations for charter-push.
//!
//! Commands are organized into submodules by domain:
//!
//! - [`session`] - Run a push setup session (subscribe + register)
//! - [`notify`] - Render a push payload and simulate clicks
//! - [`cache`] - Inspect, forget and clear registration cache entries
//! - [`vapid`] - Generate and check VAPID keys
//!
//! # Usage
//!
//! ```ignore
//! use charter_push::{commands, Config};
//!
//! let config = Config::load()?;
//! commands::session::register(&config, false, false).await?;
//! commands::cache::show(&config)?;
//! ```

pub mod cache;
pub mod notify;
pub mod session;
pub mod vapid;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::agent::RecordingHost;
use crate::platform::LocalPlatform;
use crate::Config;

/// Local platform for the configured app origin, with its subscription
/// persisted in the config directory.
pub fn local_platform(config: &Config) -> Result<LocalPlatform<RecordingHost>> {
    let scope = Url::parse(&config.app_origin)
        .with_context(|| format!("Invalid app origin: {}", config.app_origin))?;
    Ok(LocalPlatform::new(Arc::new(RecordingHost::new()), scope)
        .with_subscription_file(config.subscription_path()?))
}
