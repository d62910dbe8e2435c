//! Registration cache: endpoints the device registry already accepted.
//!
//! The cache only short-circuits redundant registration calls; the backend
//! record stays the source of truth. Two rules keep it honest:
//!
//! - entries are written only after the registry accepted the endpoint
//! - only entries with a `registered` status are trusted on read
//!
//! The file is read-then-written without locking. Two processes racing on
//! it can at worst lose an entry, which costs one extra registration call.
//!
//! # Storage structure
//!
//! ```text
//! {config_dir}/registration_cache.json
//!     { "entries": { "<endpoint>": { "status": "registered", "registered_at": "..." } } }
//! ```

use std::collections::BTreeMap;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status stored for a cached endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachedStatus {
    /// The registry accepted this endpoint.
    Registered,
    /// Anything else found on disk; never trusted.
    #[serde(other)]
    Unknown,
}

/// One cached endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Outcome of the registration that wrote this entry.
    pub status: CachedStatus,
    /// When the registry accepted the endpoint.
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// Endpoint → last known registration status, optionally backed by a file.
#[derive(Debug, Default)]
pub struct RegistrationCache {
    entries: BTreeMap<String, CacheEntry>,
    path: Option<PathBuf>,
}

impl RegistrationCache {
    /// Cache that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache persisted at `path`.
    ///
    /// A missing file is an empty cache. So is a corrupt one: the cache is
    /// advisory, and dropping it only costs one registration call.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("[Registration] Ignoring unreadable cache: {e:#}");
                BTreeMap::new()
            }
        };
        Self {
            entries,
            path: Some(path),
        }
    }

    /// Whether `endpoint` was accepted by a previous successful registration.
    pub fn is_registered(&self, endpoint: &str) -> bool {
        self.entries
            .get(endpoint)
            .is_some_and(|entry| entry.status == CachedStatus::Registered)
    }

    /// Record that the registry accepted `endpoint`.
    ///
    /// Entries for other endpoints are dropped: a new endpoint means the
    /// subscription was renewed and the old one is dead.
    pub fn record_success(&mut self, endpoint: &str) -> Result<()> {
        let before = self.entries.len();
        self.entries.retain(|key, _| key == endpoint);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            log::info!("[Registration] Pruned {pruned} superseded endpoint(s) from cache");
        }

        self.entries.insert(
            endpoint.to_string(),
            CacheEntry {
                status: CachedStatus::Registered,
                registered_at: Utc::now(),
            },
        );
        self.save()
    }

    /// Drop the entry for `endpoint`. Returns whether one existed.
    pub fn forget(&mut self, endpoint: &str) -> Result<bool> {
        let existed = self.entries.remove(endpoint).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Drop every entry.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    /// All entries, ordered by endpoint.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }

        let file = CacheFile {
            entries: self.entries.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, CacheEntry>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file: CacheFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(file.entries)
}
