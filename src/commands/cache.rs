//! Registration cache maintenance.

use anyhow::Result;

use crate::registration::RegistrationCache;
use crate::Config;

/// Print every cached endpoint.
pub fn show(config: &Config) -> Result<()> {
    let cache = RegistrationCache::open(config.registration_cache_path()?);
    if cache.is_empty() {
        println!("Registration cache is empty");
        return Ok(());
    }
    for (endpoint, entry) in cache.entries() {
        println!(
            "{endpoint}  {:?}  {}",
            entry.status,
            entry.registered_at.to_rfc3339()
        );
    }
    Ok(())
}

/// Drop the entry for one endpoint so its next session registers again.
///
/// Returns whether an entry existed.
pub fn forget(config: &Config, endpoint: &str) -> Result<bool> {
    let mut cache = RegistrationCache::open(config.registration_cache_path()?);
    let existed = cache.forget(endpoint)?;
    if existed {
        println!("Forgot {endpoint}");
    } else {
        println!("{endpoint} was not cached");
    }
    Ok(existed)
}

/// Drop every cached endpoint. The next session registers again.
pub fn clear(config: &Config) -> Result<()> {
    let mut cache = RegistrationCache::open(config.registration_cache_path()?);
    let count = cache.len();
    cache.clear()?;
    println!("Cleared {count} cached registration(s)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forget_removes_cached_endpoint() {
        let config = Config::default();
        let path = config.registration_cache_path().expect("cache path");
        let endpoint = "https://push.example.com/forget-me";
        RegistrationCache::open(&path)
            .record_success(endpoint)
            .expect("record");

        assert!(forget(&config, endpoint).expect("forget"));
        assert!(!RegistrationCache::open(&path).is_registered(endpoint));
        assert!(!forget(&config, endpoint).expect("forget again"));
    }
}
