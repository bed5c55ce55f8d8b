use super::*;
use cg_core::CACHE_TTL;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Timestamped on-disk envelope, one file per source.
#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope {
    timestamp: u64,
    listings: Vec<Listing>,
}

/// Best-effort disk cache of the last good scrape per source.
///
/// Lets a restarted process come up serving immediately instead of
/// waiting minutes on a synchronous scrape. Writes happen after the
/// in-memory swap and are never allowed to fail the refresh.
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
    /// Cache directory from `CACHE_DIR`, defaulting to `cache/`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("CACHE_DIR").unwrap_or_else(|_| "cache".into()))
    }
    fn path(&self, source: Source) -> PathBuf {
        self.dir.join(format!("{}.json", source))
    }

    /// Loads the cached batch for a source if present and unexpired.
    pub fn load(&self, source: Source) -> Option<Vec<Listing>> {
        let path = self.path(source);
        let raw = std::fs::read_to_string(&path).ok()?;
        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("[cache] unreadable {}: {}", path.display(), e);
                return None;
            }
        };
        let written = UNIX_EPOCH + std::time::Duration::from_secs(envelope.timestamp);
        let age = SystemTime::now().duration_since(written).unwrap_or_default();
        if age > CACHE_TTL {
            log::info!("[cache] {} snapshot expired ({}h old)", source, age.as_secs() / 3600);
            return None;
        }
        log::info!(
            "[cache] loaded {} {} listings ({}h old)",
            envelope.listings.len(),
            source,
            age.as_secs() / 3600
        );
        Some(envelope.listings)
    }

    /// Persists a batch for a source. Failures are logged and swallowed.
    pub fn store(&self, source: Source, listings: &[Listing]) {
        let envelope = Envelope {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            listings: listings.to_vec(),
        };
        let path = self.path(source);
        let write = std::fs::create_dir_all(&self.dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| serde_json::to_string(&envelope).map_err(anyhow::Error::from))
            .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));
        match write {
            Ok(()) => log::debug!("[cache] wrote {} listings to {}", listings.len(), path.display()),
            Err(e) => log::warn!("[cache] write to {} failed: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(tag: &str) -> Cache {
        let dir = std::env::temp_dir().join(format!("cg-cache-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Cache::new(dir)
    }

    #[tokio::test]
    async fn store_then_load_roundtrips() {
        let cache = scratch("roundtrip");
        let batch = MockScraper::new(Source::Dealer).fetch(8).await.unwrap();
        cache.store(Source::Dealer, &batch);
        let loaded = cache.load(Source::Dealer).unwrap();
        assert_eq!(loaded, batch);
    }

    #[test]
    fn missing_file_is_a_clean_miss() {
        let cache = scratch("miss");
        assert!(cache.load(Source::Auction).is_none());
    }

    #[tokio::test]
    async fn expired_envelope_is_ignored() {
        let cache = scratch("expired");
        let batch = MockScraper::new(Source::Auction).fetch(4).await.unwrap();
        let stale = Envelope {
            timestamp: 0,
            listings: batch,
        };
        std::fs::create_dir_all(&cache.dir).unwrap();
        std::fs::write(cache.path(Source::Auction), serde_json::to_string(&stale).unwrap()).unwrap();
        assert!(cache.load(Source::Auction).is_none());
    }

    #[test]
    fn corrupt_envelope_is_ignored() {
        let cache = scratch("corrupt");
        std::fs::create_dir_all(&cache.dir).unwrap();
        std::fs::write(cache.path(Source::Dealer), "not json").unwrap();
        assert!(cache.load(Source::Dealer).is_none());
    }
}
