use super::*;
use cg_core::SENTINEL_PRICE;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Reasons a corpus read can fail.
#[derive(Debug, Clone)]
pub enum CorpusError {
    NoListings(Source),
    Insufficient {
        source: Source,
        have: usize,
        want: usize,
    },
}

impl std::fmt::Display for CorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoListings(source) => write!(f, "no {} listings available", source),
            Self::Insufficient { source, have, want } => {
                write!(f, "only {} {} listings, need {}", have, source, want)
            }
        }
    }
}

impl std::error::Error for CorpusError {}

/// One immutable published snapshot of a source's listings.
#[derive(Debug)]
pub struct Shelf {
    listings: HashMap<String, Listing>,
    refreshed: SystemTime,
}

impl Shelf {
    fn empty() -> Self {
        Self {
            listings: HashMap::new(),
            refreshed: SystemTime::UNIX_EPOCH,
        }
    }
    pub fn size(&self) -> usize {
        self.listings.len()
    }
    pub fn refreshed(&self) -> SystemTime {
        self.refreshed
    }
    pub fn all(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }
}

/// Per-source snapshot summary for the admin surface.
#[derive(Debug, Clone, Copy)]
pub struct ShelfStatus {
    pub size: usize,
    pub refreshed: SystemTime,
}

/// In-memory keyed store of listings, one shelf per source.
///
/// Reads clone the shelf `Arc` under a briefly-held read lock and then
/// operate lock-free on the snapshot. [`Corpus::install`] builds the
/// replacement map before taking the write lock, so the lock is held
/// only for the pointer swap and readers never observe a half-built
/// shelf.
pub struct Corpus {
    auction: RwLock<Arc<Shelf>>,
    dealer: RwLock<Arc<Shelf>>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self {
            auction: RwLock::new(Arc::new(Shelf::empty())),
            dealer: RwLock::new(Arc::new(Shelf::empty())),
        }
    }
}

impl Corpus {
    fn rack(&self, source: Source) -> &RwLock<Arc<Shelf>> {
        match source {
            Source::Auction => &self.auction,
            Source::Dealer => &self.dealer,
        }
    }
    /// Current published snapshot for a source.
    pub async fn shelf(&self, source: Source) -> Arc<Shelf> {
        self.rack(source).read().await.clone()
    }

    /// Uniformly random listing for the difficulty's source.
    pub async fn random(&self, difficulty: Difficulty) -> Result<Listing, CorpusError> {
        use rand::seq::IteratorRandom;
        let source = difficulty.source();
        let shelf = self.shelf(source).await;
        shelf
            .listings
            .values()
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(CorpusError::NoListings(source))
    }

    /// Point lookup by listing id.
    pub async fn get(&self, difficulty: Difficulty, id: &str) -> Option<Listing> {
        self.shelf(difficulty.source())
            .await
            .listings
            .get(id)
            .cloned()
    }

    /// `k` distinct uniformly-sampled listings.
    pub async fn sample(&self, difficulty: Difficulty, k: usize) -> Result<Vec<Listing>, CorpusError> {
        use rand::seq::IteratorRandom;
        let source = difficulty.source();
        let shelf = self.shelf(source).await;
        if shelf.size() < k {
            return Err(CorpusError::Insufficient {
                source,
                have: shelf.size(),
                want: k,
            });
        }
        Ok(shelf
            .listings
            .values()
            .choose_multiple(&mut rand::rng(), k)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Filters and publishes a freshly-scraped batch, replacing the
    /// current shelf. Returns how many listings survived the filter.
    ///
    /// Listings priced at the £700 sentinel (or non-positively) are
    /// dropped here, so the invariant holds for every source including
    /// the mock.
    pub async fn install(&self, source: Source, listings: Vec<Listing>) -> usize {
        let total = listings.len();
        let kept: HashMap<String, Listing> = listings
            .into_iter()
            .filter(|l| l.price() > 0 && l.price() != SENTINEL_PRICE)
            .map(|l| (l.id().to_string(), l))
            .collect();
        let size = kept.len();
        if size < total {
            log::debug!(
                "[corpus] dropped {} unpriced {} listings on ingest",
                total - size,
                source
            );
        }
        let shelf = Arc::new(Shelf {
            listings: kept,
            refreshed: SystemTime::now(),
        });
        *self.rack(source).write().await = shelf;
        log::info!("[corpus] published {} {} listings", size, source);
        size
    }

    pub async fn status(&self, source: Source) -> ShelfStatus {
        let shelf = self.shelf(source).await;
        ShelfStatus {
            size: shelf.size(),
            refreshed: shelf.refreshed(),
        }
    }

    /// True when every source has at least one listing to serve.
    pub async fn stocked(&self) -> bool {
        self.shelf(Source::Auction).await.size() > 0 && self.shelf(Source::Dealer).await.size() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stocked(n: usize) -> Corpus {
        let corpus = Corpus::default();
        let batch = MockScraper::new(Source::Auction).fetch(n).await.unwrap();
        corpus.install(Source::Auction, batch).await;
        corpus
    }

    #[tokio::test]
    async fn install_filters_sentinels() {
        let corpus = stocked(64).await;
        let shelf = corpus.shelf(Source::Auction).await;
        assert_eq!(shelf.size(), 60);
        assert!(shelf.all().all(|l| l.price() > 0 && l.price() != SENTINEL_PRICE));
    }

    #[tokio::test]
    async fn random_fails_on_empty_source() {
        let corpus = stocked(16).await;
        assert!(corpus.random(Difficulty::Hard).await.is_ok());
        match corpus.random(Difficulty::Easy).await {
            Err(CorpusError::NoListings(Source::Dealer)) => {}
            other => panic!("expected NoListings, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sample_returns_distinct_listings() {
        let corpus = stocked(64).await;
        let cars = corpus.sample(Difficulty::Hard, 10).await.unwrap();
        let ids: std::collections::HashSet<_> = cars.iter().map(|l| l.id().to_string()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn sample_rejects_oversized_requests() {
        let corpus = stocked(8).await;
        match corpus.sample(Difficulty::Hard, 10).await {
            Err(CorpusError::Insufficient { have, want, .. }) => {
                assert!(have < want);
            }
            other => panic!("expected Insufficient, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn readers_keep_the_old_snapshot_across_a_swap() {
        let corpus = stocked(32).await;
        let before = corpus.shelf(Source::Auction).await;
        let size = before.size();
        let batch = MockScraper::new(Source::Auction).fetch(64).await.unwrap();
        corpus.install(Source::Auction, batch).await;
        assert_eq!(before.size(), size);
        assert_ne!(corpus.shelf(Source::Auction).await.size(), size);
    }

    #[tokio::test]
    async fn point_lookup_roundtrips() {
        let corpus = stocked(32).await;
        let listing = corpus.random(Difficulty::Hard).await.unwrap();
        let found = corpus.get(Difficulty::Hard, listing.id()).await.unwrap();
        assert_eq!(found, listing);
        assert!(corpus.get(Difficulty::Hard, "absent").await.is_none());
    }
}
