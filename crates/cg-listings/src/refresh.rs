use super::*;
use cg_core::REFRESH_COOLDOWN;
use cg_core::REFRESH_PERIOD;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::watch;

/// Listings requested from a scraper per refresh.
pub const SCRAPE_BATCH: usize = 250;
/// Mock listings generated when every other seed path fails.
pub const FALLBACK_BATCH: usize = 48;

/// Returned when a manual refresh lands inside the global cooldown.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    pub retry_after: Duration,
}

impl std::fmt::Display for Cooldown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "refresh on cooldown for {}s", self.retry_after.as_secs())
    }
}

impl std::error::Error for Cooldown {}

/// Periodic non-blocking corpus refresh.
///
/// One ticker per source. Each tick runs scrape → filter → build →
/// swap → persist; the corpus write lock is only held for the swap, so
/// gameplay reads never wait on a scrape. Scrape failures leave the
/// old shelf serving.
pub struct Scheduler {
    corpus: Arc<Corpus>,
    cache: Cache,
    scrapers: Vec<Arc<dyn Scraper>>,
    stop: watch::Sender<bool>,
    last_manual: Mutex<Option<Instant>>,
}

impl Scheduler {
    pub fn new(corpus: Arc<Corpus>, cache: Cache, scrapers: Vec<Arc<dyn Scraper>>) -> Arc<Self> {
        let (stop, _) = watch::channel(false);
        Arc::new(Self {
            corpus,
            cache,
            scrapers,
            stop,
            last_manual: Mutex::new(None),
        })
    }
    fn scraper(&self, source: Source) -> Option<Arc<dyn Scraper>> {
        self.scrapers.iter().find(|s| s.source() == source).cloned()
    }

    /// Fills each shelf at boot: fresh disk cache first, then a
    /// synchronous scrape, then mock listings so service is never empty.
    pub async fn seed(&self) {
        for scraper in &self.scrapers {
            let source = scraper.source();
            if let Some(batch) = self.cache.load(source) {
                self.corpus.install(source, batch).await;
                continue;
            }
            match self.refresh(source).await {
                Ok(kept) => log::info!("[scheduler] seeded {} with {} scraped listings", source, kept),
                Err(e) => {
                    log::error!("[scheduler] seed scrape for {} failed: {}", source, e);
                    match MockScraper::new(source).fetch(FALLBACK_BATCH).await {
                        Ok(batch) => {
                            let kept = self.corpus.install(source, batch).await;
                            log::warn!("[scheduler] {} running on {} mock listings", source, kept);
                        }
                        Err(e) => log::error!("[scheduler] mock fallback failed: {}", e),
                    }
                }
            }
        }
    }

    /// Spawns the background tickers. Call once at boot, after [`seed`].
    ///
    /// [`seed`]: Scheduler::seed
    pub fn start(self: &Arc<Self>) {
        for scraper in &self.scrapers {
            let source = scraper.source();
            let scheduler = self.clone();
            let mut stop = self.stop.subscribe();
            tokio::spawn(async move {
                let first = tokio::time::Instant::now() + REFRESH_PERIOD;
                let mut ticker = tokio::time::interval_at(first, REFRESH_PERIOD);
                loop {
                    tokio::select! {
                        _ = stop.changed() => {
                            log::info!("[scheduler] {} ticker stopped", source);
                            break;
                        }
                        _ = ticker.tick() => {
                            if let Err(e) = scheduler.refresh(source).await {
                                log::error!("[scheduler] {} refresh failed: {}", source, e);
                            }
                        }
                    }
                }
            });
        }
        log::info!("[scheduler] started {} refresh tickers", self.scrapers.len());
    }

    /// Signals every ticker to wind down. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// One full refresh pipeline for a source.
    pub async fn refresh(&self, source: Source) -> anyhow::Result<usize> {
        let scraper = self
            .scraper(source)
            .ok_or_else(|| anyhow::anyhow!("no scraper registered for {}", source))?;
        let started = Instant::now();
        let batch = scraper.fetch(SCRAPE_BATCH).await?;
        log::info!(
            "[scheduler] scraped {} {} listings in {}s",
            batch.len(),
            source,
            started.elapsed().as_secs()
        );
        let kept = self.corpus.install(source, batch.clone()).await;
        self.cache.store(source, &batch);
        Ok(kept)
    }

    /// One-shot scraper probe for the admin surface: fetches a small
    /// batch without touching the corpus or the cache.
    pub async fn probe(&self, source: Source, n: usize) -> anyhow::Result<Vec<Listing>> {
        let scraper = self
            .scraper(source)
            .ok_or_else(|| anyhow::anyhow!("no scraper registered for {}", source))?;
        scraper.fetch(n).await
    }

    /// Manual refresh for the admin surface. Enqueues the pipeline on a
    /// background task and returns immediately; a global cooldown
    /// answers `Err(Cooldown)` when triggered again too soon.
    pub fn trigger(self: &Arc<Self>, source: Option<Source>) -> Result<(), Cooldown> {
        let mut last = self.last_manual.lock().expect("cooldown lock");
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < REFRESH_COOLDOWN {
                return Err(Cooldown {
                    retry_after: REFRESH_COOLDOWN - elapsed,
                });
            }
        }
        *last = Some(Instant::now());
        drop(last);
        let sources: Vec<Source> = match source {
            Some(one) => vec![one],
            None => self.scrapers.iter().map(|s| s.source()).collect(),
        };
        for source in sources {
            let scheduler = self.clone();
            tokio::spawn(async move {
                match scheduler.refresh(source).await {
                    Ok(kept) => log::info!("[scheduler] manual {} refresh kept {}", source, kept),
                    Err(e) => log::error!("[scheduler] manual {} refresh failed: {}", source, e),
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken(Source);

    #[async_trait::async_trait]
    impl Scraper for Broken {
        fn source(&self) -> Source {
            self.0
        }
        async fn fetch(&self, _: usize) -> anyhow::Result<Vec<Listing>> {
            anyhow::bail!("browser crashed")
        }
    }

    fn scratch(tag: &str) -> Cache {
        let dir = std::env::temp_dir().join(format!("cg-sched-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Cache::new(dir)
    }

    fn mocked(cache: Cache) -> (Arc<Corpus>, Arc<Scheduler>) {
        let corpus = Arc::new(Corpus::default());
        let scrapers: Vec<Arc<dyn Scraper>> = vec![
            Arc::new(MockScraper::new(Source::Auction)),
            Arc::new(MockScraper::new(Source::Dealer)),
        ];
        let scheduler = Scheduler::new(corpus.clone(), cache, scrapers);
        (corpus, scheduler)
    }

    #[tokio::test]
    async fn refresh_publishes_filtered_batch() {
        let (corpus, scheduler) = mocked(scratch("publish"));
        let kept = scheduler.refresh(Source::Auction).await.unwrap();
        assert!(kept > 0);
        assert_eq!(corpus.status(Source::Auction).await.size, kept);
    }

    #[tokio::test]
    async fn seed_falls_back_to_mock_listings() {
        let corpus = Arc::new(Corpus::default());
        let scrapers: Vec<Arc<dyn Scraper>> = vec![Arc::new(Broken(Source::Auction))];
        let scheduler = Scheduler::new(corpus.clone(), scratch("fallback"), scrapers);
        scheduler.seed().await;
        assert!(corpus.status(Source::Auction).await.size > 0);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_old_shelf() {
        let corpus = Arc::new(Corpus::default());
        let seeded = MockScraper::new(Source::Auction).fetch(32).await.unwrap();
        let size = corpus.install(Source::Auction, seeded).await;
        let scrapers: Vec<Arc<dyn Scraper>> = vec![Arc::new(Broken(Source::Auction))];
        let scheduler = Scheduler::new(corpus.clone(), scratch("keeps"), scrapers);
        assert!(scheduler.refresh(Source::Auction).await.is_err());
        assert_eq!(corpus.status(Source::Auction).await.size, size);
    }

    #[tokio::test]
    async fn second_trigger_hits_the_cooldown() {
        let (_, scheduler) = mocked(scratch("cooldown"));
        assert!(scheduler.trigger(None).is_ok());
        match scheduler.trigger(None) {
            Err(cooldown) => assert!(cooldown.retry_after <= REFRESH_COOLDOWN),
            Ok(()) => panic!("expected cooldown"),
        }
    }

    #[tokio::test]
    async fn seed_prefers_a_fresh_cache() {
        let cache = scratch("prefers");
        let batch = MockScraper::new(Source::Dealer).fetch(16).await.unwrap();
        cache.store(Source::Dealer, &batch);
        let corpus = Arc::new(Corpus::default());
        let scrapers: Vec<Arc<dyn Scraper>> = vec![Arc::new(Broken(Source::Dealer))];
        let scheduler = Scheduler::new(corpus.clone(), cache, scrapers);
        scheduler.seed().await;
        let status = corpus.status(Source::Dealer).await;
        assert_eq!(status.size, 15);
    }
}
