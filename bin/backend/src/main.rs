//! CarGuessr Backend Binary
//!
//! Game server with periodic listing refresh. Binds BIND_ADDR (or
//! 0.0.0.0:$PORT) and requires DB_URL plus a strong ADMIN_KEY.
//!
//! The production headless-browser scrapers register here; this build
//! wires the built-in mock source so the server is playable offline.

use cg_listings::MockScraper;
use cg_listings::Scraper;
use cg_listings::Source;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    cg_core::log();
    let scrapers: Vec<Arc<dyn Scraper>> = vec![
        Arc::new(MockScraper::new(Source::Auction)),
        Arc::new(MockScraper::new(Source::Dealer)),
    ];
    cg_server::run(scrapers).await.unwrap();
}
