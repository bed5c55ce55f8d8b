use super::*;
use cg_listings::Corpus;
use cg_listings::Difficulty;
use cg_listings::Scheduler;
use cg_listings::Source;
use actix_web::FromRequest;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::dev::Payload;
use actix_web::web;
use futures::future::Ready;
use std::sync::Arc;
use std::time::SystemTime;

/// Guard for admin routes. No admin handler body runs unless this
/// extractor has compared the presented key against the boot key.
pub struct Admin;

/// Constant-time equality via digest comparison: the SHA-256 of an
/// attacker-controlled string reveals nothing about how much of the
/// real key it matched.
fn keys_match(presented: &str, expected: &str) -> bool {
    use sha2::Digest;
    sha2::Sha256::digest(presented.as_bytes()) == sha2::Sha256::digest(expected.as_bytes())
}

fn presented_key(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("x-admin-key") {
        return header.to_str().ok().map(str::to_owned);
    }
    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix("admin_key=").map(str::to_owned))
}

impl FromRequest for Admin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<web::Data<Config>>();
        let outcome = match (config, presented_key(req)) {
            (None, _) => Err(actix_web::error::ErrorInternalServerError(
                "admin key not configured",
            )),
            (_, None) => Err(actix_web::error::ErrorForbidden("admin key required")),
            (Some(config), Some(key)) => match keys_match(&key, &config.admin_key) {
                true => Ok(Admin),
                false => {
                    log::warn!("[admin] rejected key from {}", proxy::request_ip(req));
                    Err(actix_web::error::ErrorForbidden("invalid admin key"))
                }
            },
        };
        futures::future::ready(outcome)
    }
}

fn difficulty_param(query: &web::Query<std::collections::HashMap<String, String>>)
-> Result<Option<Difficulty>, HttpResponse> {
    match query.get("difficulty") {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: String| HttpResponse::BadRequest().body(e)),
    }
}

/// POST /api/admin/refresh-listings — queues a scrape-and-swap and
/// returns immediately; 429 inside the global cooldown.
pub async fn refresh_listings(
    _admin: Admin,
    scheduler: web::Data<Arc<Scheduler>>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let difficulty = match difficulty_param(&query) {
        Ok(d) => d,
        Err(response) => return response,
    };
    match scheduler.trigger(difficulty.map(Difficulty::source)) {
        Ok(()) => HttpResponse::Accepted().json(serde_json::json!({
            "status": "refresh queued"
        })),
        Err(cooldown) => HttpResponse::TooManyRequests()
            .insert_header(("Retry-After", cooldown.retry_after.as_secs().to_string()))
            .json(serde_json::json!({
                "status": "cooldown",
                "retryAfterSeconds": cooldown.retry_after.as_secs(),
            })),
    }
}

fn shelf_json(size: usize, refreshed: SystemTime) -> serde_json::Value {
    let age = SystemTime::now()
        .duration_since(refreshed)
        .unwrap_or_default()
        .as_secs();
    serde_json::json!({ "size": size, "ageSeconds": age })
}

/// GET /api/admin/cache-status — per-source snapshot sizes and ages.
pub async fn cache_status(_admin: Admin, corpus: web::Data<Arc<Corpus>>) -> impl Responder {
    let auction = corpus.status(Source::Auction).await;
    let dealer = corpus.status(Source::Dealer).await;
    HttpResponse::Ok().json(serde_json::json!({
        "auction": shelf_json(auction.size, auction.refreshed),
        "dealer": shelf_json(dealer.size, dealer.refreshed),
    }))
}

/// GET /api/admin/listings — raw dump of one shelf, prices visible.
pub async fn listings(
    _admin: Admin,
    corpus: web::Data<Arc<Corpus>>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let difficulty = match difficulty_param(&query) {
        Ok(d) => d.unwrap_or(Difficulty::Easy),
        Err(response) => return response,
    };
    let shelf = corpus.shelf(difficulty.source()).await;
    let all: Vec<_> = shelf.all().cloned().collect();
    HttpResponse::Ok().json(all)
}

/// GET /api/admin/test-scraper — one-shot three-listing probe without
/// touching the corpus.
pub async fn test_scraper(
    _admin: Admin,
    scheduler: web::Data<Arc<Scheduler>>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let difficulty = match difficulty_param(&query) {
        Ok(d) => d.unwrap_or(Difficulty::Hard),
        Err(response) => return response,
    };
    match scheduler.probe(difficulty.source(), 3).await {
        Ok(batch) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "fetched": batch.len(),
            "sample": batch,
        })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({
            "status": "failed",
            "error": e.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_comparison_matches_exact_keys_only() {
        assert!(keys_match("abc123", "abc123"));
        assert!(!keys_match("abc123", "abc124"));
        assert!(!keys_match("", "abc124"));
    }
}
