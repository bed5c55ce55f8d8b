use cg_listings::Corpus;
use cg_listings::Difficulty;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

/// GET /api/health — database ping plus per-difficulty stock check.
/// 503 with per-check detail when anything is missing.
pub async fn health(
    db: web::Data<Arc<Client>>,
    corpus: web::Data<Arc<Corpus>>,
) -> impl Responder {
    let database = db
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("[health] database check failed: {}", e))
        .is_ok();
    let easy = corpus.status(Difficulty::Easy.source()).await.size;
    let hard = corpus.status(Difficulty::Hard.source()).await.size;
    let healthy = database && easy > 0 && hard > 0;
    let body = serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "checks": {
            "database": if database { "ok" } else { "unavailable" },
            "listings": { "easy": easy, "hard": hard },
        },
    });
    match healthy {
        true => HttpResponse::Ok().json(body),
        false => HttpResponse::ServiceUnavailable().json(body),
    }
}
