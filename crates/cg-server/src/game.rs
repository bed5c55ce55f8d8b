use super::*;
use cg_core::Mode;
use cg_core::Pounds;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::MaybeAuth;
use cg_engine::Engine;
use cg_engine::EngineError;
use cg_listings::Corpus;
use cg_listings::CorpusError;
use cg_listings::Difficulty;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;

/// One engine error, one status code.
pub(crate) fn fail(e: EngineError) -> HttpResponse {
    match e {
        EngineError::BadListingId | EngineError::BadMode | EngineError::PriceOutOfRange => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        EngineError::SessionComplete => HttpResponse::BadRequest().body(e.to_string()),
        EngineError::UnknownListing
        | EngineError::SessionNotFound
        | EngineError::SessionExpired => HttpResponse::NotFound().body(e.to_string()),
        EngineError::Corpus(CorpusError::NoListings(_))
        | EngineError::Corpus(CorpusError::Insufficient { .. }) => {
            HttpResponse::ServiceUnavailable().body(e.to_string())
        }
        EngineError::Storage(e) => {
            log::error!("[server] storage failure: {}", e);
            HttpResponse::InternalServerError().body("storage failure")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct DifficultyQuery {
    difficulty: Option<Difficulty>,
}

/// GET /api/random-enhanced-listing — a random car, price zeroed.
pub async fn random_listing(
    corpus: web::Data<Arc<Corpus>>,
    query: web::Query<DifficultyQuery>,
) -> impl Responder {
    let difficulty = query.difficulty.unwrap_or(Difficulty::Easy);
    match corpus.random(difficulty).await {
        Ok(listing) => HttpResponse::Ok().json(listing.concealed()),
        Err(e) => HttpResponse::ServiceUnavailable().body(e.to_string()),
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckGuessRequest {
    listing_id: String,
    guessed_price: Pounds,
    game_mode: Mode,
    difficulty: Option<Difficulty>,
}

/// POST /api/check-guess — scores one zero/streak guess.
pub async fn check_guess(
    engine: web::Data<Arc<Engine>>,
    visitor: Visitor,
    req: web::Json<CheckGuessRequest>,
) -> impl Responder {
    let difficulty = req.difficulty.unwrap_or(Difficulty::Easy);
    match engine
        .check_guess(
            req.game_mode,
            difficulty,
            visitor.id(),
            &req.listing_id,
            req.guessed_price,
        )
        .await
    {
        Ok(verdict) => HttpResponse::Ok().json(verdict),
        Err(e) => fail(e),
    }
}

#[derive(serde::Deserialize)]
pub struct StartRequest {
    difficulty: Difficulty,
}

/// POST /api/challenge/start — deals ten cars into a fresh session.
pub async fn challenge_start(
    engine: web::Data<Arc<Engine>>,
    auth: MaybeAuth,
    req: web::Json<StartRequest>,
) -> impl Responder {
    let user = auth.user().map(|u| u.id());
    match engine.start_challenge(req.difficulty, user).await {
        Ok(view) => HttpResponse::Created().json(view),
        Err(e) => fail(e),
    }
}

fn parse_session(raw: &str) -> Result<SessionId, HttpResponse> {
    SessionId::parse(raw).ok_or_else(|| HttpResponse::BadRequest().body("malformed session id"))
}

/// GET /api/challenge/{sessionId}
pub async fn challenge_get(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match parse_session(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match engine.challenge(&id).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => fail(e),
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    guessed_price: Pounds,
}

/// POST /api/challenge/{sessionId}/guess
pub async fn challenge_guess(
    engine: web::Data<Arc<Engine>>,
    path: web::Path<String>,
    req: web::Json<GuessRequest>,
) -> impl Responder {
    let id = match parse_session(&path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match engine.submit_guess(&id, req.guessed_price).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => fail(e),
    }
}
