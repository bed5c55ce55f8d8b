use super::*;
use cg_core::Mode;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::Auth;
use cg_auth::MaybeAuth;
use cg_engine::Engine;
use cg_listings::Difficulty;
use cg_records::EntryView;
use cg_records::LeaderboardEntry;
use cg_records::RecordsRepository;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(serde::Deserialize)]
pub struct BoardQuery {
    mode: Option<Mode>,
    difficulty: Option<Difficulty>,
    limit: Option<i64>,
}

/// GET /api/leaderboard
pub async fn board(
    db: web::Data<Arc<Client>>,
    query: web::Query<BoardQuery>,
) -> impl Responder {
    let mode = query.mode.unwrap_or(Mode::Challenge);
    let difficulty = query.difficulty.unwrap_or(Difficulty::Easy);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match db.board(mode, difficulty, limit).await {
        Ok(entries) => {
            let views: Vec<EntryView> = entries.iter().map(LeaderboardEntry::view).collect();
            HttpResponse::Ok().json(views)
        }
        Err(e) => {
            log::error!("[boards] read failed: {}", e);
            HttpResponse::InternalServerError().body("storage failure")
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    name: String,
    score: i64,
    game_mode: Mode,
    difficulty: Difficulty,
    session_id: Option<String>,
}

/// POST /api/leaderboard/submit.
///
/// The client's score is advisory: every submission is verified
/// against server state before a row is written. Challenge scores must
/// match a completed session (accepted once per session); streak
/// scores consume the parked terminal streak; zero scores must match
/// the live running total.
pub async fn submit(
    db: web::Data<Arc<Client>>,
    engine: web::Data<Arc<Engine>>,
    auth: MaybeAuth,
    visitor: Visitor,
    req: web::Json<SubmitRequest>,
) -> impl Responder {
    let name: String = req.name.trim().chars().filter(|c| !c.is_control()).collect();
    if name.is_empty() || name.chars().count() > 30 {
        return HttpResponse::BadRequest().body("name must be 1-30 characters");
    }
    let session = match &req.session_id {
        Some(raw) => match SessionId::parse(raw) {
            Some(id) => Some(id),
            None => return HttpResponse::BadRequest().body("malformed session id"),
        },
        None => None,
    };
    match req.game_mode {
        Mode::Challenge => {
            let Some(ref id) = session else {
                return HttpResponse::BadRequest().body("challenge submissions need a session id");
            };
            match engine.session_score(id).await {
                Ok(Some((recorded, true))) if recorded == req.score => {}
                Ok(Some((_, true))) => {
                    return HttpResponse::BadRequest().body("score does not match the session");
                }
                Ok(Some((_, false))) => {
                    return HttpResponse::BadRequest().body("challenge is not complete");
                }
                Ok(None) => return HttpResponse::NotFound().body("challenge session not found"),
                Err(e) => return game::fail(e),
            }
            match db.session_submitted(id).await {
                Ok(false) => {}
                Ok(true) => return HttpResponse::Conflict().body("session already submitted"),
                Err(e) => {
                    log::error!("[boards] dedupe check failed: {}", e);
                    return HttpResponse::InternalServerError().body("storage failure");
                }
            }
        }
        Mode::Streak => {
            let id = session.clone().unwrap_or_else(|| visitor.id().clone());
            match engine.take_streak(&id) {
                Some(ended) if ended as i64 == req.score => {}
                Some(_) => return HttpResponse::BadRequest().body("score does not match the streak"),
                None => return HttpResponse::BadRequest().body("no finished streak to submit"),
            }
        }
        Mode::Zero => {
            let id = session.clone().unwrap_or_else(|| visitor.id().clone());
            match engine.zero_score(&id) {
                Some(total) if total == req.score => {}
                Some(_) => return HttpResponse::BadRequest().body("score does not match the total"),
                None => return HttpResponse::BadRequest().body("no zero-mode run to submit"),
            }
        }
    }
    let (user, name) = match auth.user() {
        Some(user) => (Some(user.id()), user.display_name().to_string()),
        None => (None, name),
    };
    let entry = LeaderboardEntry::new(
        user,
        name,
        req.score,
        req.game_mode,
        req.difficulty,
        session,
        None,
    );
    match db.add_entry(&entry).await {
        Ok(()) => HttpResponse::Created().json(serde_json::json!({ "ok": true })),
        Err(e) => {
            log::error!("[boards] write failed: {}", e);
            HttpResponse::InternalServerError().body("storage failure")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct RankQuery {
    mode: Option<Mode>,
    difficulty: Option<Difficulty>,
}

/// GET /api/leaderboard/rank — the caller's dense ranks.
pub async fn rank(
    db: web::Data<Arc<Client>>,
    auth: Auth,
    query: web::Query<RankQuery>,
) -> impl Responder {
    let mode = query.mode.unwrap_or(Mode::Challenge);
    let difficulty = query.difficulty.unwrap_or(Difficulty::Easy);
    let user = auth.user().id();
    let leaderboard = db.user_rank(user, mode, difficulty).await;
    let overall = db.overall_rank(user, mode, difficulty).await;
    match (leaderboard, overall) {
        (Ok(leaderboard), Ok(overall)) => HttpResponse::Ok().json(serde_json::json!({
            "leaderboardRank": leaderboard,
            "overallRank": overall,
        })),
        (Err(e), _) | (_, Err(e)) => {
            log::error!("[boards] rank read failed: {}", e);
            HttpResponse::InternalServerError().body("storage failure")
        }
    }
}
