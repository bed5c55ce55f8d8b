use super::*;
use cg_core::JoinCode;
use cg_auth::Auth;
use cg_friends::Friends;
use cg_friends::FriendsError;
use cg_listings::Difficulty;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;

fn fail(e: FriendsError) -> HttpResponse {
    match e {
        FriendsError::NotFound | FriendsError::Expired => {
            HttpResponse::NotFound().body(e.to_string())
        }
        FriendsError::Full | FriendsError::AlreadyJoined => {
            HttpResponse::Conflict().body(e.to_string())
        }
        FriendsError::BadTitle(_) | FriendsError::BadCap => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        FriendsError::CodeExhaustion => {
            log::error!("[friends] join-code space exhausted");
            HttpResponse::InternalServerError().body(e.to_string())
        }
        FriendsError::Engine(inner) => game::fail(inner),
        FriendsError::Storage(inner) => {
            log::error!("[friends] storage failure: {}", inner);
            HttpResponse::InternalServerError().body("storage failure")
        }
    }
}

fn parse_code(raw: &str) -> Result<JoinCode, HttpResponse> {
    JoinCode::parse(raw).ok_or_else(|| HttpResponse::BadRequest().body("malformed challenge code"))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    title: String,
    difficulty: Difficulty,
    max_participants: i32,
}

/// POST /api/friends/challenges
pub async fn create(
    friends: web::Data<Arc<Friends>>,
    auth: Auth,
    req: web::Json<CreateRequest>,
) -> impl Responder {
    match friends
        .create(auth.user(), &req.title, req.difficulty, req.max_participants)
        .await
    {
        Ok((challenge, template)) => HttpResponse::Created().json(serde_json::json!({
            "challengeCode": challenge.code(),
            "sessionId": template.id(),
            "challenge": challenge.view(1),
            "session": template.view(),
        })),
        Err(e) => fail(e),
    }
}

/// GET /api/friends/challenges/{code}
pub async fn lookup(friends: web::Data<Arc<Friends>>, path: web::Path<String>) -> impl Responder {
    let code = match parse_code(&path) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match friends.lookup(&code).await {
        Ok((challenge, members)) => HttpResponse::Ok().json(challenge.view(members)),
        Err(e) => fail(e),
    }
}

/// POST /api/friends/challenges/{code}/join
pub async fn join(
    friends: web::Data<Arc<Friends>>,
    auth: Auth,
    path: web::Path<String>,
) -> impl Responder {
    let code = match parse_code(&path) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match friends.join(&code, auth.user()).await {
        Ok((challenge, session, members)) => HttpResponse::Created().json(serde_json::json!({
            "sessionId": session.id(),
            "challenge": challenge.view(members),
            "session": session.view(),
        })),
        Err(e) => fail(e),
    }
}

/// GET /api/friends/challenges/{code}/leaderboard
pub async fn board(friends: web::Data<Arc<Friends>>, path: web::Path<String>) -> impl Responder {
    let code = match parse_code(&path) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match friends.board(&code).await {
        Ok((challenge, standings)) => HttpResponse::Ok().json(serde_json::json!({
            "challenge": challenge.view(standings.len()),
            "standings": standings,
        })),
        Err(e) => fail(e),
    }
}

/// GET /api/friends/challenges/{code}/participation
pub async fn participation(
    friends: web::Data<Arc<Friends>>,
    auth: Auth,
    path: web::Path<String>,
) -> impl Responder {
    let code = match parse_code(&path) {
        Ok(code) => code,
        Err(response) => return response,
    };
    match friends.participation(&code, auth.user()).await {
        Ok(Some(enrolment)) => HttpResponse::Ok().json(enrolment.view()),
        Ok(None) => HttpResponse::NotFound().body("not enrolled in this challenge"),
        Err(e) => fail(e),
    }
}

/// GET /api/friends/challenges/my-challenges
pub async fn mine(friends: web::Data<Arc<Friends>>, auth: Auth) -> impl Responder {
    match friends.mine(auth.user()).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => fail(e),
    }
}
