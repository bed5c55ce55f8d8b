use super::*;
use cg_core::RESET_TIMING_FLOOR;
use cg_core::Unique;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

/// Pads an error path out to the fixed minimum latency so response
/// timing cannot distinguish "no such user" from "wrong answer".
async fn floor(started: tokio::time::Instant) {
    tokio::time::sleep_until(started + RESET_TIMING_FLOOR).await;
}

pub async fn register(
    db: web::Data<Arc<Client>>,
    req: web::Json<RegisterRequest>,
) -> impl Responder {
    if let Err(e) = validate::username(&req.username) {
        return HttpResponse::BadRequest().body(e);
    }
    if let Err(e) = validate::password(&req.password) {
        return HttpResponse::BadRequest().body(e);
    }
    if let Err(e) = validate::answer(&req.security_answer) {
        return HttpResponse::BadRequest().body(e);
    }
    let display_name = match validate::display_name(&req.display_name) {
        Ok(name) => name,
        Err(e) => return HttpResponse::BadRequest().body(e),
    };
    let question = match validate::question(&req.security_question) {
        Ok(q) => q,
        Err(e) => return HttpResponse::BadRequest().body(e),
    };
    match db.username_taken(&req.username).await {
        Ok(false) => {}
        Ok(true) => return HttpResponse::Conflict().body("username already taken"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    }
    match db.display_name_taken(&display_name, None).await {
        Ok(false) => {}
        Ok(true) => return HttpResponse::Conflict().body("display name already taken"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    }
    let hashword = match password::hash(&req.password) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let answer_hash = match password::hash(&password::normalize(&req.security_answer)) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let user = User::new(req.username.clone(), display_name, question);
    if let Err(e) = db.create(&user, &hashword, &answer_hash).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    let token = token::mint();
    if let Err(e) = db
        .update_session(user.id(), &token::digest(&token), token::expiry())
        .await
    {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    log::info!("[auth] registered {}", user.username());
    HttpResponse::Created()
        .cookie(session_cookie(&token))
        .json(AuthResponse {
            token,
            user: Profile::from(&user),
        })
}

pub async fn login(db: web::Data<Arc<Client>>, req: web::Json<LoginRequest>) -> impl Responder {
    let (user, hashword) = match db.credentials(&req.username).await {
        Ok(Some(row)) => row,
        Ok(None) => return HttpResponse::Unauthorized().body("invalid credentials"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    if !password::verify(&req.password, &hashword) {
        return HttpResponse::Unauthorized().body("invalid credentials");
    }
    if password::stale(&hashword) {
        match password::hash(&req.password) {
            Ok(rehash) => {
                if let Err(e) = db.update_password(user.id(), &rehash).await {
                    log::warn!("[auth] rehash persist failed for {}: {}", user.username(), e);
                }
            }
            Err(e) => log::warn!("[auth] rehash failed for {}: {}", user.username(), e),
        }
    }
    let token = token::mint();
    if let Err(e) = db
        .update_session(user.id(), &token::digest(&token), token::expiry())
        .await
    {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    let _ = db.touch(user.id()).await;
    HttpResponse::Ok()
        .cookie(session_cookie(&token))
        .json(AuthResponse {
            token,
            user: Profile::from(&user),
        })
}

pub async fn logout(db: web::Data<Arc<Client>>, auth: Auth) -> impl Responder {
    match db.clear_session(auth.user().id()).await {
        Ok(_) => HttpResponse::Ok()
            .cookie(removal_cookie())
            .json(serde_json::json!({"status": "logged_out"})),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn security_question(
    db: web::Data<Arc<Client>>,
    req: web::Json<QuestionRequest>,
) -> impl Responder {
    let started = tokio::time::Instant::now();
    match db.by_username(&req.username).await {
        Ok(Some(user)) => HttpResponse::Ok().json(QuestionResponse {
            security_question: user.security_question().to_string(),
        }),
        Ok(None) => {
            floor(started).await;
            HttpResponse::NotFound().body("unknown username")
        }
        Err(e) => {
            log::error!("[auth] question lookup failed: {}", e);
            floor(started).await;
            HttpResponse::InternalServerError().body("database error")
        }
    }
}

pub async fn reset_password(
    db: web::Data<Arc<Client>>,
    req: web::Json<ResetRequest>,
) -> impl Responder {
    let started = tokio::time::Instant::now();
    let rejected = || HttpResponse::Unauthorized().body("invalid credentials");
    if validate::password(&req.new_password).is_err() {
        return HttpResponse::BadRequest().body("password must be at least 8 characters");
    }
    let (user, answer_hash) = match db.secrets(&req.username).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            floor(started).await;
            return rejected();
        }
        Err(e) => {
            log::error!("[auth] reset lookup failed: {}", e);
            floor(started).await;
            return rejected();
        }
    };
    // display names compare case-insensitively, same as registration
    if !user
        .display_name()
        .eq_ignore_ascii_case(req.display_name.trim())
    {
        floor(started).await;
        return rejected();
    }
    if !password::verify(&password::normalize(&req.security_answer), &answer_hash) {
        floor(started).await;
        return rejected();
    }
    let hashword = match password::hash(&req.new_password) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    if let Err(e) = db.update_password(user.id(), &hashword).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    let token = token::mint();
    if let Err(e) = db
        .update_session(user.id(), &token::digest(&token), token::expiry())
        .await
    {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    log::info!("[auth] password reset for {}", user.username());
    HttpResponse::Ok()
        .cookie(session_cookie(&token))
        .json(AuthResponse {
            token,
            user: Profile::from(&user),
        })
}

pub async fn profile(auth: Auth) -> impl Responder {
    HttpResponse::Ok().json(Profile::from(auth.user()))
}

pub async fn update_profile(
    db: web::Data<Arc<Client>>,
    auth: Auth,
    req: web::Json<ProfileUpdate>,
) -> impl Responder {
    let user = auth.user();
    if let Some(ref raw) = req.display_name {
        let name = match validate::display_name(raw) {
            Ok(name) => name,
            Err(e) => return HttpResponse::BadRequest().body(e),
        };
        match db.display_name_taken(&name, Some(user.id())).await {
            Ok(false) => {}
            Ok(true) => return HttpResponse::Conflict().body("display name already taken"),
            Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
        }
        if let Err(e) = db.set_display_name(user.id(), &name).await {
            return HttpResponse::InternalServerError().body(e.to_string());
        }
    }
    match (&req.security_question, &req.security_answer) {
        (None, None) => {}
        (Some(question), Some(answer)) => {
            let question = match validate::question(question) {
                Ok(q) => q,
                Err(e) => return HttpResponse::BadRequest().body(e),
            };
            if let Err(e) = validate::answer(answer) {
                return HttpResponse::BadRequest().body(e);
            }
            let answer_hash = match password::hash(&password::normalize(answer)) {
                Ok(h) => h,
                Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
            };
            if let Err(e) = db.set_question(user.id(), &question, &answer_hash).await {
                return HttpResponse::InternalServerError().body(e.to_string());
            }
        }
        _ => {
            return HttpResponse::BadRequest()
                .body("security question and answer must be changed together");
        }
    }
    match db.by_username(user.username()).await {
        Ok(Some(fresh)) => HttpResponse::Ok().json(Profile::from(&fresh)),
        Ok(None) => HttpResponse::InternalServerError().body("account vanished"),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
