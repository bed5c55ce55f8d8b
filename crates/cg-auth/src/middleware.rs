use super::*;
use cg_core::TOKEN_TTL;
use cg_core::Unique;
use actix_web::FromRequest;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::cookie::Cookie;
use actix_web::cookie::SameSite;
use actix_web::dev::Payload;
use actix_web::web;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_postgres::Client;

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "session";

fn https() -> bool {
    std::env::var("HTTPS_ENABLED")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Session cookie for a freshly minted token.
/// HttpOnly + SameSite=Lax always; Secure when serving over HTTPS.
pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(https())
        .max_age(actix_web::cookie::time::Duration::seconds(
            TOKEN_TTL.as_secs() as i64,
        ))
        .finish()
}

/// Expired cookie instructing the browser to drop its session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// 401 that also clears the stale browser cookie.
#[derive(Debug)]
struct SessionRejected;

impl std::fmt::Display for SessionRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session expired or invalid")
    }
}

impl actix_web::ResponseError for SessionRejected {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::UNAUTHORIZED
    }
    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized()
            .cookie(removal_cookie())
            .body(self.to_string())
    }
}

fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

fn from_cookie(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Extractor for authenticated requests.
/// Accepts the session cookie (browsers) or a Bearer token (tooling),
/// loads the account by token digest, and bumps `last_active`.
pub struct Auth(pub User);

impl Auth {
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl FromRequest for Auth {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = req.app_data::<web::Data<Arc<Client>>>().cloned();
        let token = from_cookie(req).or_else(|| bearer(req));
        Box::pin(async move {
            let token = token.ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("authentication required")
            })?;
            let db = db.ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("database not configured")
            })?;
            let user = db
                .by_token(&token::digest(&token))
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("database error"))?
                .ok_or(SessionRejected)?;
            let _ = db.touch(user.id()).await;
            Ok(Auth(user))
        })
    }
}

/// Optional authentication extractor - does not fail if unauthenticated.
pub struct MaybeAuth(pub Option<User>);

impl MaybeAuth {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl FromRequest for MaybeAuth {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;
    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth_future = Auth::from_request(req, payload);
        Box::pin(async move {
            match auth_future.await {
                Ok(Auth(user)) => Ok(MaybeAuth(Some(user))),
                Err(_) => Ok(MaybeAuth(None)),
            }
        })
    }
}
