//! CarGuessr Backend Server
//!
//! One actix-web surface serving the three game modes, accounts,
//! friend challenges, leaderboards, and the admin plane.
//!
//! ## Request path
//!
//! Logger → [`Shield`] (method whitelist, scanner denylist, security
//! headers) → CORS → [`Identify`] (anonymous session ids) → per-scope
//! [`Throttle`] buckets → handlers. Honeypot decoys sit outside the
//! API scopes and answer plain 404s.
//!
//! ## Boot order
//!
//! config (refuses weak admin keys) → database + migration → corpus
//! seed (cache, scrape, or mock) → refresh scheduler → HTTP bind.

mod admin;
mod boards;
mod config;
mod game;
mod health;
mod honeypot;
mod identity;
mod migrate;
mod proxy;
mod shield;
mod social;
mod throttle;

pub use config::Config;
pub use config::vet;
pub use identity::Identify;
pub use identity::Visitor;
pub use proxy::Cidr;
pub use shield::Shield;
pub use throttle::Limiter;
pub use throttle::Throttle;

use cg_core::ADMIN_RATE;
use cg_core::AUTH_RATE;
use cg_core::BODY_LIMIT;
use cg_core::DRAIN_DEADLINE;
use cg_core::PUBLIC_RATE;
use cg_engine::Engine;
use cg_friends::Friends;
use cg_listings::Cache;
use cg_listings::Corpus;
use cg_listings::Scheduler;
use cg_listings::Scraper;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::web;
use std::sync::Arc;

fn cors(config: &Config) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .allowed_header(identity::SESSION_HEADER)
        .expose_headers(vec![identity::SESSION_HEADER])
        .max_age(3600);
    match config.production {
        true => config
            .origins
            .iter()
            .fold(cors.supports_credentials(), |cors, origin| {
                cors.allowed_origin(origin)
            }),
        false => cors.allow_any_origin(),
    }
}

#[rustfmt::skip]
pub async fn run(scrapers: Vec<Arc<dyn Scraper>>) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let db = cg_pg::db().await;
    migrate::migrate(&db).await?;
    let corpus = Arc::new(Corpus::default());
    let scheduler = Scheduler::new(corpus.clone(), Cache::from_env(), scrapers);
    scheduler.seed().await;
    scheduler.start();
    let engine = Arc::new(Engine::new(db.clone(), corpus.clone()));
    let friends = Arc::new(Friends::new(db.clone(), engine.clone()));
    let public_bucket = Limiter::new(PUBLIC_RATE);
    let auth_bucket = Limiter::new(AUTH_RATE);
    let admin_bucket = Limiter::new(ADMIN_RATE);
    let app_config = web::Data::new(config.clone());
    let app_db = web::Data::new(db);
    let app_corpus = web::Data::new(corpus);
    let app_engine = web::Data::new(engine);
    let app_friends = web::Data::new(friends);
    let app_scheduler = web::Data::new(scheduler.clone());
    log::info!("starting carguessr server on {}", config.bind);
    let bind = config.bind.clone();
    let server = HttpServer::new(move || {
        let app = App::new()
            .app_data(app_config.clone())
            .app_data(app_db.clone())
            .app_data(app_corpus.clone())
            .app_data(app_engine.clone())
            .app_data(app_friends.clone())
            .app_data(app_scheduler.clone())
            .app_data(web::JsonConfig::default().limit(BODY_LIMIT))
            .wrap(Identify)
            .wrap(cors(&config))
            .wrap(Shield)
            .wrap(Logger::new("%r %s %Ts"))
            .service(
                web::scope("/api/admin")
                    .wrap(Throttle::new(admin_bucket.clone()))
                    .route("/refresh-listings", web::post().to(admin::refresh_listings))
                    .route("/cache-status", web::get().to(admin::cache_status))
                    .route("/listings", web::get().to(admin::listings))
                    .route("/test-scraper", web::get().to(admin::test_scraper)),
            )
            .service(
                web::scope("/api/auth")
                    .wrap(Throttle::new(auth_bucket.clone()))
                    .route("/register", web::post().to(cg_auth::register))
                    .route("/login", web::post().to(cg_auth::login))
                    .route("/logout", web::post().to(cg_auth::logout))
                    .route("/security-question", web::post().to(cg_auth::security_question))
                    .route("/reset-password", web::post().to(cg_auth::reset_password))
                    .route("/profile", web::get().to(cg_auth::profile))
                    .route("/profile", web::post().to(cg_auth::update_profile)),
            )
            .service(
                web::scope("/api")
                    .wrap(Throttle::new(public_bucket.clone()))
                    .route("/health", web::get().to(health::health))
                    .route("/random-enhanced-listing", web::get().to(game::random_listing))
                    .route("/check-guess", web::post().to(game::check_guess))
                    .route("/leaderboard", web::get().to(boards::board))
                    .route("/leaderboard/submit", web::post().to(boards::submit))
                    .route("/leaderboard/rank", web::get().to(boards::rank))
                    .route("/challenge/start", web::post().to(game::challenge_start))
                    .route("/challenge/{session}", web::get().to(game::challenge_get))
                    .route("/challenge/{session}/guess", web::post().to(game::challenge_guess))
                    .route("/friends/challenges", web::post().to(social::create))
                    .route("/friends/challenges/my-challenges", web::get().to(social::mine))
                    .route("/friends/challenges/{code}", web::get().to(social::lookup))
                    .route("/friends/challenges/{code}/join", web::post().to(social::join))
                    .route("/friends/challenges/{code}/leaderboard", web::get().to(social::board))
                    .route("/friends/challenges/{code}/participation", web::get().to(social::participation)),
            );
        honeypot::DECOYS
            .iter()
            .fold(app, |app, decoy| app.route(decoy, web::to(honeypot::snare)))
    })
    .workers(6)
    .bind(&bind)?
    .shutdown_timeout(DRAIN_DEADLINE.as_secs())
    .run();
    {
        // the scheduler stops first so shutdown never waits on a scrape
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("interrupt received, stopping refresh scheduler");
            scheduler.stop();
        });
    }
    server.await?;
    scheduler.stop();
    log::info!("drained and shut down");
    Ok(())
}
