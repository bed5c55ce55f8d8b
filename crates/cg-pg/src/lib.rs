//! PostgreSQL connectivity and schema plumbing.
//!
//! Thin layer over `tokio-postgres`: a shared connection constructor,
//! table-name constants, and the [`Schema`] trait that domain types
//! implement to describe their DDL. Repository traits living in the
//! domain crates assemble their SQL from these constants via
//! [`const_format::concatcp!`].
mod schema;

pub use schema::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `DB_URL` environment variable.
/// Returns an `Arc<Client>` suitable for sharing across async tasks.
///
/// # Panics
///
/// Panics if `DB_URL` is not set or if connection fails.
pub async fn db() -> Arc<Client> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    client
        .execute("SET client_min_messages TO WARNING", &[])
        .await
        .expect("set client_min_messages");
    Arc::new(client)
}

/// PostgreSQL error type alias.
pub type PgErr = tokio_postgres::Error;

/// Table for registered user accounts.
#[rustfmt::skip]
pub const USERS:        &str = "users";
/// Table for materialised challenge sessions.
#[rustfmt::skip]
pub const SESSIONS:     &str = "challenge_sessions";
/// Table for per-car challenge guesses.
#[rustfmt::skip]
pub const GUESSES:      &str = "challenge_guesses";
/// Table for friend challenges.
#[rustfmt::skip]
pub const CHALLENGES:   &str = "friend_challenges";
/// Table for friend-challenge participation.
#[rustfmt::skip]
pub const PARTICIPANTS: &str = "challenge_participants";
/// Table for leaderboard entries.
#[rustfmt::skip]
pub const LEADERBOARD:  &str = "leaderboard_entries";
/// Table holding the single schema version row.
#[rustfmt::skip]
pub const VERSION:      &str = "schema_version";
