use cg_pg::PgErr;
use cg_pg::Schema;
use cg_pg::VERSION;
use std::sync::Arc;
use tokio_postgres::Client;

/// Current schema revision; stamped after the DDL runs.
const SCHEMA_VERSION: i32 = 1;

/// Creates every table and index in dependency order, then stamps the
/// schema version. All statements are `IF NOT EXISTS`, so reruns are
/// harmless.
pub async fn migrate(db: &Arc<Client>) -> Result<(), PgErr> {
    let ddl = [
        cg_auth::User::creates(),
        cg_auth::User::indices(),
        cg_engine::ChallengeSession::creates(),
        cg_engine::ChallengeSession::indices(),
        cg_engine::ChallengeGuess::creates(),
        cg_engine::ChallengeGuess::indices(),
        cg_friends::FriendChallenge::creates(),
        cg_friends::FriendChallenge::indices(),
        cg_friends::Participant::creates(),
        cg_friends::Participant::indices(),
        cg_records::LeaderboardEntry::creates(),
        cg_records::LeaderboardEntry::indices(),
    ];
    for statement in ddl {
        db.batch_execute(statement).await?;
    }
    db.batch_execute(const_format::concatcp!(
        "CREATE TABLE IF NOT EXISTS ",
        VERSION,
        " (
            version    INT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );"
    ))
    .await?;
    db.execute(
        const_format::concatcp!(
            "INSERT INTO ",
            VERSION,
            " (version) VALUES ($1) ON CONFLICT (version) DO NOTHING"
        ),
        &[&SCHEMA_VERSION],
    )
    .await?;
    log::info!("[migrate] schema at version {}", SCHEMA_VERSION);
    Ok(())
}
