use super::*;
use cg_core::ID;
use cg_core::Mode;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::User;
use cg_listings::Difficulty;
use cg_pg::*;
use std::sync::Arc;
use tokio_postgres::Client;

const ENTRY_COLS: &str =
    "id, user_id, username, score, mode, difficulty, session_id, friend_challenge, created_at";

fn entry_from(row: &tokio_postgres::Row) -> Option<LeaderboardEntry> {
    Some(LeaderboardEntry::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        row.get::<_, Option<uuid::Uuid>>(1).map(ID::from),
        row.get(2),
        row.get(3),
        row.get::<_, String>(4).parse().ok()?,
        row.get::<_, String>(5).parse().ok()?,
        row.get::<_, Option<String>>(6)
            .and_then(|s| SessionId::parse(&s)),
        row.get(7),
        row.get(8),
    ))
}

/// Challenge boards rank high scores; streak and zero boards rank low.
fn descending(mode: Mode) -> bool {
    matches!(mode, Mode::Challenge)
}

/// Repository trait for leaderboard persistence.
#[allow(async_fn_in_trait)]
pub trait RecordsRepository {
    async fn add_entry(&self, entry: &LeaderboardEntry) -> Result<(), PgErr>;
    async fn board(
        &self,
        mode: Mode,
        difficulty: Difficulty,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, PgErr>;
    async fn session_submitted(&self, session: &SessionId) -> Result<bool, PgErr>;
    async fn user_rank(
        &self,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr>;
    async fn overall_rank(
        &self,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr>;
}

impl RecordsRepository for Arc<Client> {
    async fn add_entry(&self, entry: &LeaderboardEntry) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                LEADERBOARD,
                " (",
                ENTRY_COLS,
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ),
            &[
                &entry.id().inner(),
                &entry.user().map(|u| u.inner()),
                &entry.username(),
                &entry.score(),
                &entry.mode().to_string(),
                &entry.difficulty().to_string(),
                &entry.session().map(|s| s.as_str()),
                &entry.friend_challenge(),
                &entry.created_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn board(
        &self,
        mode: Mode,
        difficulty: Difficulty,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, PgErr> {
        let sql = match descending(mode) {
            true => const_format::concatcp!(
                "SELECT ",
                ENTRY_COLS,
                " FROM ",
                LEADERBOARD,
                " WHERE mode = $1 AND difficulty = $2
                 ORDER BY score DESC, created_at ASC LIMIT $3"
            ),
            false => const_format::concatcp!(
                "SELECT ",
                ENTRY_COLS,
                " FROM ",
                LEADERBOARD,
                " WHERE mode = $1 AND difficulty = $2
                 ORDER BY score ASC, created_at ASC LIMIT $3"
            ),
        };
        self.query(
            sql,
            &[&mode.to_string(), &difficulty.to_string(), &limit],
        )
        .await
        .map(|rows| rows.iter().filter_map(entry_from).collect())
    }

    async fn session_submitted(&self, session: &SessionId) -> Result<bool, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT 1 FROM ",
                LEADERBOARD,
                " WHERE mode = 'challenge' AND session_id = $1"
            ),
            &[&session.as_str()],
        )
        .await
        .map(|opt| opt.is_some())
    }

    /// Dense rank of the user's best score among registered players:
    /// one plus the count of distinct strictly-better per-user bests.
    async fn user_rank(
        &self,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr> {
        let sql = match descending(mode) {
            true => const_format::concatcp!(
                "SELECT 1 + COUNT(DISTINCT best) FROM (
                    SELECT user_id, MAX(score) AS best FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id IS NOT NULL
                     GROUP BY user_id
                 ) peers WHERE best > (
                    SELECT MAX(score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id = $1
                 )"
            ),
            false => const_format::concatcp!(
                "SELECT 1 + COUNT(DISTINCT best) FROM (
                    SELECT user_id, MIN(score) AS best FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id IS NOT NULL
                     GROUP BY user_id
                 ) peers WHERE best < (
                    SELECT MIN(score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id = $1
                 )"
            ),
        };
        self.ranked(sql, user, mode, difficulty).await
    }

    /// Dense rank of the user's best score among every entry,
    /// anonymous submissions included.
    async fn overall_rank(
        &self,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr> {
        let sql = match descending(mode) {
            true => const_format::concatcp!(
                "SELECT 1 + COUNT(DISTINCT score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND score > (
                    SELECT MAX(score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id = $1
                 )"
            ),
            false => const_format::concatcp!(
                "SELECT 1 + COUNT(DISTINCT score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND score < (
                    SELECT MIN(score) FROM ",
                LEADERBOARD,
                " WHERE mode = $2 AND difficulty = $3 AND user_id = $1
                 )"
            ),
        };
        self.ranked(sql, user, mode, difficulty).await
    }
}

/// Shared shape of the rank queries: NULL best (no entries for the
/// user) reads as unranked.
#[allow(async_fn_in_trait)]
trait Ranked {
    async fn ranked(
        &self,
        sql: &str,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr>;
}

impl Ranked for Arc<Client> {
    async fn ranked(
        &self,
        sql: &str,
        user: ID<User>,
        mode: Mode,
        difficulty: Difficulty,
    ) -> Result<Option<i64>, PgErr> {
        let has_entries = self
            .query_opt(
                const_format::concatcp!(
                    "SELECT 1 FROM ",
                    LEADERBOARD,
                    " WHERE mode = $2 AND difficulty = $3 AND user_id = $1 LIMIT 1"
                ),
                &[&user.inner(), &mode.to_string(), &difficulty.to_string()],
            )
            .await?
            .is_some();
        if !has_entries {
            return Ok(None);
        }
        self.query_one(
            sql,
            &[&user.inner(), &mode.to_string(), &difficulty.to_string()],
        )
        .await
        .map(|row| Some(row.get(0)))
    }
}
