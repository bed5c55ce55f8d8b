use super::*;
use cg_core::ID;
use cg_core::Unique;
use cg_pg::*;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_postgres::Client;

const USER_COLS: &str =
    "id, username, display_name, security_question, created_at, last_active, games_played, favorite_difficulty";

fn hydrate(row: &tokio_postgres::Row) -> User {
    User::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        row.get(1),
        row.get(2),
        row.get(3),
        row.get(4),
        row.get(5),
        row.get(6),
        row.get::<_, Option<String>>(7).and_then(|s| s.parse().ok()),
    )
}

/// Repository trait for account database operations.
/// Abstracts SQL from domain modules.
#[allow(async_fn_in_trait)]
pub trait AuthRepository {
    async fn create(&self, user: &User, hashword: &str, answer_hash: &str) -> Result<(), PgErr>;
    async fn username_taken(&self, username: &str) -> Result<bool, PgErr>;
    async fn display_name_taken(&self, name: &str, except: Option<ID<User>>)
    -> Result<bool, PgErr>;
    async fn by_username(&self, username: &str) -> Result<Option<User>, PgErr>;
    async fn by_token(&self, digest: &[u8]) -> Result<Option<User>, PgErr>;
    async fn credentials(&self, username: &str) -> Result<Option<(User, String)>, PgErr>;
    async fn secrets(&self, username: &str) -> Result<Option<(User, String)>, PgErr>;
    async fn update_session(
        &self,
        user: ID<User>,
        digest: &[u8],
        expires: SystemTime,
    ) -> Result<(), PgErr>;
    async fn clear_session(&self, user: ID<User>) -> Result<(), PgErr>;
    async fn touch(&self, user: ID<User>) -> Result<(), PgErr>;
    async fn update_password(&self, user: ID<User>, hashword: &str) -> Result<(), PgErr>;
    async fn set_display_name(&self, user: ID<User>, name: &str) -> Result<(), PgErr>;
    async fn set_question(
        &self,
        user: ID<User>,
        question: &str,
        answer_hash: &str,
    ) -> Result<(), PgErr>;
    async fn bump_games(&self, user: ID<User>) -> Result<(), PgErr>;
    async fn refresh_favorite(&self, user: ID<User>) -> Result<(), PgErr>;
}

impl AuthRepository for Arc<Client> {
    async fn create(&self, user: &User, hashword: &str, answer_hash: &str) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                USERS,
                " (id, username, display_name, hashword, security_question, answer_hash, created_at, last_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            ),
            &[
                &user.id().inner(),
                &user.username(),
                &user.display_name(),
                &hashword,
                &user.security_question(),
                &answer_hash,
                &user.created_at(),
                &user.created_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn username_taken(&self, username: &str) -> Result<bool, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT 1 FROM ",
                USERS,
                " WHERE LOWER(username) = LOWER($1)"
            ),
            &[&username],
        )
        .await
        .map(|opt| opt.is_some())
    }

    async fn display_name_taken(
        &self,
        name: &str,
        except: Option<ID<User>>,
    ) -> Result<bool, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT 1 FROM ",
                USERS,
                " WHERE LOWER(display_name) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2)"
            ),
            &[&name, &except.map(|id| id.inner())],
        )
        .await
        .map(|opt| opt.is_some())
    }

    async fn by_username(&self, username: &str) -> Result<Option<User>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                USER_COLS,
                " FROM ",
                USERS,
                " WHERE LOWER(username) = LOWER($1)"
            ),
            &[&username],
        )
        .await
        .map(|opt| opt.map(|row| hydrate(&row)))
    }

    async fn by_token(&self, digest: &[u8]) -> Result<Option<User>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                USER_COLS,
                " FROM ",
                USERS,
                " WHERE token_digest = $1 AND token_expires_at > NOW()"
            ),
            &[&digest],
        )
        .await
        .map(|opt| opt.map(|row| hydrate(&row)))
    }

    async fn credentials(&self, username: &str) -> Result<Option<(User, String)>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                USER_COLS,
                ", hashword FROM ",
                USERS,
                " WHERE LOWER(username) = LOWER($1)"
            ),
            &[&username],
        )
        .await
        .map(|opt| opt.map(|row| (hydrate(&row), row.get(8))))
    }

    async fn secrets(&self, username: &str) -> Result<Option<(User, String)>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                USER_COLS,
                ", answer_hash FROM ",
                USERS,
                " WHERE LOWER(username) = LOWER($1)"
            ),
            &[&username],
        )
        .await
        .map(|opt| opt.map(|row| (hydrate(&row), row.get(8))))
    }

    async fn update_session(
        &self,
        user: ID<User>,
        digest: &[u8],
        expires: SystemTime,
    ) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USERS,
                " SET token_digest = $2, token_expires_at = $3 WHERE id = $1"
            ),
            &[&user.inner(), &digest, &expires],
        )
        .await
        .map(|_| ())
    }

    async fn clear_session(&self, user: ID<User>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USERS,
                " SET token_digest = NULL, token_expires_at = NULL WHERE id = $1"
            ),
            &[&user.inner()],
        )
        .await
        .map(|_| ())
    }

    async fn touch(&self, user: ID<User>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!("UPDATE ", USERS, " SET last_active = NOW() WHERE id = $1"),
            &[&user.inner()],
        )
        .await
        .map(|_| ())
    }

    async fn update_password(&self, user: ID<User>, hashword: &str) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!("UPDATE ", USERS, " SET hashword = $2 WHERE id = $1"),
            &[&user.inner(), &hashword],
        )
        .await
        .map(|_| ())
    }

    async fn set_display_name(&self, user: ID<User>, name: &str) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!("UPDATE ", USERS, " SET display_name = $2 WHERE id = $1"),
            &[&user.inner(), &name],
        )
        .await
        .map(|_| ())
    }

    async fn set_question(
        &self,
        user: ID<User>,
        question: &str,
        answer_hash: &str,
    ) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USERS,
                " SET security_question = $2, answer_hash = $3 WHERE id = $1"
            ),
            &[&user.inner(), &question, &answer_hash],
        )
        .await
        .map(|_| ())
    }

    async fn bump_games(&self, user: ID<User>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USERS,
                " SET games_played = games_played + 1 WHERE id = $1"
            ),
            &[&user.inner()],
        )
        .await
        .map(|_| ())
    }

    async fn refresh_favorite(&self, user: ID<User>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USERS,
                " SET favorite_difficulty = pick.difficulty FROM (
                    SELECT difficulty FROM ",
                SESSIONS,
                " WHERE user_id = $1 AND complete
                     GROUP BY difficulty ORDER BY COUNT(*) DESC, difficulty LIMIT 1
                 ) pick WHERE id = $1"
            ),
            &[&user.inner()],
        )
        .await
        .map(|_| ())
    }
}
