use cg_core::ID;
use cg_core::Unique;
use cg_listings::Difficulty;
use std::time::SystemTime;

/// Registered account.
///
/// Credential material (password hash, security-answer hash, session
/// token digest) lives only in the database layer, never on the domain
/// type.
#[derive(Debug, Clone)]
pub struct User {
    id: ID<Self>,
    username: String,
    display_name: String,
    security_question: String,
    created_at: SystemTime,
    last_active: SystemTime,
    games_played: i64,
    favorite_difficulty: Option<Difficulty>,
}

impl User {
    pub fn new(username: String, display_name: String, security_question: String) -> Self {
        Self {
            id: ID::default(),
            username,
            display_name,
            security_question,
            created_at: SystemTime::now(),
            last_active: SystemTime::now(),
            games_played: 0,
            favorite_difficulty: None,
        }
    }
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: ID<Self>,
        username: String,
        display_name: String,
        security_question: String,
        created_at: SystemTime,
        last_active: SystemTime,
        games_played: i64,
        favorite_difficulty: Option<Difficulty>,
    ) -> Self {
        Self {
            id,
            username,
            display_name,
            security_question,
            created_at,
            last_active,
            games_played,
            favorite_difficulty,
        }
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn security_question(&self) -> &str {
        &self.security_question
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn games_played(&self) -> i64 {
        self.games_played
    }
    pub fn favorite_difficulty(&self) -> Option<Difficulty> {
        self.favorite_difficulty
    }
}

impl Unique for User {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use cg_pg::*;

    /// Users table. Username and display name are unique
    /// case-insensitively via functional indices; token columns are
    /// nullable (no active session).
    impl Schema for User {
        fn name() -> &'static str {
            USERS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                USERS,
                " (
                    id                  UUID PRIMARY KEY,
                    username            VARCHAR(20) NOT NULL,
                    display_name        VARCHAR(30) NOT NULL,
                    hashword            TEXT NOT NULL,
                    security_question   VARCHAR(200) NOT NULL,
                    answer_hash         TEXT NOT NULL,
                    token_digest        BYTEA,
                    token_expires_at    TIMESTAMPTZ,
                    created_at          TIMESTAMPTZ NOT NULL,
                    last_active         TIMESTAMPTZ NOT NULL,
                    games_played        BIGINT NOT NULL DEFAULT 0,
                    favorite_difficulty VARCHAR(8)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON ",
                USERS,
                " (LOWER(username));
                 CREATE UNIQUE INDEX IF NOT EXISTS idx_users_display ON ",
                USERS,
                " (LOWER(display_name));
                 CREATE INDEX IF NOT EXISTS idx_users_token ON ",
                USERS,
                " (token_digest) WHERE token_digest IS NOT NULL;"
            )
        }
    }
}
