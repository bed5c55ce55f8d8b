use cg_core::ID;
use cg_core::Mode;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::User;
use cg_listings::Difficulty;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// One accepted leaderboard submission. Append-only.
///
/// `username` is the denormalised display name at submission time;
/// anonymous players carry no user id. Challenge entries keep their
/// session id so a terminal session is accepted at most once.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    id: ID<Self>,
    user: Option<ID<User>>,
    username: String,
    score: i64,
    mode: Mode,
    difficulty: Difficulty,
    session: Option<SessionId>,
    friend_challenge: Option<uuid::Uuid>,
    created_at: SystemTime,
}

impl LeaderboardEntry {
    pub fn new(
        user: Option<ID<User>>,
        username: String,
        score: i64,
        mode: Mode,
        difficulty: Difficulty,
        session: Option<SessionId>,
        friend_challenge: Option<uuid::Uuid>,
    ) -> Self {
        Self {
            id: ID::default(),
            user,
            username,
            score,
            mode,
            difficulty,
            session,
            friend_challenge,
            created_at: SystemTime::now(),
        }
    }
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: ID<Self>,
        user: Option<ID<User>>,
        username: String,
        score: i64,
        mode: Mode,
        difficulty: Difficulty,
        session: Option<SessionId>,
        friend_challenge: Option<uuid::Uuid>,
        created_at: SystemTime,
    ) -> Self {
        Self {
            id,
            user,
            username,
            score,
            mode,
            difficulty,
            session,
            friend_challenge,
            created_at,
        }
    }
    pub fn user(&self) -> Option<ID<User>> {
        self.user
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn score(&self) -> i64 {
        self.score
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }
    pub fn friend_challenge(&self) -> Option<uuid::Uuid> {
        self.friend_challenge
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn view(&self) -> EntryView {
        EntryView {
            name: self.username.clone(),
            score: self.score,
            game_mode: self.mode,
            difficulty: self.difficulty,
            registered: self.user.is_some(),
            created_at: self
                .created_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

impl Unique for LeaderboardEntry {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

/// Wire shape of one leaderboard row.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub name: String,
    pub score: i64,
    pub game_mode: Mode,
    pub difficulty: Difficulty,
    pub registered: bool,
    pub created_at: u64,
}

mod schema {
    use super::*;
    use cg_pg::*;

    impl Schema for LeaderboardEntry {
        fn name() -> &'static str {
            LEADERBOARD
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                LEADERBOARD,
                " (
                    id               UUID PRIMARY KEY,
                    user_id          UUID REFERENCES ",
                USERS,
                "(id) ON DELETE SET NULL,
                    username         VARCHAR(30) NOT NULL,
                    score            BIGINT NOT NULL,
                    mode             VARCHAR(16) NOT NULL,
                    difficulty       VARCHAR(8) NOT NULL,
                    session_id       VARCHAR(16),
                    friend_challenge UUID,
                    created_at       TIMESTAMPTZ NOT NULL
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_leaderboard_board ON ",
                LEADERBOARD,
                " (mode, difficulty, score);
                 CREATE UNIQUE INDEX IF NOT EXISTS idx_leaderboard_session ON ",
                LEADERBOARD,
                " (session_id) WHERE mode = 'challenge' AND session_id IS NOT NULL;"
            )
        }
    }
}
