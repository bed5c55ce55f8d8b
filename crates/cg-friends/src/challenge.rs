use cg_core::FRIEND_CHALLENGE_TTL;
use cg_core::ID;
use cg_core::JoinCode;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::User;
use cg_listings::Difficulty;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A code-shared challenge whose participants all play the same cars.
///
/// The template session holds the canonical car sequence; joiners get
/// deep copies. Joining closes 48 hours after creation.
#[derive(Debug, Clone)]
pub struct FriendChallenge {
    id: ID<Self>,
    code: JoinCode,
    title: String,
    creator: ID<User>,
    template: SessionId,
    difficulty: Difficulty,
    max_participants: i32,
    created_at: SystemTime,
    expires_at: SystemTime,
    active: bool,
}

impl FriendChallenge {
    pub fn new(
        code: JoinCode,
        title: String,
        creator: ID<User>,
        template: SessionId,
        difficulty: Difficulty,
        max_participants: i32,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id: ID::default(),
            code,
            title,
            creator,
            template,
            difficulty,
            max_participants,
            created_at: now,
            expires_at: now + FRIEND_CHALLENGE_TTL,
            active: true,
        }
    }
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: ID<Self>,
        code: JoinCode,
        title: String,
        creator: ID<User>,
        template: SessionId,
        difficulty: Difficulty,
        max_participants: i32,
        created_at: SystemTime,
        expires_at: SystemTime,
        active: bool,
    ) -> Self {
        Self {
            id,
            code,
            title,
            creator,
            template,
            difficulty,
            max_participants,
            created_at,
            expires_at,
            active,
        }
    }
    pub fn code(&self) -> &JoinCode {
        &self.code
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn creator(&self) -> ID<User> {
        self.creator
    }
    pub fn template(&self) -> &SessionId {
        &self.template
    }
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    pub fn max_participants(&self) -> i32 {
        self.max_participants
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }
    pub fn active(&self) -> bool {
        self.active
    }
    pub fn expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    /// Public projection.
    pub fn view(&self, participants: usize) -> ChallengeInfo {
        ChallengeInfo {
            id: self.id.to_string(),
            challenge_code: self.code.clone(),
            title: self.title.clone(),
            difficulty: self.difficulty,
            max_participants: self.max_participants,
            participant_count: participants,
            created_at: epoch(self.created_at),
            expires_at: epoch(self.expires_at),
            is_active: self.active && !self.expired(),
        }
    }
}

impl Unique for FriendChallenge {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

fn epoch(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Wire shape of a friend challenge.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeInfo {
    pub id: String,
    pub challenge_code: JoinCode,
    pub title: String,
    pub difficulty: Difficulty,
    pub max_participants: i32,
    pub participant_count: usize,
    pub created_at: u64,
    pub expires_at: u64,
    pub is_active: bool,
}

/// Challenge titles are trimmed, stripped of control characters, and
/// bounded to 60 characters.
pub fn sanitize_title(raw: &str) -> Result<String, &'static str> {
    let title: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
    if title.is_empty() || title.chars().count() > 60 {
        return Err("title must be 1-60 characters");
    }
    Ok(title)
}

mod schema {
    use super::*;
    use cg_pg::*;

    impl Schema for FriendChallenge {
        fn name() -> &'static str {
            CHALLENGES
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                CHALLENGES,
                " (
                    id               UUID PRIMARY KEY,
                    code             VARCHAR(6) NOT NULL,
                    title            VARCHAR(60) NOT NULL,
                    creator_id       UUID NOT NULL REFERENCES ",
                USERS,
                "(id) ON DELETE CASCADE,
                    template_session VARCHAR(16) NOT NULL REFERENCES ",
                SESSIONS,
                "(id) ON DELETE CASCADE,
                    difficulty       VARCHAR(8) NOT NULL,
                    max_participants INT NOT NULL,
                    created_at       TIMESTAMPTZ NOT NULL,
                    expires_at       TIMESTAMPTZ NOT NULL,
                    active           BOOLEAN NOT NULL DEFAULT TRUE
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_challenges_code ON ",
                CHALLENGES,
                " (code) WHERE active;
                 CREATE INDEX IF NOT EXISTS idx_challenges_creator ON ",
                CHALLENGES,
                " (creator_id);"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_sanitized() {
        assert_eq!(sanitize_title("  Friday Night \u{1b}Runs  ").unwrap(), "Friday Night Runs");
        assert!(sanitize_title("   ").is_err());
        assert!(sanitize_title(&"x".repeat(61)).is_err());
    }
}
