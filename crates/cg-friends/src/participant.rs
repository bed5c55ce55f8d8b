use super::*;
use cg_core::ID;
use cg_core::Points;
use cg_core::SessionId;
use cg_auth::User;
use std::time::SystemTime;

/// One user's enrolment in a friend challenge.
/// Unique per (challenge, user); the session is their private copy of
/// the template cars.
#[derive(Debug, Clone)]
pub struct Participant {
    challenge: ID<FriendChallenge>,
    user: ID<User>,
    session: SessionId,
    joined_at: SystemTime,
    final_score: Option<Points>,
    rank: Option<i32>,
    completed_at: Option<SystemTime>,
}

impl Participant {
    pub fn new(challenge: ID<FriendChallenge>, user: ID<User>, session: SessionId) -> Self {
        Self {
            challenge,
            user,
            session,
            joined_at: SystemTime::now(),
            final_score: None,
            rank: None,
            completed_at: None,
        }
    }
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        challenge: ID<FriendChallenge>,
        user: ID<User>,
        session: SessionId,
        joined_at: SystemTime,
        final_score: Option<Points>,
        rank: Option<i32>,
        completed_at: Option<SystemTime>,
    ) -> Self {
        Self {
            challenge,
            user,
            session,
            joined_at,
            final_score,
            rank,
            completed_at,
        }
    }
    pub fn challenge(&self) -> ID<FriendChallenge> {
        self.challenge
    }
    pub fn user(&self) -> ID<User> {
        self.user
    }
    pub fn session(&self) -> &SessionId {
        &self.session
    }
    pub fn joined_at(&self) -> SystemTime {
        self.joined_at
    }
    pub fn final_score(&self) -> Option<Points> {
        self.final_score
    }
    pub fn rank(&self) -> Option<i32> {
        self.rank
    }
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    /// Projection for the participation endpoint.
    pub fn view(&self) -> Enrollment {
        let epoch = |at: SystemTime| {
            at.duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        };
        Enrollment {
            session_id: self.session.clone(),
            joined_at: epoch(self.joined_at),
            final_score: self.final_score,
            rank_position: self.rank,
            completed_at: self.completed_at.map(epoch),
        }
    }
}

/// Wire shape of a user's own enrolment.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub session_id: SessionId,
    pub joined_at: u64,
    pub final_score: Option<Points>,
    pub rank_position: Option<i32>,
    pub completed_at: Option<u64>,
}

mod schema {
    use super::*;
    use cg_pg::*;

    impl Schema for Participant {
        fn name() -> &'static str {
            PARTICIPANTS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                PARTICIPANTS,
                " (
                    challenge_id UUID NOT NULL REFERENCES ",
                CHALLENGES,
                "(id) ON DELETE CASCADE,
                    user_id      UUID NOT NULL REFERENCES ",
                USERS,
                "(id) ON DELETE CASCADE,
                    session_id   VARCHAR(16) NOT NULL REFERENCES ",
                SESSIONS,
                "(id) ON DELETE CASCADE,
                    joined_at    TIMESTAMPTZ NOT NULL,
                    final_score  BIGINT,
                    rank         INT,
                    completed_at TIMESTAMPTZ,
                    PRIMARY KEY (challenge_id, user_id)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_participants_user ON ",
                PARTICIPANTS,
                " (user_id);
                 CREATE INDEX IF NOT EXISTS idx_participants_session ON ",
                PARTICIPANTS,
                " (session_id);"
            )
        }
    }
}
