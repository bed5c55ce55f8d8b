use super::*;
use cg_core::CODE_ATTEMPTS;
use cg_core::ID;
use cg_core::JoinCode;
use cg_core::MAX_PARTICIPANTS;
use cg_core::MIN_PARTICIPANTS;
use cg_core::Points;
use cg_core::Arbitrary;
use cg_core::Unique;
use cg_auth::User;
use cg_engine::ChallengeSession;
use cg_engine::Engine;
use cg_engine::EngineError;
use cg_listings::Difficulty;
use cg_pg::PgErr;
use std::sync::Arc;
use tokio_postgres::Client;

/// Errors the coordinator surfaces to the request plane.
#[derive(Debug)]
pub enum FriendsError {
    NotFound,
    Expired,
    Full,
    AlreadyJoined,
    CodeExhaustion,
    BadTitle(&'static str),
    BadCap,
    Engine(EngineError),
    Storage(PgErr),
}

impl std::fmt::Display for FriendsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "challenge not found"),
            Self::Expired => write!(f, "challenge has expired"),
            Self::Full => write!(f, "challenge is full"),
            Self::AlreadyJoined => write!(f, "already joined this challenge"),
            Self::CodeExhaustion => write!(f, "could not mint a unique challenge code"),
            Self::BadTitle(e) => write!(f, "{}", e),
            Self::BadCap => write!(
                f,
                "participant cap must be between {} and {}",
                MIN_PARTICIPANTS, MAX_PARTICIPANTS
            ),
            Self::Engine(e) => write!(f, "{}", e),
            Self::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

impl std::error::Error for FriendsError {}

impl From<EngineError> for FriendsError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}
impl From<PgErr> for FriendsError {
    fn from(e: PgErr) -> Self {
        Self::Storage(e)
    }
}

/// One row of a friend-challenge leaderboard.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    #[serde(rename = "userId")]
    pub user: ID<User>,
    pub display_name: String,
    pub final_score: Option<Points>,
    pub rank_position: Option<i32>,
    pub completed_at: Option<u64>,
    pub is_complete: bool,
}

/// Orders standings and assigns rank positions.
///
/// Completed participants first, by final score descending with ties
/// broken by earlier completion; they receive positions 1..N.
/// Incomplete participants keep their relative order and stay
/// unranked.
pub fn rank(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        b.is_complete
            .cmp(&a.is_complete)
            .then_with(|| b.final_score.unwrap_or(0).cmp(&a.final_score.unwrap_or(0)))
            .then_with(|| {
                a.completed_at
                    .unwrap_or(u64::MAX)
                    .cmp(&b.completed_at.unwrap_or(u64::MAX))
            })
    });
    let mut position = 0;
    for standing in standings.iter_mut() {
        standing.rank_position = match standing.is_complete {
            true => {
                position += 1;
                Some(position)
            }
            false => None,
        };
    }
}

/// A challenge with the caller's own enrolment attached.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyChallenge {
    pub challenge: ChallengeInfo,
    pub enrollment: Enrollment,
}

/// Coordinates friend challenges: minting codes, instantiating
/// templates through the engine, enrolling joiners, and ranking.
pub struct Friends {
    db: Arc<Client>,
    engine: Arc<Engine>,
}

impl Friends {
    pub fn new(db: Arc<Client>, engine: Arc<Engine>) -> Self {
        Self { db, engine }
    }

    async fn mint(&self) -> Result<JoinCode, FriendsError> {
        for _ in 0..CODE_ATTEMPTS {
            let candidate = JoinCode::random();
            if !self.db.code_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(FriendsError::CodeExhaustion)
    }

    /// Creates a challenge: unique code, fresh template, creator
    /// auto-enrolled on the template session itself.
    pub async fn create(
        &self,
        creator: &User,
        title: &str,
        difficulty: Difficulty,
        max_participants: i32,
    ) -> Result<(FriendChallenge, ChallengeSession), FriendsError> {
        let title = sanitize_title(title).map_err(FriendsError::BadTitle)?;
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&max_participants) {
            return Err(FriendsError::BadCap);
        }
        let code = self.mint().await?;
        let template = self.engine.template(difficulty, creator.id()).await?;
        let challenge = FriendChallenge::new(
            code,
            title,
            creator.id(),
            template.id().clone(),
            difficulty,
            max_participants,
        );
        self.db.create_challenge(&challenge).await?;
        let enrolment = Participant::new(challenge.id(), creator.id(), template.id().clone());
        self.db.add_participant(&enrolment).await?;
        log::info!(
            "[friends] {} created challenge {} ({})",
            creator.username(),
            challenge.code(),
            difficulty
        );
        Ok((challenge, template))
    }

    /// Looks up an active challenge by code.
    pub async fn lookup(&self, code: &JoinCode) -> Result<(FriendChallenge, usize), FriendsError> {
        let challenge = self
            .db
            .by_code(code)
            .await?
            .ok_or(FriendsError::NotFound)?;
        let members = self.db.participants(challenge.id()).await?.len();
        Ok((challenge, members))
    }

    /// Enrols a user: deep-copies the template cars into a fresh
    /// session bound to them.
    pub async fn join(
        &self,
        code: &JoinCode,
        user: &User,
    ) -> Result<(FriendChallenge, ChallengeSession, usize), FriendsError> {
        let challenge = self
            .db
            .by_code(code)
            .await?
            .ok_or(FriendsError::NotFound)?;
        if challenge.expired() {
            return Err(FriendsError::Expired);
        }
        let members = self.db.participants(challenge.id()).await?;
        if members.iter().any(|p| p.user() == user.id()) {
            return Err(FriendsError::AlreadyJoined);
        }
        if members.len() as i32 >= challenge.max_participants() {
            return Err(FriendsError::Full);
        }
        let session = self.engine.adopt(challenge.template(), user.id()).await?;
        let enrolment = Participant::new(challenge.id(), user.id(), session.id().clone());
        self.db.add_participant(&enrolment).await?;
        log::info!("[friends] {} joined {}", user.username(), challenge.code());
        Ok((challenge, session, members.len() + 1))
    }

    /// Current leaderboard: pulls completions out of the sessions,
    /// recomputes rank positions, persists them, and returns the
    /// ordered standings.
    pub async fn board(
        &self,
        code: &JoinCode,
    ) -> Result<(FriendChallenge, Vec<Standing>), FriendsError> {
        let challenge = self
            .db
            .by_code(code)
            .await?
            .ok_or(FriendsError::NotFound)?;
        self.db.refresh_results(challenge.id()).await?;
        let mut standings = self.db.standings(challenge.id()).await?;
        rank(&mut standings);
        self.db.store_ranks(challenge.id(), &standings).await?;
        Ok((challenge, standings))
    }

    /// The caller's own enrolment in a challenge.
    pub async fn participation(
        &self,
        code: &JoinCode,
        user: &User,
    ) -> Result<Option<Participant>, FriendsError> {
        let challenge = self
            .db
            .by_code(code)
            .await?
            .ok_or(FriendsError::NotFound)?;
        Ok(self.db.participation(challenge.id(), user.id()).await?)
    }

    /// Every active challenge the user is enrolled in.
    pub async fn mine(&self, user: &User) -> Result<Vec<MyChallenge>, FriendsError> {
        let rows = self.db.mine(user.id()).await?;
        Ok(rows
            .into_iter()
            .map(|(challenge, enrolment, members)| MyChallenge {
                challenge: challenge.view(members),
                enrollment: enrolment.view(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(score: Option<Points>, completed_at: Option<u64>) -> Standing {
        Standing {
            user: ID::default(),
            display_name: "player".into(),
            final_score: score,
            rank_position: None,
            completed_at,
            is_complete: score.is_some(),
        }
    }

    #[test]
    fn ranks_by_score_then_completion_time() {
        let mut standings = vec![
            standing(Some(40_000), Some(200)),
            standing(Some(47_500), Some(300)),
            standing(Some(47_500), Some(100)),
        ];
        rank(&mut standings);
        assert_eq!(standings[0].final_score, Some(47_500));
        assert_eq!(standings[0].completed_at, Some(100));
        assert_eq!(standings[0].rank_position, Some(1));
        assert_eq!(standings[1].completed_at, Some(300));
        assert_eq!(standings[1].rank_position, Some(2));
        assert_eq!(standings[2].final_score, Some(40_000));
        assert_eq!(standings[2].rank_position, Some(3));
    }

    #[test]
    fn incomplete_participants_stay_unranked() {
        let mut standings = vec![
            standing(None, None),
            standing(Some(10_000), Some(50)),
            standing(None, None),
        ];
        rank(&mut standings);
        assert_eq!(standings[0].rank_position, Some(1));
        assert!(standings[1].rank_position.is_none());
        assert!(standings[2].rank_position.is_none());
    }

    #[test]
    fn ranking_is_stable_under_input_reordering() {
        let a = standing(Some(30_000), Some(900));
        let b = standing(Some(30_000), Some(400));
        let mut one = vec![a.clone(), b.clone()];
        let mut two = vec![b, a];
        rank(&mut one);
        rank(&mut two);
        let order = |s: &[Standing]| {
            s.iter()
                .map(|x| (x.completed_at, x.rank_position))
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&one), order(&two));
        assert_eq!(one[0].completed_at, Some(400));
    }
}
