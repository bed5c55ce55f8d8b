use super::*;
use cg_core::CARS_PER_CHALLENGE;
use cg_core::ID;
use cg_core::Points;
use cg_core::Pounds;
use cg_core::SOLO_SESSION_TTL;
use cg_core::SessionId;
use cg_core::Arbitrary;
use cg_auth::User;
use cg_listings::Difficulty;
use cg_listings::Listing;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A materialised ten-car challenge.
///
/// Cars keep their real prices server-side; every public serialisation
/// goes through [`SessionView`], which conceals them. All transitions
/// happen through [`record`], keeping
/// `guesses.len() == current_car` and `total_score == Σ points` true
/// by construction.
///
/// [`record`]: ChallengeSession::record
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    id: SessionId,
    user: Option<ID<User>>,
    difficulty: Difficulty,
    cars: Vec<Listing>,
    current_car: usize,
    total_score: Points,
    complete: bool,
    guesses: Vec<ChallengeGuess>,
    created_at: SystemTime,
    expires_at: SystemTime,
    completed_at: Option<SystemTime>,
}

impl ChallengeSession {
    pub fn new(difficulty: Difficulty, cars: Vec<Listing>, user: Option<ID<User>>) -> Self {
        debug_assert_eq!(cars.len(), CARS_PER_CHALLENGE);
        let now = SystemTime::now();
        Self {
            id: SessionId::random(),
            user,
            difficulty,
            cars,
            current_car: 0,
            total_score: 0,
            complete: false,
            guesses: Vec::new(),
            created_at: now,
            expires_at: now + SOLO_SESSION_TTL,
            completed_at: None,
        }
    }

    /// Deep copy of this session's car sequence for a joining
    /// participant: same cars, same order, fresh identity, no progress.
    pub fn adopt(&self, user: ID<User>) -> Self {
        Self::new(self.difficulty, self.cars.clone(), Some(user))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: SessionId,
        user: Option<ID<User>>,
        difficulty: Difficulty,
        cars: Vec<Listing>,
        current_car: usize,
        total_score: Points,
        complete: bool,
        guesses: Vec<ChallengeGuess>,
        created_at: SystemTime,
        expires_at: SystemTime,
        completed_at: Option<SystemTime>,
    ) -> Self {
        Self {
            id,
            user,
            difficulty,
            cars,
            current_car,
            total_score,
            complete,
            guesses,
            created_at,
            expires_at,
            completed_at,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }
    pub fn user(&self) -> Option<ID<User>> {
        self.user
    }
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
    pub fn cars(&self) -> &[Listing] {
        &self.cars
    }
    pub fn current_car(&self) -> usize {
        self.current_car
    }
    pub fn total_score(&self) -> Points {
        self.total_score
    }
    pub fn complete(&self) -> bool {
        self.complete
    }
    pub fn guesses(&self) -> &[ChallengeGuess] {
        &self.guesses
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }
    pub fn expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    /// Scores a guess against the current car and advances the session.
    /// Rejects before mutating on any invariant violation.
    pub fn record(&mut self, guessed: Pounds) -> Result<ChallengeGuess, EngineError> {
        if self.complete {
            return Err(EngineError::SessionComplete);
        }
        if self.expired() {
            return Err(EngineError::SessionExpired);
        }
        let car = self
            .cars
            .get(self.current_car)
            .ok_or(EngineError::SessionComplete)?;
        let guess = ChallengeGuess::score(self.current_car, car, guessed);
        self.guesses.push(guess.clone());
        self.current_car += 1;
        self.total_score += guess.points;
        if self.current_car == self.cars.len() {
            self.complete = true;
            self.completed_at = Some(SystemTime::now());
        }
        Ok(guess)
    }

    /// Public projection with car prices concealed.
    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            difficulty: self.difficulty,
            cars: self.cars.iter().map(Listing::concealed).collect(),
            current_car: self.current_car,
            total_score: self.total_score,
            is_complete: self.complete,
            guesses: self.guesses.clone(),
            expires_at: stamp(self.expires_at),
            completed_at: self.completed_at.map(stamp),
        }
    }

    #[cfg(test)]
    pub fn backdate(&mut self, by: std::time::Duration) {
        self.expires_at = SystemTime::now() - by;
    }
}

fn stamp(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Wire shape of a challenge session. Prices are always zero here.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub difficulty: Difficulty,
    pub cars: Vec<Listing>,
    pub current_car: usize,
    pub total_score: Points,
    pub is_complete: bool,
    pub guesses: Vec<ChallengeGuess>,
    pub expires_at: u64,
    pub completed_at: Option<u64>,
}

mod schema {
    use super::*;
    use cg_pg::*;

    /// Challenge sessions table. The car sequence is serialised JSON;
    /// guesses live in their own table keyed by (session, car_index).
    impl Schema for ChallengeSession {
        fn name() -> &'static str {
            SESSIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                SESSIONS,
                " (
                    id           VARCHAR(16) PRIMARY KEY,
                    user_id      UUID REFERENCES ",
                USERS,
                "(id) ON DELETE CASCADE,
                    difficulty   VARCHAR(8) NOT NULL,
                    cars         TEXT NOT NULL,
                    current_car  INT NOT NULL DEFAULT 0,
                    total_score  BIGINT NOT NULL DEFAULT 0,
                    complete     BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at   TIMESTAMPTZ NOT NULL,
                    expires_at   TIMESTAMPTZ NOT NULL,
                    completed_at TIMESTAMPTZ
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_sessions_user ON ",
                SESSIONS,
                " (user_id) WHERE user_id IS NOT NULL;
                 CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON ",
                SESSIONS,
                " (expires_at);"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_listings::MockScraper;
    use cg_listings::Scraper;
    use cg_listings::Source;

    async fn cars() -> Vec<Listing> {
        MockScraper::new(Source::Auction)
            .fetch(CARS_PER_CHALLENGE)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn guesses_track_current_car() {
        let mut session = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        for i in 0..CARS_PER_CHALLENGE {
            assert_eq!(session.guesses().len(), session.current_car());
            session.record(1000 + i as Pounds).unwrap();
        }
        assert_eq!(session.guesses().len(), CARS_PER_CHALLENGE);
        assert!(session.complete());
        assert!(session.completed_at().is_some());
        let total: Points = session.guesses().iter().map(|g| g.points).sum();
        assert_eq!(session.total_score(), total);
    }

    #[tokio::test]
    async fn perfect_run_scores_fifty_thousand() {
        let mut session = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        for i in 0..CARS_PER_CHALLENGE {
            let actual = session.cars()[i].price();
            let guess = session.record(actual).unwrap();
            assert_eq!(guess.points, 5000);
            assert_eq!(guess.percentage, 0.0);
        }
        assert_eq!(session.total_score(), 50_000);
    }

    #[tokio::test]
    async fn eleventh_guess_is_rejected() {
        let mut session = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        for _ in 0..CARS_PER_CHALLENGE {
            session.record(5000).unwrap();
        }
        match session.record(5000) {
            Err(EngineError::SessionComplete) => {}
            other => panic!("expected SessionComplete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_session_rejects_guesses() {
        let mut session = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        session.backdate(std::time::Duration::from_secs(60));
        match session.record(5000) {
            Err(EngineError::SessionExpired) => {}
            other => panic!("expected SessionExpired, got {:?}", other),
        }
        assert_eq!(session.guesses().len(), 0);
    }

    #[tokio::test]
    async fn adopted_sessions_share_the_car_sequence() {
        let template = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        let copy = template.adopt(ID::default());
        assert_ne!(copy.id(), template.id());
        assert_eq!(copy.current_car(), 0);
        let ids: Vec<_> = template.cars().iter().map(|c| c.id()).collect();
        let copies: Vec<_> = copy.cars().iter().map(|c| c.id()).collect();
        assert_eq!(ids, copies);
    }

    #[tokio::test]
    async fn views_conceal_every_price() {
        let mut session = ChallengeSession::new(Difficulty::Hard, cars().await, None);
        session.record(4000).unwrap();
        let view = session.view();
        assert!(view.cars.iter().all(|c| c.price() == 0));
        // but the recorded guess reveals the actual price of its car
        assert!(view.guesses[0].actual_price > 0);
    }
}
