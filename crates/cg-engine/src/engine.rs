use super::*;
use cg_core::ID;
use cg_core::MAX_GUESS;
use cg_core::Mode;
use cg_core::Points;
use cg_core::Pounds;
use cg_core::SessionId;
use cg_core::Streak;
use cg_auth::AuthRepository;
use cg_auth::User;
use cg_listings::Corpus;
use cg_listings::Difficulty;
use cg_listings::Listing;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StateMutex;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio_postgres::Client;

/// Wire verdict for a zero/streak guess.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub actual_price: Pounds,
    pub guessed_price: Pounds,
    pub difference: Pounds,
    pub percentage: f64,
    pub score: i64,
    pub correct: bool,
    pub game_over: bool,
    pub message: String,
    pub original_url: String,
}

/// Wire result of one challenge guess.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    #[serde(flatten)]
    pub guess: ChallengeGuess,
    pub total_score: Points,
    pub current_car: usize,
    pub is_complete: bool,
}

/// The game engine service.
///
/// Owns every piece of mutable game state: the ephemeral arcade maps
/// and a table of live challenge sessions, each behind its own mutex
/// so unrelated sessions never queue behind one another. The database
/// is the source of truth for challenge sessions; the table is a
/// write-through cache.
pub struct Engine {
    db: Arc<Client>,
    corpus: Arc<Corpus>,
    arcade: StateMutex<Arcade>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<ChallengeSession>>>>,
}

impl Engine {
    pub fn new(db: Arc<Client>, corpus: Arc<Corpus>) -> Self {
        Self {
            db,
            corpus,
            arcade: StateMutex::new(Arcade::default()),
            sessions: RwLock::new(HashMap::new()),
        }
    }
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    fn bounded(guessed: Pounds) -> Result<Pounds, EngineError> {
        if (0..=MAX_GUESS).contains(&guessed) {
            Ok(guessed)
        } else {
            Err(EngineError::PriceOutOfRange)
        }
    }

    /// Session handle from the table, loading from the database on miss.
    async fn entry(&self, id: &SessionId) -> Result<Arc<Mutex<ChallengeSession>>, EngineError> {
        if let Some(found) = self.sessions.read().await.get(id) {
            return Ok(found.clone());
        }
        let loaded = self
            .db
            .load_session(id)
            .await?
            .ok_or(EngineError::SessionNotFound)?;
        let mut table = self.sessions.write().await;
        Ok(table
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(loaded)))
            .clone())
    }

    async fn evict(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    /// Scores one zero/streak guess against the live corpus.
    pub async fn check_guess(
        &self,
        mode: Mode,
        difficulty: Difficulty,
        visitor: &SessionId,
        listing_id: &str,
        guessed: Pounds,
    ) -> Result<Verdict, EngineError> {
        if !Listing::valid_id(listing_id) {
            return Err(EngineError::BadListingId);
        }
        let guessed = Self::bounded(guessed)?;
        let listing = self
            .corpus
            .get(difficulty, listing_id)
            .await
            .ok_or(EngineError::UnknownListing)?;
        let actual = listing.price();
        let difference = score::difference(actual, guessed);
        let percentage = score::percentage(actual, guessed);
        let mut arcade = self.arcade.lock().expect("arcade lock");
        let verdict = match mode {
            Mode::Zero => {
                let total = arcade.zero_guess(visitor, difference);
                Verdict {
                    actual_price: actual,
                    guessed_price: guessed,
                    difference,
                    percentage,
                    score: total,
                    correct: true,
                    game_over: false,
                    message: format!("£{} off. Running total: £{}", difference, total),
                    original_url: listing.url().to_string(),
                }
            }
            Mode::Streak if score::within_tolerance(percentage) => {
                let streak = arcade.streak_hit(visitor);
                Verdict {
                    actual_price: actual,
                    guessed_price: guessed,
                    difference,
                    percentage,
                    score: streak as i64,
                    correct: true,
                    game_over: false,
                    message: format!("Within 10%! Streak: {}", streak),
                    original_url: listing.url().to_string(),
                }
            }
            Mode::Streak => {
                let ended = arcade.streak_miss(visitor);
                Verdict {
                    actual_price: actual,
                    guessed_price: guessed,
                    difference,
                    percentage,
                    score: 0,
                    correct: false,
                    game_over: true,
                    message: format!("Off by {:.1}%. Streak over at {}.", percentage, ended),
                    original_url: listing.url().to_string(),
                }
            }
            Mode::Challenge => return Err(EngineError::BadMode),
        };
        Ok(verdict)
    }

    /// Starts a fresh ten-car challenge.
    pub async fn start_challenge(
        &self,
        difficulty: Difficulty,
        user: Option<ID<User>>,
    ) -> Result<SessionView, EngineError> {
        let cars = self.corpus.sample(difficulty, cg_core::CARS_PER_CHALLENGE).await?;
        let session = ChallengeSession::new(difficulty, cars, user);
        self.db.create_session(&session).await?;
        let view = session.view();
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), Arc::new(Mutex::new(session)));
        log::debug!("[engine] challenge {} started", view.session_id);
        Ok(view)
    }

    /// Fetches a session for display. Honours the TTL: expired sessions
    /// read as gone.
    pub async fn challenge(&self, id: &SessionId) -> Result<SessionView, EngineError> {
        let entry = self.entry(id).await?;
        let session = entry.lock().await;
        if session.expired() && !session.complete() {
            drop(session);
            self.evict(id).await;
            return Err(EngineError::SessionExpired);
        }
        Ok(session.view())
    }

    /// Submits a guess for the session's current car.
    pub async fn submit_guess(
        &self,
        id: &SessionId,
        guessed: Pounds,
    ) -> Result<GuessOutcome, EngineError> {
        let guessed = Self::bounded(guessed)?;
        let entry = self.entry(id).await?;
        let mut session = entry.lock().await;
        let backup = session.clone();
        let guess = session.record(guessed)?;
        let persisted = match self.db.add_guess(id, &guess).await {
            Ok(()) => self.db.save_progress(&session).await,
            Err(e) => Err(e),
        };
        if let Err(e) = persisted {
            *session = backup;
            return Err(e.into());
        }
        let outcome = GuessOutcome {
            guess,
            total_score: session.total_score(),
            current_car: session.current_car(),
            is_complete: session.complete(),
        };
        if session.complete() {
            if let Some(user) = session.user() {
                if let Err(e) = self.db.bump_games(user).await {
                    log::warn!("[engine] games-played bump failed: {}", e);
                }
                if let Err(e) = self.db.refresh_favorite(user).await {
                    log::warn!("[engine] favorite refresh failed: {}", e);
                }
            }
            log::info!(
                "[engine] challenge {} complete: {} points",
                id,
                session.total_score()
            );
            drop(session);
            self.evict(id).await;
        }
        Ok(outcome)
    }

    /// Ten fresh cars persisted as a creator-owned template session for
    /// a friend challenge.
    pub async fn template(
        &self,
        difficulty: Difficulty,
        creator: ID<User>,
    ) -> Result<ChallengeSession, EngineError> {
        let cars = self.corpus.sample(difficulty, cg_core::CARS_PER_CHALLENGE).await?;
        let session = ChallengeSession::new(difficulty, cars, Some(creator));
        self.db.create_session(&session).await?;
        self.sessions.write().await.insert(
            session.id().clone(),
            Arc::new(Mutex::new(session.clone())),
        );
        Ok(session)
    }

    /// Deep-copies a template's car sequence into a fresh session for a
    /// joining participant.
    pub async fn adopt(
        &self,
        template: &SessionId,
        user: ID<User>,
    ) -> Result<ChallengeSession, EngineError> {
        let entry = self.entry(template).await?;
        let copy = entry.lock().await.adopt(user);
        self.db.create_session(&copy).await?;
        self.sessions
            .write()
            .await
            .insert(copy.id().clone(), Arc::new(Mutex::new(copy.clone())));
        Ok(copy)
    }

    /// Recorded score and completion for a session, straight from the
    /// database: leaderboard submissions verify against this.
    pub async fn session_score(&self, id: &SessionId) -> Result<Option<(Points, bool)>, EngineError> {
        Ok(self.db.session_score(id).await?)
    }

    /// Live zero-mode total for a session id.
    pub fn zero_score(&self, id: &SessionId) -> Option<Pounds> {
        self.arcade.lock().expect("arcade lock").zero_score(id)
    }

    /// Consumes the parked terminal streak for a session id.
    pub fn take_streak(&self, id: &SessionId) -> Option<Streak> {
        self.arcade.lock().expect("arcade lock").take_streak(id)
    }
}
