use super::*;
use cg_core::ID;
use cg_core::Points;
use cg_core::SessionId;
use cg_pg::*;
use std::sync::Arc;
use tokio_postgres::Client;

/// Repository trait for challenge-session persistence.
/// Abstracts SQL from the engine; the in-memory session table is a
/// cache over these operations.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    async fn create_session(&self, session: &ChallengeSession) -> Result<(), PgErr>;
    async fn load_session(&self, id: &SessionId) -> Result<Option<ChallengeSession>, PgErr>;
    async fn save_progress(&self, session: &ChallengeSession) -> Result<(), PgErr>;
    async fn add_guess(&self, id: &SessionId, guess: &ChallengeGuess) -> Result<(), PgErr>;
    async fn session_score(&self, id: &SessionId) -> Result<Option<(Points, bool)>, PgErr>;
}

impl SessionRepository for Arc<Client> {
    async fn create_session(&self, session: &ChallengeSession) -> Result<(), PgErr> {
        let cars = serde_json::to_string(session.cars()).unwrap_or_default();
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                SESSIONS,
                " (id, user_id, difficulty, cars, current_car, total_score, complete, created_at, expires_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            ),
            &[
                &session.id().as_str(),
                &session.user().map(|u| u.inner()),
                &session.difficulty().to_string(),
                &cars,
                &(session.current_car() as i32),
                &session.total_score(),
                &session.complete(),
                &session.created_at(),
                &session.expires_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn load_session(&self, id: &SessionId) -> Result<Option<ChallengeSession>, PgErr> {
        let row = match self
            .query_opt(
                const_format::concatcp!(
                    "SELECT id, user_id, difficulty, cars, current_car, total_score, complete,
                            created_at, expires_at, completed_at
                     FROM ",
                    SESSIONS,
                    " WHERE id = $1"
                ),
                &[&id.as_str()],
            )
            .await?
        {
            Some(row) => row,
            None => return Ok(None),
        };
        let guesses = self
            .query(
                const_format::concatcp!(
                    "SELECT car_index, car_id, guessed, actual, difference, percentage, points
                     FROM ",
                    GUESSES,
                    " WHERE session_id = $1 ORDER BY car_index"
                ),
                &[&id.as_str()],
            )
            .await?
            .iter()
            .map(|g| ChallengeGuess {
                car_index: g.get(0),
                car_id: g.get(1),
                guessed_price: g.get(2),
                actual_price: g.get(3),
                difference: g.get(4),
                percentage: g.get(5),
                points: g.get(6),
            })
            .collect();
        let difficulty = match row.get::<_, String>(2).parse() {
            Ok(difficulty) => difficulty,
            Err(e) => {
                log::error!("[engine] unreadable difficulty for session {}: {}", id, e);
                return Ok(None);
            }
        };
        let cars = match serde_json::from_str(row.get(3)) {
            Ok(cars) => cars,
            Err(e) => {
                log::error!("[engine] unreadable car list for session {}: {}", id, e);
                return Ok(None);
            }
        };
        Ok(Some(ChallengeSession::hydrate(
            id.clone(),
            row.get::<_, Option<uuid::Uuid>>(1).map(ID::from),
            difficulty,
            cars,
            row.get::<_, i32>(4) as usize,
            row.get(5),
            row.get(6),
            guesses,
            row.get(7),
            row.get(8),
            row.get(9),
        )))
    }

    async fn save_progress(&self, session: &ChallengeSession) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                SESSIONS,
                " SET current_car = $2, total_score = $3, complete = $4, completed_at = $5
                 WHERE id = $1"
            ),
            &[
                &session.id().as_str(),
                &(session.current_car() as i32),
                &session.total_score(),
                &session.complete(),
                &session.completed_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn add_guess(&self, id: &SessionId, guess: &ChallengeGuess) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                GUESSES,
                " (session_id, car_index, car_id, guessed, actual, difference, percentage, points)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            ),
            &[
                &id.as_str(),
                &guess.car_index,
                &guess.car_id,
                &guess.guessed_price,
                &guess.actual_price,
                &guess.difference,
                &guess.percentage,
                &guess.points,
            ],
        )
        .await
        .map(|_| ())
    }

    async fn session_score(&self, id: &SessionId) -> Result<Option<(Points, bool)>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT total_score, complete FROM ",
                SESSIONS,
                " WHERE id = $1"
            ),
            &[&id.as_str()],
        )
        .await
        .map(|opt| opt.map(|row| (row.get(0), row.get(1))))
    }
}
