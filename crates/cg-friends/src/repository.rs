use super::*;
use cg_core::ID;
use cg_core::JoinCode;
use cg_core::SessionId;
use cg_core::Unique;
use cg_auth::User;
use cg_pg::*;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tokio_postgres::Client;

const CHALLENGE_COLS: &str =
    "id, code, title, creator_id, template_session, difficulty, max_participants, created_at, expires_at, active";

fn challenge_from(row: &tokio_postgres::Row) -> Option<FriendChallenge> {
    let code = JoinCode::parse(row.get(1))?;
    let template = SessionId::parse(row.get(4))?;
    let difficulty = row.get::<_, String>(5).parse().ok()?;
    Some(FriendChallenge::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        code,
        row.get(2),
        ID::from(row.get::<_, uuid::Uuid>(3)),
        template,
        difficulty,
        row.get(6),
        row.get(7),
        row.get(8),
        row.get(9),
    ))
}

fn participant_from(row: &tokio_postgres::Row) -> Option<Participant> {
    Some(Participant::hydrate(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        ID::from(row.get::<_, uuid::Uuid>(1)),
        SessionId::parse(row.get(2))?,
        row.get(3),
        row.get(4),
        row.get(5),
        row.get(6),
    ))
}

const PARTICIPANT_COLS: &str =
    "challenge_id, user_id, session_id, joined_at, final_score, rank, completed_at";

/// Repository trait for friend-challenge persistence.
#[allow(async_fn_in_trait)]
pub trait FriendsRepository {
    async fn code_exists(&self, code: &JoinCode) -> Result<bool, PgErr>;
    async fn create_challenge(&self, challenge: &FriendChallenge) -> Result<(), PgErr>;
    async fn by_code(&self, code: &JoinCode) -> Result<Option<FriendChallenge>, PgErr>;
    async fn add_participant(&self, participant: &Participant) -> Result<(), PgErr>;
    async fn participants(&self, challenge: ID<FriendChallenge>)
    -> Result<Vec<Participant>, PgErr>;
    async fn participation(
        &self,
        challenge: ID<FriendChallenge>,
        user: ID<User>,
    ) -> Result<Option<Participant>, PgErr>;
    async fn refresh_results(&self, challenge: ID<FriendChallenge>) -> Result<(), PgErr>;
    async fn standings(&self, challenge: ID<FriendChallenge>) -> Result<Vec<Standing>, PgErr>;
    async fn store_ranks(
        &self,
        challenge: ID<FriendChallenge>,
        standings: &[Standing],
    ) -> Result<(), PgErr>;
    async fn mine(&self, user: ID<User>)
    -> Result<Vec<(FriendChallenge, Participant, usize)>, PgErr>;
}

impl FriendsRepository for Arc<Client> {
    async fn code_exists(&self, code: &JoinCode) -> Result<bool, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT 1 FROM ",
                CHALLENGES,
                " WHERE code = $1 AND active AND expires_at > NOW()"
            ),
            &[&code.as_str()],
        )
        .await
        .map(|opt| opt.is_some())
    }

    async fn create_challenge(&self, challenge: &FriendChallenge) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                CHALLENGES,
                " (",
                CHALLENGE_COLS,
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ),
            &[
                &challenge.id().inner(),
                &challenge.code().as_str(),
                &challenge.title(),
                &challenge.creator().inner(),
                &challenge.template().as_str(),
                &challenge.difficulty().to_string(),
                &challenge.max_participants(),
                &challenge.created_at(),
                &challenge.expires_at(),
                &challenge.active(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn by_code(&self, code: &JoinCode) -> Result<Option<FriendChallenge>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                CHALLENGE_COLS,
                " FROM ",
                CHALLENGES,
                " WHERE code = $1 AND active"
            ),
            &[&code.as_str()],
        )
        .await
        .map(|opt| opt.as_ref().and_then(challenge_from))
    }

    async fn add_participant(&self, participant: &Participant) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                PARTICIPANTS,
                " (challenge_id, user_id, session_id, joined_at) VALUES ($1, $2, $3, $4)"
            ),
            &[
                &participant.challenge().inner(),
                &participant.user().inner(),
                &participant.session().as_str(),
                &participant.joined_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn participants(
        &self,
        challenge: ID<FriendChallenge>,
    ) -> Result<Vec<Participant>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT ",
                PARTICIPANT_COLS,
                " FROM ",
                PARTICIPANTS,
                " WHERE challenge_id = $1 ORDER BY joined_at"
            ),
            &[&challenge.inner()],
        )
        .await
        .map(|rows| rows.iter().filter_map(participant_from).collect())
    }

    async fn participation(
        &self,
        challenge: ID<FriendChallenge>,
        user: ID<User>,
    ) -> Result<Option<Participant>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                PARTICIPANT_COLS,
                " FROM ",
                PARTICIPANTS,
                " WHERE challenge_id = $1 AND user_id = $2"
            ),
            &[&challenge.inner(), &user.inner()],
        )
        .await
        .map(|opt| opt.as_ref().and_then(participant_from))
    }

    async fn refresh_results(&self, challenge: ID<FriendChallenge>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                PARTICIPANTS,
                " p SET final_score = s.total_score, completed_at = s.completed_at FROM ",
                SESSIONS,
                " s WHERE p.challenge_id = $1 AND p.session_id = s.id
                     AND s.complete AND p.final_score IS NULL"
            ),
            &[&challenge.inner()],
        )
        .await
        .map(|_| ())
    }

    async fn standings(&self, challenge: ID<FriendChallenge>) -> Result<Vec<Standing>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT p.user_id, u.display_name, p.final_score, p.rank, p.completed_at, s.complete
                 FROM ",
                PARTICIPANTS,
                " p JOIN ",
                USERS,
                " u ON u.id = p.user_id JOIN ",
                SESSIONS,
                " s ON s.id = p.session_id WHERE p.challenge_id = $1 ORDER BY p.joined_at"
            ),
            &[&challenge.inner()],
        )
        .await
        .map(|rows| {
            rows.iter()
                .map(|row| Standing {
                    user: ID::from(row.get::<_, uuid::Uuid>(0)),
                    display_name: row.get(1),
                    final_score: row.get(2),
                    rank_position: row.get(3),
                    completed_at: row.get::<_, Option<SystemTime>>(4).map(|at| {
                        at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
                    }),
                    is_complete: row.get(5),
                })
                .collect()
        })
    }

    async fn store_ranks(
        &self,
        challenge: ID<FriendChallenge>,
        standings: &[Standing],
    ) -> Result<(), PgErr> {
        for standing in standings.iter().filter(|s| s.rank_position.is_some()) {
            self.execute(
                const_format::concatcp!(
                    "UPDATE ",
                    PARTICIPANTS,
                    " SET rank = $3 WHERE challenge_id = $1 AND user_id = $2"
                ),
                &[
                    &challenge.inner(),
                    &standing.user.inner(),
                    &standing.rank_position,
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn mine(
        &self,
        user: ID<User>,
    ) -> Result<Vec<(FriendChallenge, Participant, usize)>, PgErr> {
        self.query(
            const_format::concatcp!(
                "SELECT c.id, c.code, c.title, c.creator_id, c.template_session, c.difficulty,
                        c.max_participants, c.created_at, c.expires_at, c.active,
                        p.challenge_id, p.user_id, p.session_id, p.joined_at, p.final_score,
                        p.rank, p.completed_at,
                        (SELECT COUNT(*) FROM ",
                PARTICIPANTS,
                " x WHERE x.challenge_id = c.id) FROM ",
                CHALLENGES,
                " c JOIN ",
                PARTICIPANTS,
                " p ON p.challenge_id = c.id
                 WHERE p.user_id = $1 AND c.active ORDER BY c.created_at DESC"
            ),
            &[&user.inner()],
        )
        .await
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let challenge = challenge_from(row)?;
                    let enrolment = Participant::hydrate(
                        ID::from(row.get::<_, uuid::Uuid>(10)),
                        ID::from(row.get::<_, uuid::Uuid>(11)),
                        SessionId::parse(row.get(12))?,
                        row.get(13),
                        row.get(14),
                        row.get(15),
                        row.get(16),
                    );
                    let members = row.get::<_, i64>(17) as usize;
                    Some((challenge, enrolment, members))
                })
                .collect()
        })
    }
}
