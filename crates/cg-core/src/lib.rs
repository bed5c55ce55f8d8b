//! Core type aliases, identifiers, and constants for carguessr.
//!
//! This crate provides the foundational types and tuning parameters
//! used throughout the carguessr workspace.

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Listing prices and guesses, in whole pounds sterling.
pub type Pounds = i64;
/// Challenge scoring units.
pub type Points = i64;
/// Consecutive correct guesses in streak mode.
pub type Streak = u32;

// ============================================================================
// TRAITS
// ============================================================================
/// Random instance generation for identifiers and test fixtures.
pub trait Arbitrary {
    /// Generate a uniformly random instance.
    fn random() -> Self;
}

/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self::from)
    }
}

/// Opaque 16-character alphanumeric session identifier.
///
/// Identifies both anonymous arcade sessions (via the X-Session-ID header)
/// and materialised challenge sessions. Construction always validates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub const LENGTH: usize = 16;
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == Self::LENGTH && s.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| Self(s.to_string()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Arbitrary for SessionId {
    fn random() -> Self {
        use rand::Rng;
        use rand::distr::Alphanumeric;
        Self(
            rand::rng()
                .sample_iter(Alphanumeric)
                .take(Self::LENGTH)
                .map(char::from)
                .collect(),
        )
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl TryFrom<String> for SessionId {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("invalid session id: {:?}", s))
    }
}
impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Six-character [A-Z0-9] friend-challenge code.
///
/// Displayed uppercase; parsing uppercases its input so lookup is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    pub const LENGTH: usize = 6;
    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    pub fn parse(s: &str) -> Option<Self> {
        let code = s.trim().to_ascii_uppercase();
        (code.len() == Self::LENGTH
            && code.bytes().all(|b| Self::ALPHABET.contains(&b)))
        .then_some(Self(code))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Arbitrary for JoinCode {
    fn random() -> Self {
        use rand::Rng;
        let ref mut rng = rand::rng();
        Self(
            (0..Self::LENGTH)
                .map(|_| Self::ALPHABET[rng.random_range(0..Self::ALPHABET.len())] as char)
                .collect(),
        )
    }
}

impl Display for JoinCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl TryFrom<String> for JoinCode {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("invalid challenge code: {:?}", s))
    }
}
impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.0
    }
}

// ============================================================================
// GAME MODES
// ============================================================================
/// The three ways to play. Zero and streak are ephemeral per-session
/// accumulators; challenge is a materialised ten-car session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Zero,
    Streak,
    Challenge,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Streak => write!(f, "streak"),
            Self::Challenge => write!(f, "challenge"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "streak" => Ok(Self::Streak),
            "challenge" => Ok(Self::Challenge),
            other => Err(format!("unknown game mode: {:?}", other)),
        }
    }
}

// ============================================================================
// GAME PARAMETERS
// ============================================================================
/// Cars dealt into every challenge session.
pub const CARS_PER_CHALLENGE: usize = 10;
/// Points awarded for an exact guess.
pub const POINTS_PERFECT: Points = 5000;
/// Exponential decay constant: points = 5000 * exp(-percentage / SCORE_DECAY).
pub const SCORE_DECAY: f64 = 20.0;
/// Maximum error percentage still counted as correct in streak mode.
pub const STREAK_TOLERANCE: f64 = 10.0;
/// Upper bound on submitted guesses (ten million pounds).
pub const MAX_GUESS: Pounds = 10_000_000;
/// Placeholder price emitted by scrapers when parsing fails; dropped on ingest.
pub const SENTINEL_PRICE: Pounds = 700;

// ============================================================================
// LIFECYCLES
// ============================================================================
/// Solo challenge sessions expire a day after creation.
pub const SOLO_SESSION_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 3600);
/// Friend challenges accept joins for two days.
pub const FRIEND_CHALLENGE_TTL: std::time::Duration = std::time::Duration::from_secs(48 * 3600);
/// Auth session tokens live a week.
pub const TOKEN_TTL: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 3600);
/// Disk cache snapshots are trusted for a week.
pub const CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 3600);
/// Background scrape period per source.
pub const REFRESH_PERIOD: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 3600);
/// Global cooldown between manual refresh triggers.
pub const REFRESH_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(30 * 60);
/// Idle zero/streak state is reaped after this long without a guess.
pub const ARCADE_IDLE_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 3600);

// ============================================================================
// FRIEND CHALLENGES
// ============================================================================
/// Smallest allowed participant cap.
pub const MIN_PARTICIPANTS: i32 = 2;
/// Largest allowed participant cap.
pub const MAX_PARTICIPANTS: i32 = 50;
/// Bounded retries when minting a join code collides.
pub const CODE_ATTEMPTS: usize = 16;

// ============================================================================
// REQUEST PLANE
// ============================================================================
/// Public API bucket: requests per minute and burst capacity.
pub const PUBLIC_RATE: (u32, u32) = (60, 60);
/// Auth bucket: stricter, login/register/reset.
pub const AUTH_RATE: (u32, u32) = (10, 10);
/// Admin bucket.
pub const ADMIN_RATE: (u32, u32) = (2, 2);
/// Rate-limit buckets idle this long are reaped.
pub const BUCKET_IDLE_TTL: std::time::Duration = std::time::Duration::from_secs(15 * 60);
/// JSON body size cap.
pub const BODY_LIMIT: usize = 1 << 20;
/// Grace period for draining in-flight requests at shutdown.
pub const DRAIN_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);
/// Minimum latency on password-reset error paths (enumeration resistance).
pub const RESET_TIMING_FLOOR: std::time::Duration = std::time::Duration::from_millis(200);
/// Minimum acceptable ADMIN_KEY length.
pub const ADMIN_KEY_MIN_LENGTH: usize = 32;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::random();
        assert_eq!(id.as_str().len(), SessionId::LENGTH);
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn session_id_rejects_bad_shapes() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("short").is_none());
        assert!(SessionId::parse("abcdefghij123456x").is_none());
        assert!(SessionId::parse("abcdefgh-j123456").is_none());
    }

    #[test]
    fn join_code_uppercases() {
        let code = JoinCode::parse("abc123").unwrap();
        assert_eq!(code.as_str(), "ABC123");
        assert_eq!(JoinCode::parse("ABC123"), Some(code));
    }

    #[test]
    fn join_code_rejects_bad_shapes() {
        assert!(JoinCode::parse("ABC12").is_none());
        assert!(JoinCode::parse("ABC1234").is_none());
        assert!(JoinCode::parse("ABC-12").is_none());
    }

    #[test]
    fn join_code_random_stays_in_alphabet() {
        for _ in 0..64 {
            let code = JoinCode::random();
            assert!(JoinCode::parse(code.as_str()).is_some());
        }
    }

    #[test]
    fn id_casts_preserve_uuid() {
        struct A;
        struct B;
        let a: ID<A> = ID::default();
        let b: ID<B> = a.cast();
        assert_eq!(a.inner(), b.inner());
    }
}
