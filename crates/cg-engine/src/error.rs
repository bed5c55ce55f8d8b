use cg_listings::CorpusError;

/// Errors the engine surfaces to the request plane.
/// Each maps onto exactly one HTTP status.
#[derive(Debug)]
pub enum EngineError {
    BadListingId,
    BadMode,
    PriceOutOfRange,
    UnknownListing,
    SessionNotFound,
    SessionComplete,
    SessionExpired,
    Corpus(CorpusError),
    Storage(tokio_postgres::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadListingId => write!(f, "malformed listing id"),
            Self::BadMode => write!(f, "unsupported game mode for this endpoint"),
            Self::PriceOutOfRange => write!(f, "guess must be between 0 and 10,000,000"),
            Self::UnknownListing => write!(f, "listing not found"),
            Self::SessionNotFound => write!(f, "challenge session not found"),
            Self::SessionComplete => write!(f, "challenge already complete"),
            Self::SessionExpired => write!(f, "challenge session expired"),
            Self::Corpus(e) => write!(f, "{}", e),
            Self::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<CorpusError> for EngineError {
    fn from(e: CorpusError) -> Self {
        Self::Corpus(e)
    }
}

impl From<tokio_postgres::Error> for EngineError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Storage(e)
    }
}
