//! Friend challenges: shared car sequences, join codes, rankings.
//!
//! A creator mints a six-character code; everyone who joins receives a
//! deep copy of the same ten-car template, so scores compare like for
//! like. Completed participants are ranked by score (ties broken by
//! who finished first).
//!
//! The coordinator sits strictly above the engine: it consumes the
//! template/adopt seam and never the other way round.
mod challenge;
mod coordinator;
mod participant;
mod repository;

pub use challenge::*;
pub use coordinator::*;
pub use participant::*;
pub use repository::*;
