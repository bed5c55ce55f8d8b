//! Leaderboard entries and rank queries.
//!
//! Append-only: every accepted submission becomes a row, boards read
//! the top N for a (mode, difficulty) pair, and ranks are dense
//! (1, 2, 2, 3) over each player's best score. Challenge boards order
//! high-to-low; streak and zero boards low-to-high.
mod entry;
mod repository;

pub use entry::*;
pub use repository::*;
