//! Accounts, sessions, and identity.
//!
//! Opaque-token authentication with Argon2 password hashing. Password
//! resets go through a security question whose answer is hashed with
//! the same KDF, and every reset error path is padded to a fixed
//! minimum latency to resist username enumeration.
//!
//! ## Pieces
//!
//! - [`User`] — Registered account
//! - [`password`] — Argon2 hashing, verification, staleness
//! - [`token`] — Random session tokens and their stored digests
//! - [`validate`] — Input shape rules shared by handlers
//!
//! ## Server
//!
//! - [`Auth`] / [`MaybeAuth`] — actix extractors (cookie or Bearer)
//! - handlers for register / login / logout / reset / profile
mod dto;
pub mod password;
pub mod token;
mod user;
pub mod validate;

pub use dto::*;
pub use user::*;

#[cfg(feature = "database")]
mod repository;
#[cfg(feature = "database")]
pub use repository::*;

#[cfg(feature = "server")]
mod handlers;
#[cfg(feature = "server")]
mod middleware;
#[cfg(feature = "server")]
pub use handlers::*;
#[cfg(feature = "server")]
pub use middleware::*;
