//! `roster-api` — async HTTP client for the roster user-directory endpoint.
//!
//! One client, three operations: list/search (`GET /api/users`), create
//! (`POST /api/users`), and upsert (`PUT /api/users?id=`). The server owns
//! persistence and conflict semantics; this crate only speaks its wire
//! contract and classifies responses into [`Error`] variants.

pub mod error;
pub mod transport;
pub mod users;

pub use error::Error;
pub use transport::TransportConfig;
pub use users::{UpsertOutcome, User, UsersClient};
