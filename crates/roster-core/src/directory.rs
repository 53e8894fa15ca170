//! The seam between the controllers and HTTP.
//!
//! Controllers talk to a [`UserDirectory`], not to reqwest. The production
//! implementation is [`roster_api::UsersClient`]; tests substitute
//! in-memory doubles.

use std::future::Future;

use roster_api::{UpsertOutcome, User, UsersClient};

use crate::error::CoreError;

/// Remote collection of user records, reached only through HTTP.
///
/// Arguments are owned so implementations can be driven from spawned
/// tasks; futures are `Send` for the same reason.
pub trait UserDirectory: Send + Sync + 'static {
    /// Fetch the listing filtered by `query` (empty = unfiltered).
    fn list(&self, query: String) -> impl Future<Output = Result<Vec<User>, CoreError>> + Send;

    /// Create a new record; the server assigns the id.
    fn create(
        &self,
        name: String,
        email: String,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Insert-or-update the record addressed by `id`; the server reports
    /// which branch it took.
    fn upsert(
        &self,
        id: i64,
        name: String,
        email: String,
    ) -> impl Future<Output = Result<UpsertOutcome, CoreError>> + Send;
}

impl UserDirectory for UsersClient {
    async fn list(&self, query: String) -> Result<Vec<User>, CoreError> {
        Ok(UsersClient::list(self, &query).await?)
    }

    async fn create(&self, name: String, email: String) -> Result<(), CoreError> {
        Ok(UsersClient::create(self, &name, &email).await?)
    }

    async fn upsert(&self, id: i64, name: String, email: String) -> Result<UpsertOutcome, CoreError> {
        Ok(UsersClient::upsert(self, id, &name, &email).await?)
    }
}
