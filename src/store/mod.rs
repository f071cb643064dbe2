//! Profile storage.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryProfileStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::profile::ProfilePatch;

/// Errors returned by a profile store.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A keyed store of profile records.
///
/// Every operation is keyed on the patch's `external_user_id`. Operations that
/// match no record succeed and report zero affected rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a record, or merge the patch's set fields into an existing one.
    async fn upsert(&self, patch: ProfilePatch) -> Result<(), Error>;

    /// Merge the patch's set fields into an existing record.
    async fn update(&self, patch: ProfilePatch) -> Result<u64, Error>;

    /// Remove a record.
    async fn delete(&self, external_user_id: &str) -> Result<u64, Error>;
}
