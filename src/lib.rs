//! # profile-sync
//!
//! profile-sync mirrors user profiles from an identity provider into Postgres
//!
//! ## About
//!
//! The identity provider sends a signed webhook delivery whenever a user is
//! created, updated or deleted, or signs in. profile-sync verifies each
//! delivery against the shared secret and applies it to a `user_profiles`
//! table as a single upsert, update or delete, so applications can read
//! profile data without calling the provider.

pub mod config;
pub mod error;
pub mod event;
pub mod profile;
mod routes;
pub mod shutdown;
pub mod signature;
pub mod store;
pub mod sync;

pub use routes::routes;

use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub verifier: crate::signature::Verifier,
    pub store: Arc<dyn crate::store::ProfileStore>,

    // Keeps shutdown waiting while a delivery is in flight
    pub guard: crate::shutdown::Guard,
}
