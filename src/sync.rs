//! Applying identity events to the profile store.

use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::error::SyncError;
use crate::event::{Event, UserData};
use crate::profile::ProfilePatch;
use crate::store::ProfileStore;

/// Apply a single event, performing at most one store write.
///
/// `session.created` and `user.deleted` for unknown users are not errors, and
/// event types we don't sync are ignored.
pub async fn apply(
    store: &dyn ProfileStore,
    event: Event,
    now: OffsetDateTime,
) -> Result<(), SyncError> {
    match event {
        Event::UserCreated(user) => sync_user(store, &user, true, now).await,
        Event::UserUpdated(user) => sync_user(store, &user, false, now).await,
        Event::SessionCreated(session) => {
            let updated = store
                .update(ProfilePatch::signed_in(session.user_id.as_str(), now))
                .await
                .map_err(|e| {
                    error!("error updating last sign in for {}: {}", session.user_id, e);
                    SyncError::SyncWriteFailed
                })?;

            // zero rows is fine: the user may not have been synced yet
            debug!("{} profile(s) matched session for {}", updated, session.user_id);
            info!("last sign in updated for user {}", session.user_id);
            Ok(())
        }
        Event::UserDeleted(deleted) => {
            let removed = store.delete(&deleted.id).await.map_err(|e| {
                error!("error deleting profile {}: {}", deleted.id, e);
                SyncError::SyncWriteFailed
            })?;

            debug!("{} profile(s) removed for {}", removed, deleted.id);
            info!("user {} deleted", deleted.id);
            Ok(())
        }
        Event::Other(kind) => {
            debug!("ignoring {} event", kind);
            Ok(())
        }
    }
}

async fn sync_user(
    store: &dyn ProfileStore,
    user: &UserData,
    created: bool,
    now: OffsetDateTime,
) -> Result<(), SyncError> {
    let patch = ProfilePatch::from_user(user, created, now).map_err(|e| {
        error!("invalid user payload for {}: {}", user.id, e);
        SyncError::Internal
    })?;

    store.upsert(patch).await.map_err(|e| {
        error!("error syncing user {}: {}", user.id, e);
        SyncError::SyncWriteFailed
    })?;

    info!("user {} synced", user.id);
    Ok(())
}
