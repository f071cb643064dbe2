//! In-memory profile store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{Error, ProfileStore};
use crate::profile::{ProfilePatch, ProfileRecord};

/// Keeps profiles in a map. Useful for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, ProfileRecord>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a profile by its external user id.
    pub fn get(&self, external_user_id: &str) -> Result<Option<ProfileRecord>, Error> {
        Ok(self.read()?.get(external_user_id).cloned())
    }

    /// Store a record as-is, replacing any existing one.
    pub fn insert(&self, record: ProfileRecord) -> Result<(), Error> {
        self.write()?
            .insert(record.external_user_id.clone(), record);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, ProfileRecord>>, Error> {
        self.profiles
            .read()
            .map_err(|_| Error::Unavailable("profile map poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, ProfileRecord>>, Error> {
        self.profiles
            .write()
            .map_err(|_| Error::Unavailable("profile map poisoned".to_string()))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, patch: ProfilePatch) -> Result<(), Error> {
        let mut profiles = self.write()?;

        match profiles.get_mut(&patch.external_user_id) {
            Some(record) => patch.merge_into(record),
            None => {
                let record = patch.into_record(OffsetDateTime::now_utc());
                profiles.insert(record.external_user_id.clone(), record);
            }
        }

        Ok(())
    }

    async fn update(&self, patch: ProfilePatch) -> Result<u64, Error> {
        let mut profiles = self.write()?;

        match profiles.get_mut(&patch.external_user_id) {
            Some(record) => {
                patch.merge_into(record);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, external_user_id: &str) -> Result<u64, Error> {
        Ok(self.write()?.remove(external_user_id).map_or(0, |_| 1))
    }
}
