//! Postgres profile store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::{types::ToSql, Client, NoTls};
use tracing::{debug, error};

use super::{Error, ProfileStore};
use crate::profile::ProfilePatch;

const TABLE: &str = "user_profiles";
const KEY: &str = "external_user_id";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_profiles (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    external_user_id TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    first_name TEXT,
    last_name TEXT,
    avatar_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_sign_in_at TIMESTAMPTZ
)";

type Param<'a> = &'a (dyn ToSql + Sync);

/// Profiles kept in the `user_profiles` table.
#[derive(Clone)]
pub struct PostgresStore {
    client: Arc<Client>,
}

impl PostgresStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Connect to the database, driving the connection on a background task.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("database connection error: {}", e);
            }
        });

        Ok(Self::new(Arc::new(client)))
    }

    /// Create the profile table if it doesn't exist yet.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn upsert(&self, patch: ProfilePatch) -> Result<(), Error> {
        let (names, mut params) = columns(&patch);
        params.insert(0, &patch.external_user_id);

        let statement = upsert_statement(&names);
        debug!("{}", statement);
        self.client.execute(statement.as_str(), &params).await?;

        Ok(())
    }

    async fn update(&self, patch: ProfilePatch) -> Result<u64, Error> {
        let (names, mut params) = columns(&patch);
        if names.is_empty() {
            return Ok(0);
        }
        params.insert(0, &patch.external_user_id);

        let statement = update_statement(&names);
        debug!("{}", statement);
        Ok(self.client.execute(statement.as_str(), &params).await?)
    }

    async fn delete(&self, external_user_id: &str) -> Result<u64, Error> {
        let statement = format!("DELETE FROM {} WHERE {} = $1", TABLE, KEY);
        Ok(self
            .client
            .execute(statement.as_str(), &[&external_user_id])
            .await?)
    }
}

/// The set columns of a patch and their values, in a fixed order.
fn columns(patch: &ProfilePatch) -> (Vec<&'static str>, Vec<Param<'_>>) {
    let mut names = Vec::new();
    let mut params: Vec<Param<'_>> = Vec::new();

    if let Some(v) = patch.email.as_set() {
        names.push("email");
        params.push(v);
    }
    if let Some(v) = patch.first_name.as_set() {
        names.push("first_name");
        params.push(v);
    }
    if let Some(v) = patch.last_name.as_set() {
        names.push("last_name");
        params.push(v);
    }
    if let Some(v) = patch.avatar_url.as_set() {
        names.push("avatar_url");
        params.push(v);
    }
    if let Some(v) = patch.created_at.as_set() {
        names.push("created_at");
        params.push(v);
    }
    if let Some(v) = patch.updated_at.as_set() {
        names.push("updated_at");
        params.push(v);
    }
    if let Some(v) = patch.last_sign_in_at.as_set() {
        names.push("last_sign_in_at");
        params.push(v);
    }

    (names, params)
}

/// Insert the key and `names` (bound from `$2`), overwriting only those
/// columns on conflict.
fn upsert_statement(names: &[&str]) -> String {
    let columns = std::iter::once(KEY)
        .chain(names.iter().copied())
        .collect::<Vec<_>>()
        .join(", ");
    let values = (1..=names.len() + 1)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let on_conflict = if names.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments = names
            .iter()
            .map(|name| format!("{0} = EXCLUDED.{0}", name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {}", assignments)
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        TABLE, columns, values, KEY, on_conflict
    )
}

/// Set `names` (bound from `$2`) on the row whose key is `$1`.
fn update_statement(names: &[&str]) -> String {
    let assignments = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} = ${}", name, i + 2))
        .collect::<Vec<_>>()
        .join(", ");

    format!("UPDATE {} SET {} WHERE {} = $1", TABLE, assignments, KEY)
}
