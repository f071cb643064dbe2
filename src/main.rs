//! profile-sync mirrors user profiles from an identity provider into Postgres
//!
//! Signed webhook deliveries from the provider are verified and applied to a
//! `user_profiles` table, one upsert, update or delete per event.

use std::env::var;
use std::sync::Arc;

use profile_sync::{
    config::{Config, StoreConfig},
    routes,
    shutdown::{self, Shutdown},
    signature::Verifier,
    store::{InMemoryProfileStore, PostgresStore, ProfileStore},
    ServerState,
};

use anyhow::Context;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Config::try_env().context("invalid configuration")?;

    let store: Arc<dyn ProfileStore> = match &config.store {
        StoreConfig::Postgres { url } => {
            let store = PostgresStore::connect(url)
                .await
                .context("failed to connect to database")?;
            store
                .migrate()
                .await
                .context("failed to create profile table")?;
            Arc::new(store)
        }
        StoreConfig::Memory => {
            warn!("using in-memory profile store, profiles will be lost on exit");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    let shutdown = Shutdown::new();
    let state = ServerState {
        verifier: Verifier::new(config.webhook.secret.clone(), config.webhook.tolerance_secs),
        store,
        guard: shutdown.guard(),
    };

    let app = routes().with_state(state).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        ),
    );

    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;

    info!("serving on {}", config.addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("server unexpectedly stopped")?;

    shutdown.drain().await;
    info!("all deliveries finished");

    Ok(())
}
