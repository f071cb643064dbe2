mod webhook;

use crate::ServerState;
use webhook::webhook_handler;

use axum::{
    http::StatusCode,
    routing::{get, post, Router},
};

pub fn routes() -> Router<ServerState> {
    Router::new()
        .route("/api/webhooks/identity", post(webhook_handler))
        .route("/ping", get(ping_handler))
}

#[axum::debug_handler(state = ServerState)]
async fn ping_handler() -> StatusCode {
    StatusCode::OK
}
