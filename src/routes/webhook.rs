//! A route for receiving identity events from the provider.

use crate::error::SyncError;
use crate::event::{self, Event};
use crate::signature::DeliveryHeaders;
use crate::sync;
use crate::ServerState;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{error, info};

const ID_HEADERS: [&str; 2] = ["svix-id", "webhook-id"];
const TIMESTAMP_HEADERS: [&str; 2] = ["svix-timestamp", "webhook-timestamp"];
const SIGNATURE_HEADERS: [&str; 2] = ["svix-signature", "webhook-signature"];

/// A handler that verifies a delivery and applies its event to the profile
/// store.
///
/// Returns 400 Bad Request when the delivery can't be authenticated and 500
/// Internal Server Error when the store write fails, so the provider retries.
#[axum::debug_handler(state = ServerState)]
pub async fn webhook_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, SyncError> {
    let delivery = delivery_headers(&headers).ok_or_else(|| {
        error!("delivery is missing signature headers");
        SyncError::MissingSignatureHeaders
    })?;

    state.verifier.verify(&delivery, &body).map_err(|e| {
        error!("error verifying delivery {}: {}", delivery.id, e);
        SyncError::InvalidSignature
    })?;

    let event = Event::from_slice(&body).map_err(|e| {
        error!("error decoding delivery {}: {}", delivery.id, e);
        match e {
            event::Error::Envelope(_) => SyncError::InvalidSignature,
            _ => SyncError::Internal,
        }
    })?;

    info!("received {} event (delivery {})", event.kind(), delivery.id);
    sync::apply(state.store.as_ref(), event, OffsetDateTime::now_utc()).await?;

    Ok(Json(json!({ "message": "Webhook processed successfully" })))
}

/// Collect the integrity headers, treating empty values as missing.
fn delivery_headers(headers: &HeaderMap) -> Option<DeliveryHeaders<'_>> {
    Some(DeliveryHeaders {
        id: header(headers, &ID_HEADERS)?,
        timestamp: header(headers, &TIMESTAMP_HEADERS)?,
        signature: header(headers, &SIGNATURE_HEADERS)?,
    })
}

fn header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
}
