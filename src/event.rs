//! Identity events delivered by the provider.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors while decoding an event.
#[derive(Error, Debug)]
pub enum Error {
    /// The body isn't an `{ "type": ..., "data": ... }` envelope.
    #[error("malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The envelope names a known event but its data has the wrong shape.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("timestamp {0} out of range")]
    Timestamp(i64),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// A decoded identity event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    UserCreated(UserData),
    UserUpdated(UserData),
    SessionCreated(SessionData),
    UserDeleted(DeletedData),
    /// Any event type we don't sync. Accepted and ignored.
    Other(String),
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Milliseconds since the unix epoch.
    pub created_at: i64,
    /// Milliseconds since the unix epoch.
    #[serde(default)]
    pub last_sign_in_at: Option<i64>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SessionData {
    pub user_id: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct DeletedData {
    pub id: String,
}

impl Event {
    pub const USER_CREATED: &'static str = "user.created";
    pub const USER_UPDATED: &'static str = "user.updated";
    pub const SESSION_CREATED: &'static str = "session.created";
    pub const USER_DELETED: &'static str = "user.deleted";

    /// Decode an event from a verified request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        let envelope: Envelope = serde_json::from_slice(body).map_err(Error::Envelope)?;

        Ok(match envelope.kind.as_str() {
            Self::USER_CREATED => Self::UserCreated(payload(Self::USER_CREATED, envelope.data)?),
            Self::USER_UPDATED => Self::UserUpdated(payload(Self::USER_UPDATED, envelope.data)?),
            Self::SESSION_CREATED => {
                Self::SessionCreated(payload(Self::SESSION_CREATED, envelope.data)?)
            }
            Self::USER_DELETED => Self::UserDeleted(payload(Self::USER_DELETED, envelope.data)?),
            _ => Self::Other(envelope.kind),
        })
    }

    /// The event type as sent by the provider.
    pub fn kind(&self) -> &str {
        match self {
            Self::UserCreated(_) => Self::USER_CREATED,
            Self::UserUpdated(_) => Self::USER_UPDATED,
            Self::SessionCreated(_) => Self::SESSION_CREATED,
            Self::UserDeleted(_) => Self::USER_DELETED,
            Self::Other(kind) => kind,
        }
    }
}

fn payload<T>(kind: &'static str, data: Value) -> Result<T, Error>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(data).map_err(|source| Error::Payload { kind, source })
}

impl UserData {
    /// The address referenced by `primary_email_address_id`, if any.
    pub fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref()?;

        self.email_addresses
            .iter()
            .find(|email| email.id == primary)
            .map(|email| email.email_address.as_str())
    }
}

/// Convert a provider timestamp in epoch milliseconds.
pub fn from_millis(millis: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|_| Error::Timestamp(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn decode(value: Value) -> Result<Event, Error> {
        Event::from_slice(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn user_created() {
        let event = decode(json!({
            "type": "user.created",
            "object": "event",
            "data": {
                "id": "user_1",
                "email_addresses": [
                    { "id": "e0", "email_address": "old@x.com", "verification": null },
                    { "id": "e1", "email_address": "a@x.com" }
                ],
                "primary_email_address_id": "e1",
                "first_name": "Ada",
                "last_name": null,
                "image_url": "https://img.example/ada.png",
                "created_at": 1_700_000_000_000i64,
                "last_sign_in_at": null
            }
        }))
        .unwrap();

        let Event::UserCreated(user) = event else {
            panic!("expected user.created");
        };
        assert_eq!(user.id, "user_1");
        assert_eq!(user.primary_email(), Some("a@x.com"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name, None);
        assert_eq!(user.last_sign_in_at, None);
    }

    #[test]
    fn primary_email_unresolved() {
        let user = UserData {
            id: "user_1".to_string(),
            email_addresses: vec![EmailAddress {
                id: "e1".to_string(),
                email_address: "a@x.com".to_string(),
            }],
            primary_email_address_id: Some("e2".to_string()),
            first_name: None,
            last_name: None,
            image_url: None,
            created_at: 0,
            last_sign_in_at: None,
        };
        assert_eq!(user.primary_email(), None);

        let user = UserData {
            primary_email_address_id: None,
            ..user
        };
        assert_eq!(user.primary_email(), None);
    }

    #[test]
    fn session_and_delete() {
        let event = decode(json!({
            "type": "session.created",
            "data": { "id": "sess_1", "user_id": "user_1", "status": "active" }
        }))
        .unwrap();
        assert_eq!(
            event,
            Event::SessionCreated(SessionData {
                user_id: "user_1".to_string()
            })
        );

        let event = decode(json!({
            "type": "user.deleted",
            "data": { "id": "user_1", "deleted": true, "object": "user" }
        }))
        .unwrap();
        assert_eq!(
            event,
            Event::UserDeleted(DeletedData {
                id: "user_1".to_string()
            })
        );
    }

    #[test]
    fn unknown_types_are_kept() {
        let event = decode(json!({ "type": "organization.created", "data": { "id": 7 } })).unwrap();
        assert_eq!(event, Event::Other("organization.created".to_string()));
        assert_eq!(event.kind(), "organization.created");

        let event = decode(json!({ "type": "email.created" })).unwrap();
        assert_eq!(event.kind(), "email.created");
    }

    #[test]
    fn malformed_envelope() {
        assert!(matches!(
            Event::from_slice(b"not json"),
            Err(Error::Envelope(_))
        ));
        assert!(matches!(
            decode(json!({ "data": {} })),
            Err(Error::Envelope(_))
        ));
        assert!(matches!(
            decode(json!({ "type": 3, "data": {} })),
            Err(Error::Envelope(_))
        ));
    }

    #[test]
    fn malformed_payload() {
        let err = decode(json!({ "type": "session.created", "data": {} })).unwrap_err();
        assert!(matches!(
            err,
            Error::Payload {
                kind: "session.created",
                ..
            }
        ));

        let err = decode(json!({ "type": "user.updated", "data": { "id": "user_1" } })).unwrap_err();
        assert!(matches!(err, Error::Payload { kind: "user.updated", .. }));
    }

    #[test]
    fn millis() {
        let at = from_millis(1_700_000_000_123).unwrap();
        assert_eq!(at.unix_timestamp(), 1_700_000_000);
        assert_eq!(at.millisecond(), 123);

        assert!(matches!(from_millis(i64::MAX), Err(Error::Timestamp(_))));
    }
}
