//! Verification of signed webhook deliveries.
//!
//! The identity provider signs every delivery with HMAC-SHA256 over
//! `{id}.{timestamp}.{body}` using a shared secret. The signature header holds
//! one or more space-separated `version,signature` pairs, and a delivery is
//! authentic if any `v1` signature matches.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use zeroize::Zeroizing;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

/// Errors while verifying a delivery.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("secret is not valid base64")]
    InvalidSecret,
    #[error("timestamp header is not a unix timestamp")]
    InvalidTimestamp,
    #[error("message timestamp too old")]
    TimestampTooOld,
    #[error("message timestamp too new")]
    TimestampTooNew,
    #[error("no matching signature found")]
    SignatureMismatch,
}

/// The integrity headers attached to a delivery.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// The shared signing secret. The decoded key is wiped on drop.
#[derive(Clone)]
pub struct WebhookSecret(Arc<Zeroizing<Vec<u8>>>);

impl WebhookSecret {
    /// Decode a secret as handed out by the provider. The `whsec_` prefix is
    /// optional.
    pub fn new(secret: &str) -> Result<Self, Error> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| Error::InvalidSecret)?;

        Ok(Self(Arc::new(Zeroizing::new(key))))
    }

    /// Build a secret from raw key bytes.
    pub fn from_bytes(key: &[u8]) -> Self {
        Self(Arc::new(Zeroizing::new(key.to_vec())))
    }

    fn mac(&self, headers: &DeliveryHeaders<'_>, body: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length, so this can't fail
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.0)
            .unwrap_or_else(|_| unreachable!("HMAC can take key of any size"));

        mac.update(headers.id.as_bytes());
        mac.update(b".");
        mac.update(headers.timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    /// Compute the `v1,<base64>` signature for a delivery.
    pub fn sign(&self, headers: &DeliveryHeaders<'_>, body: &[u8]) -> String {
        let tag = self.mac(headers, body).finalize().into_bytes();
        format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(tag))
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}

/// Checks deliveries against the shared secret.
#[derive(Clone, Debug)]
pub struct Verifier {
    secret: WebhookSecret,
    tolerance_secs: i64,
}

impl Verifier {
    pub fn new(secret: WebhookSecret, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    /// Verify a delivery against the current time.
    pub fn verify(&self, headers: &DeliveryHeaders<'_>, body: &[u8]) -> Result<(), Error> {
        self.verify_at(headers, body, OffsetDateTime::now_utc())
    }

    /// Verify a delivery as if received at `now`.
    pub fn verify_at(
        &self,
        headers: &DeliveryHeaders<'_>,
        body: &[u8],
        now: OffsetDateTime,
    ) -> Result<(), Error> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| Error::InvalidTimestamp)?;

        let now = now.unix_timestamp();
        if now.saturating_sub(timestamp) > self.tolerance_secs {
            return Err(Error::TimestampTooOld);
        }
        if timestamp.saturating_sub(now) > self.tolerance_secs {
            return Err(Error::TimestampTooNew);
        }

        let expected = self.secret.mac(headers, body).finalize().into_bytes();

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|signature| bool::from(signature.ct_eq(expected.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(Error::SignatureMismatch)
        }
    }
}
