//! Service configuration, read from the environment.

use std::env::{self, VarError};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

use crate::signature::WebhookSecret;

const DEFAULT_ADDR: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 8080;

/// Default allowed skew between a delivery's timestamp and our clock.
const DEFAULT_TOLERANCE_SECS: i64 = 5 * 60;

/// Errors while loading configuration.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

/// Where profile records are kept.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Postgres { url: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub ip: IpAddr,
    pub port: u16,
    pub webhook: WebhookConfig,
    pub store: StoreConfig,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: WebhookSecret,
    pub tolerance_secs: i64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn try_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        let get = |name: &'static str| -> Result<Option<String>, Error> {
            match lookup(name) {
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(VarError::NotUnicode(_)) => Err(Error::Invalid(name)),
            }
        };

        let ip = parse_or(get("IP")?, "IP", DEFAULT_ADDR)?;
        let port = parse_or(get("PORT")?, "PORT", DEFAULT_PORT)?;

        let secret = get("WEBHOOK_SECRET")?.ok_or(Error::Missing("WEBHOOK_SECRET"))?;
        let secret = WebhookSecret::new(&secret).map_err(|_| Error::Invalid("WEBHOOK_SECRET"))?;
        let tolerance_secs = parse_or(
            get("WEBHOOK_TOLERANCE_SECS")?,
            "WEBHOOK_TOLERANCE_SECS",
            DEFAULT_TOLERANCE_SECS,
        )?;
        if tolerance_secs < 0 {
            return Err(Error::Invalid("WEBHOOK_TOLERANCE_SECS"));
        }

        let store = match get("STORE")?.as_deref() {
            None | Some("postgres") => StoreConfig::Postgres {
                url: get("DATABASE_URL")?.ok_or(Error::Missing("DATABASE_URL"))?,
            },
            Some("memory") => StoreConfig::Memory,
            Some(_) => return Err(Error::Invalid("STORE")),
        };

        Ok(Self {
            ip,
            port,
            webhook: WebhookConfig {
                secret,
                tolerance_secs,
            },
            store,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, Error> {
    value
        .map(|v| v.parse().map_err(|_| Error::Invalid(name)))
        .transpose()
        .map(|v| v.unwrap_or(default))
}
