//! Configuration management for Outreach Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! # Example
//!
//! ```no_run
//! use outreach_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Sending domain: {}", settings.identity.email_domain);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::info;

use crate::models::ResponseStatus;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub identity: IdentityStoreSettings,
    pub contacts: ContactStoreSettings,
    pub transport: TransportSettings,
    pub outreach: OutreachSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` in debug builds)
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            identity: IdentityStoreSettings::from_env()?,
            contacts: ContactStoreSettings::from_env()?,
            transport: TransportSettings::from_env()?,
            outreach: OutreachSettings::from_env()?,
        })
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Shared secret expected in `x-internal-api-key`; unset disables the check
    pub internal_api_key: Option<String>,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
            internal_api_key: env::var("INTERNAL_API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}

/// Remote identity store (availability, creation, lookup)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityStoreSettings {
    /// Base URL; unset runs an in-memory store (development only)
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Fixed domain appended to every username
    pub email_domain: String,
    pub request_timeout_secs: Option<u64>,
}

impl IdentityStoreSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::var("IDENTITY_STORE_URL").ok().filter(|u| !u.is_empty()),
            api_key: env::var("IDENTITY_STORE_API_KEY").ok(),
            email_domain: env::var("IDENTITY_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "recruit.example.com".to_string()),
            request_timeout_secs: optional_parse("HTTP_TIMEOUT_SECS")?,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Remote coach contact store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactStoreSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    /// JSON seed for the in-memory store used when `base_url` is unset
    pub seed_path: Option<String>,
}

impl ContactStoreSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::var("CONTACT_STORE_URL").ok().filter(|u| !u.is_empty()),
            api_key: env::var("CONTACT_STORE_API_KEY").ok(),
            request_timeout_secs: optional_parse("HTTP_TIMEOUT_SECS")?,
            seed_path: env::var("CONTACT_SEED_PATH").ok().filter(|p| !p.is_empty()),
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Which outbound mail transport to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Mailgun-style HTTP messages API
    Http,
    Smtp,
    /// Log only, never deliver
    Noop,
}

impl std::str::FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" | "mailgun" => Ok(TransportKind::Http),
            "smtp" => Ok(TransportKind::Smtp),
            "noop" | "" => Ok(TransportKind::Noop),
            other => bail!("unknown MAIL_TRANSPORT: {}", other),
        }
    }
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    pub kind: TransportKind,
    pub api_base_url: String,
    pub api_key: Option<String>,
    /// Sending domain registered with the mail provider
    pub sending_domain: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub use_starttls: bool,
    pub request_timeout_secs: Option<u64>,
}

impl TransportSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            kind: env::var("MAIL_TRANSPORT")
                .unwrap_or_else(|_| "noop".to_string())
                .parse()?,
            api_base_url: env::var("MAIL_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.mailgun.net/v3".to_string()),
            api_key: env::var("MAIL_API_KEY").ok(),
            sending_domain: env::var("MAIL_SENDING_DOMAIN").ok(),
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            use_starttls: env::var("SMTP_USE_STARTTLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid SMTP_USE_STARTTLS")?,
            request_timeout_secs: optional_parse("HTTP_TIMEOUT_SECS")?,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Bulk-send behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachSettings {
    /// Recipients in flight at once; 1 keeps the send strictly sequential
    pub max_concurrency: usize,
    /// Extra attempts per recipient on transport errors; 0 disables retry
    pub send_max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Status a contact moves to after a successful send
    pub contacted_status: ResponseStatus,
    /// JSON file mapping school ids to display names
    pub school_directory_path: Option<String>,
}

impl Default for OutreachSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            send_max_retries: 0,
            retry_backoff_ms: 200,
            contacted_status: ResponseStatus::Contacted,
            school_directory_path: None,
        }
    }
}

impl OutreachSettings {
    fn from_env() -> Result<Self> {
        let max_concurrency: usize = env::var("OUTREACH_MAX_CONCURRENCY")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("Invalid OUTREACH_MAX_CONCURRENCY")?;
        if max_concurrency == 0 {
            bail!("OUTREACH_MAX_CONCURRENCY must be at least 1");
        }

        let contacted_status: ResponseStatus = env::var("OUTREACH_CONTACTED_STATUS")
            .unwrap_or_else(|_| "contacted".to_string())
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Invalid OUTREACH_CONTACTED_STATUS")?;
        if !matches!(
            contacted_status,
            ResponseStatus::Sent | ResponseStatus::Contacted
        ) {
            bail!("OUTREACH_CONTACTED_STATUS must be 'sent' or 'contacted'");
        }

        Ok(Self {
            max_concurrency,
            send_max_retries: env::var("OUTREACH_SEND_MAX_RETRIES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .context("Invalid OUTREACH_SEND_MAX_RETRIES")?,
            retry_backoff_ms: env::var("OUTREACH_RETRY_BACKOFF_MS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .context("Invalid OUTREACH_RETRY_BACKOFF_MS")?,
            contacted_status,
            school_directory_path: env::var("SCHOOL_DIRECTORY_PATH").ok(),
        })
    }
}

fn optional_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {}", key)),
        _ => Ok(None),
    }
}
