//! Configuration management for Warden.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use warden_common::constants::{
    AUTHENTICATION_NAME, AUTHENTICATION_TTL_SECS, CHALLENGE_FORM_KEY, CHALLENGE_TTL_SECS,
    DEFAULT_DB_PATH, DEFAULT_FONT_PATH, DEFAULT_LISTEN_ADDR, IMAGE_ID, RESPONSE_FORM_KEY,
    SWEEP_INTERVAL_MAX_SECS, SWEEP_INTERVAL_MIN_SECS,
};

/// Upper bound for both TTLs (one year)
const MAX_TTL_SECS: u64 = 365 * 86_400;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `host:port` or `unix:/path/to.sock`
    #[serde(default = "default_address")]
    pub address: String,

    /// Pre-generated CAPTCHA pool file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Font used by the pool generator
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    /// Challenge validity in seconds
    #[serde(default = "default_challenge_ttl")]
    pub challenge_ttl_secs: u64,

    /// Authentication cookie validity in seconds
    #[serde(default = "default_auth_ttl")]
    pub auth_ttl_secs: u64,

    /// Expired record sweep period in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Form and cookie names
    #[serde(default)]
    pub names: NamesConfig,
}

/// Names exposed to the browser
#[derive(Debug, Clone, Deserialize)]
pub struct NamesConfig {
    /// Authentication cookie name
    #[serde(default = "default_cookie_name")]
    pub cookie: String,

    /// Hidden form input carrying the challenge hash
    #[serde(default = "default_challenge_key")]
    pub challenge_key: String,

    /// Text form input carrying the answer
    #[serde(default = "default_response_key")]
    pub response_key: String,

    /// DOM id of the CAPTCHA image
    #[serde(default = "default_image_id")]
    pub image_id: String,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            cookie: default_cookie_name(),
            challenge_key: default_challenge_key(),
            response_key: default_response_key(),
            image_id: default_image_id(),
        }
    }
}

// Default value functions
fn default_address() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_db_path() -> PathBuf { PathBuf::from(DEFAULT_DB_PATH) }
fn default_font_path() -> PathBuf { PathBuf::from(DEFAULT_FONT_PATH) }
fn default_challenge_ttl() -> u64 { CHALLENGE_TTL_SECS }
fn default_auth_ttl() -> u64 { AUTHENTICATION_TTL_SECS }
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_MAX_SECS }
fn default_cookie_name() -> String { AUTHENTICATION_NAME.to_string() }
fn default_challenge_key() -> String { CHALLENGE_FORM_KEY.to_string() }
fn default_response_key() -> String { RESPONSE_FORM_KEY.to_string() }
fn default_image_id() -> String { IMAGE_ID.to_string() }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!(path = config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref address) = args.address {
            config.address = address.clone();
        }
        if let Some(ref db) = args.db {
            config.db_path = db.clone();
        }
        if let Some(ref font) = args.font {
            config.font_path = font.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot work with; clamp the sweep period
    pub fn validate(&mut self) -> Result<()> {
        if self.challenge_ttl_secs == 0 {
            anyhow::bail!("challenge_ttl_secs must be positive");
        }
        if self.auth_ttl_secs == 0 {
            anyhow::bail!("auth_ttl_secs must be positive");
        }
        if self.challenge_ttl_secs > MAX_TTL_SECS || self.auth_ttl_secs > MAX_TTL_SECS {
            anyhow::bail!("TTLs must not exceed {MAX_TTL_SECS} seconds");
        }

        let names = &self.names;
        if names.cookie.is_empty()
            || names.challenge_key.is_empty()
            || names.response_key.is_empty()
            || names.image_id.is_empty()
        {
            anyhow::bail!("cookie, form input and image names must not be empty");
        }
        if !is_cookie_token(&names.cookie) {
            anyhow::bail!("cookie name {:?} is not a valid cookie token", names.cookie);
        }
        if names.challenge_key == names.response_key {
            anyhow::bail!("challenge_key and response_key must differ");
        }

        let clamped = self
            .sweep_interval_secs
            .clamp(SWEEP_INTERVAL_MIN_SECS, SWEEP_INTERVAL_MAX_SECS);
        if clamped != self.sweep_interval_secs {
            tracing::warn!(
                requested = self.sweep_interval_secs,
                used = clamped,
                "Sweep interval out of range, clamping"
            );
            self.sweep_interval_secs = clamped;
        }

        Ok(())
    }

    /// Challenge expiry for a record created at `now`
    pub fn challenge_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.challenge_ttl_secs as i64)
    }

    /// Authentication expiry for a cookie issued at `now`
    pub fn auth_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.auth_ttl_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Visible ASCII minus the separators a cookie name may not contain
fn is_cookie_token(name: &str) -> bool {
    name.bytes().all(|b| {
        b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
    })
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            db_path: default_db_path(),
            font_path: default_font_path(),
            challenge_ttl_secs: default_challenge_ttl(),
            auth_ttl_secs: default_auth_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            names: NamesConfig::default(),
        }
    }
}
