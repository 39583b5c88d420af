//! # configs
//!
//! Layered runtime configuration for PawRescue. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `pawrescue.toml` in the working directory (or the path given explicitly)
//! 3. `.env` entries and process environment, prefixed `PAWRESCUE__`,
//!    nested with `__` (e.g. `PAWRESCUE__REMOTE__ANON_KEY`)
//!
//! The loaded [`Settings`] value is built once at startup and handed to
//! whatever needs it; nothing here is global.

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "pawrescue.toml";
pub const ENV_PREFIX: &str = "PAWRESCUE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("remote.url is not set")]
    MissingRemoteUrl,

    #[error("invalid remote.url '{0}'")]
    InvalidRemoteUrl(String),

    #[error("remote.anon_key is not set")]
    MissingApiKey,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub remote: RemoteSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// `sqlite://path/to/file.db` or `sqlite::memory:`
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteSettings {
    /// Project ref (`abcd1234`) or full `https://` URL
    pub url: String,
    pub anon_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    Sha256,
    Argon2,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub password_scheme: PasswordScheme,
    /// Create `demo@example.com` when the account table is empty
    pub seed_demo_account: bool,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("database.url", "sqlite://pawrescue.db")?
        .set_default("remote.url", "")?
        .set_default("remote.timeout_secs", 30)?
        .set_default("auth.password_scheme", "sha256")?
        .set_default("auth.seed_demo_account", false)?
        .set_default("log.filter", "info")?
        .set_default("log.json", false)?)
}

impl Settings {
    /// Reads defaults, the config file and the environment.
    ///
    /// Without `path`, a missing `pawrescue.toml` is fine; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "loaded .env");
        }

        let file = match path {
            Some(p) => File::from(p).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let settings = with_defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Defaults overlaid with a TOML document; no file or environment lookup.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Ok(with_defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }
}

impl RemoteSettings {
    /// Project root URL. A bare project ref expands to `https://<ref>.supabase.co`.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingRemoteUrl);
        }

        if raw.starts_with("http") {
            let host = raw
                .strip_prefix("https://")
                .or_else(|| raw.strip_prefix("http://"))
                .ok_or_else(|| ConfigError::InvalidRemoteUrl(raw.to_string()))?;
            if host.is_empty() || host.starts_with('/') || host.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidRemoteUrl(raw.to_string()));
            }
            return Ok(raw.trim_end_matches('/').to_string());
        }

        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::InvalidRemoteUrl(raw.to_string()));
        }
        Ok(format!("https://{raw}.supabase.co"))
    }

    /// The trimmed project key.
    pub fn api_key(&self) -> Result<SecretString, ConfigError> {
        let key = self
            .anon_key
            .as_ref()
            .map(|k| k.expose_secret().trim())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(SecretString::from(key.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
