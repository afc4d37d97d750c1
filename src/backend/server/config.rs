/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration.
 *
 * # Configuration Sources
 *
 * Values are layered, later sources overriding earlier ones:
 *
 * 1. Built-in defaults (suitable for local development)
 * 2. An optional TOML file named by `ROOMLINE_CONFIG`
 * 3. Environment variables (`.env` is loaded by the binary via `dotenv`)
 *
 * Tests use `ServerConfig::builder()` instead.
 *
 * # Environment Variables
 *
 * `BIND_ADDR` (or `SERVER_PORT`), `DATABASE_URL`, `JWT_SECRET`,
 * `ACCESS_TOKEN_TTL_SECS`, `REFRESH_TOKEN_TTL_SECS`, `REFRESH_GRACE_SECS`,
 * `BCRYPT_COST`, `MAX_MESSAGE_LEN`, `MESSAGE_RATE_LIMIT`,
 * `MESSAGE_RATE_WINDOW_SECS`, `HISTORY_PAGE_SIZE`, `STATIC_DIR`,
 * `TOKEN_EXPIRY_WARNING_SECS`.
 */

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Name of the environment variable pointing at a TOML config file
pub const CONFIG_FILE_ENV: &str = "ROOMLINE_CONFIG";

const DEV_JWT_SECRET: &str = "roomline-dev-secret-change-me";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,
    /// sqlx SQLite URL, e.g. `sqlite://roomline.db` or `sqlite::memory:`
    pub database_url: String,
    /// HS256 signing secret
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    /// How long a rotated refresh token keeps returning the same new pair
    pub refresh_grace_secs: u64,
    pub bcrypt_cost: u32,
    /// Maximum message length in characters
    pub max_message_len: usize,
    /// Messages allowed per sender per rate window
    pub message_rate_limit: u32,
    pub message_rate_window_secs: u64,
    /// Default history page size
    pub history_page_size: u32,
    /// Directory of a built frontend to serve at `/`
    pub static_dir: Option<PathBuf>,
    /// Seconds before access-token expiry at which sockets get `auth:expiring`
    pub token_expiry_warning_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite://roomline.db".to_string(),
            jwt_secret: String::new(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            refresh_grace_secs: 10,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_message_len: 4000,
            message_rate_limit: 20,
            message_rate_window_secs: 10,
            history_page_size: 50,
            static_dir: None,
            token_expiry_warning_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfigBuilder starting from the defaults
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load defaults, then the optional TOML file, then the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => {
                tracing::info!("[Config] Loading {}", path);
                Self::from_file(&path)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        config.finish()
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(addr) = env_parse::<SocketAddr>("BIND_ADDR")? {
            self.bind_addr = addr;
        } else if let Some(port) = env_parse::<u16>("SERVER_PORT")? {
            self.bind_addr.set_port(port);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(v) = env_parse("ACCESS_TOKEN_TTL_SECS")? {
            self.access_token_ttl_secs = v;
        }
        if let Some(v) = env_parse("REFRESH_TOKEN_TTL_SECS")? {
            self.refresh_token_ttl_secs = v;
        }
        if let Some(v) = env_parse("REFRESH_GRACE_SECS")? {
            self.refresh_grace_secs = v;
        }
        if let Some(v) = env_parse("BCRYPT_COST")? {
            self.bcrypt_cost = v;
        }
        if let Some(v) = env_parse("MAX_MESSAGE_LEN")? {
            self.max_message_len = v;
        }
        if let Some(v) = env_parse("MESSAGE_RATE_LIMIT")? {
            self.message_rate_limit = v;
        }
        if let Some(v) = env_parse("MESSAGE_RATE_WINDOW_SECS")? {
            self.message_rate_window_secs = v;
        }
        if let Some(v) = env_parse("HISTORY_PAGE_SIZE")? {
            self.history_page_size = v;
        }
        if let Ok(dir) = std::env::var("STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(v) = env_parse("TOKEN_EXPIRY_WARNING_SECS")? {
            self.token_expiry_warning_secs = v;
        }
        Ok(())
    }

    /// Fill the development secret if none was configured, then validate
    fn finish(mut self) -> Result<Self, ConfigError> {
        if self.jwt_secret.is_empty() {
            tracing::warn!("[Config] JWT_SECRET not set, using the development secret. Do not run like this in production.");
            self.jwt_secret = DEV_JWT_SECRET.to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("database_url"));
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("access_token_ttl_secs", "must be positive".into()));
        }
        if self.refresh_token_ttl_secs <= self.access_token_ttl_secs {
            return Err(ConfigError::Invalid(
                "refresh_token_ttl_secs",
                "must be longer than the access token TTL".into(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid("bcrypt_cost", "must be between 4 and 31".into()));
        }
        if self.max_message_len == 0 {
            return Err(ConfigError::Invalid("max_message_len", "must be positive".into()));
        }
        if self.message_rate_limit == 0 || self.message_rate_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "message_rate_limit",
                "limit and window must be positive".into(),
            ));
        }
        if self.history_page_size == 0 {
            return Err(ConfigError::Invalid("history_page_size", "must be positive".into()));
        }
        Ok(())
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_ttl_secs)
    }

    pub fn refresh_grace(&self) -> Duration {
        Duration::from_secs(self.refresh_grace_secs)
    }

    pub fn message_rate_window(&self) -> Duration {
        Duration::from_secs(self.message_rate_window_secs)
    }

    pub fn token_expiry_warning(&self) -> Duration {
        Duration::from_secs(self.token_expiry_warning_secs)
    }

    pub fn is_in_memory_db(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn access_token_ttl_secs(mut self, secs: u64) -> Self {
        self.config.access_token_ttl_secs = secs;
        self
    }

    pub fn refresh_token_ttl_secs(mut self, secs: u64) -> Self {
        self.config.refresh_token_ttl_secs = secs;
        self
    }

    pub fn refresh_grace_secs(mut self, secs: u64) -> Self {
        self.config.refresh_grace_secs = secs;
        self
    }

    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.config.bcrypt_cost = cost;
        self
    }

    pub fn max_message_len(mut self, len: usize) -> Self {
        self.config.max_message_len = len;
        self
    }

    pub fn message_rate_limit(mut self, limit: u32, window_secs: u64) -> Self {
        self.config.message_rate_limit = limit;
        self.config.message_rate_window_secs = window_secs;
        self
    }

    pub fn history_page_size(mut self, size: u32) -> Self {
        self.config.history_page_size = size;
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = Some(dir.into());
        self
    }

    pub fn token_expiry_warning_secs(mut self, secs: u64) -> Self {
        self.config.token_expiry_warning_secs = secs;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.finish()
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

fn env_parse<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid(key, e.to_string())),
        Err(_) => Ok(None),
    }
}
