use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use wimo_core::RoleGroup;
use wimo_db_postgres::PostgresConfig;
use wimo_storage::CallPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Users and tokens seeded at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Error produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        // Server validations
        if self.server.port == 0 {
            return invalid("server.port must be > 0");
        }
        if self.server.request_timeout_ms == 0 {
            return invalid("server.request_timeout_ms must be > 0");
        }
        // Storage validations
        if self.storage.timeout_ms == 0 {
            return invalid("storage.timeout_ms must be > 0");
        }
        if self.storage.retry.max_attempts == 0 {
            return invalid("storage.retry.max_attempts must be > 0");
        }
        if self.storage.backend == StorageBackend::Postgres {
            let Some(ref pg) = self.storage.postgres else {
                return invalid("storage.backend = \"postgres\" requires [storage.postgres]");
            };
            if pg.url.is_none() && pg.host.is_empty() {
                return invalid("storage.postgres requires either 'url' or 'host' to be set");
            }
            if pg.url.is_none() && pg.database.is_empty() {
                return invalid("storage.postgres.database must not be empty");
            }
            if pg.port == 0 {
                return invalid("storage.postgres.port must be > 0");
            }
            if pg.pool_size == 0 {
                return invalid("storage.postgres.pool_size must be > 0");
            }
            if pg.connect_timeout_ms == 0 {
                return invalid("storage.postgres.connect_timeout_ms must be > 0");
            }
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        // Bootstrap validation
        for user in &self.bootstrap.users {
            if user.username.is_empty() {
                return invalid("bootstrap.users entries need a username");
            }
            if user.role_group.parse::<RoleGroup>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "bootstrap user '{}' has unknown role_group '{}'",
                    user.username, user.role_group
                )));
            }
        }
        for token in &self.bootstrap.tokens {
            if token.username.is_empty() || token.token.is_empty() {
                return invalid("bootstrap.tokens entries need a username and a token");
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Which document store backs the persistence facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Per-call deadline for backend operations
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub postgres: Option<PostgresStorageConfig>,
}

fn default_storage_timeout_ms() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            timeout_ms: default_storage_timeout_ms(),
            retry: RetryConfig::default(),
            postgres: None,
        }
    }
}

impl StorageConfig {
    /// Timeout and retry settings for the persistence facade.
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::default()
            .with_timeout(Some(Duration::from_millis(self.timeout_ms)))
            .with_retry(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.backoff_ms),
            )
    }
}

/// Bounded retry for read operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    100
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// PostgreSQL storage configuration
///
/// Either set `url` to a full connection string, or set `host`, `port`,
/// `user`, `password` and `database` individually. `url` takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_postgres_host")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_postgres_database")]
    pub database: String,
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_postgres_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

fn default_postgres_host() -> String {
    "localhost".into()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_database() -> String {
    "wimo".into()
}
fn default_postgres_pool_size() -> u32 {
    10
}
fn default_postgres_connect_timeout() -> u64 {
    5000
}

impl PostgresStorageConfig {
    /// Backend settings for the postgres store.
    pub fn to_backend_config(&self) -> PostgresConfig {
        let base = match self.url {
            Some(ref url) => PostgresConfig::new(url.clone()),
            None => PostgresConfig::from_parts(
                &self.host,
                self.port,
                self.user.as_deref(),
                self.password.as_deref(),
                &self.database,
            ),
        };
        base.with_pool_size(self.pool_size)
            .with_connect_timeout_ms(self.connect_timeout_ms)
            .with_idle_timeout_ms(self.idle_timeout_ms)
    }
}

impl Default for PostgresStorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: None,
            password: None,
            database: default_postgres_database(),
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout(),
            idle_timeout_ms: Some(300_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Records written through the repositories at startup.
///
/// Saves upsert by username, so restarting with the same settings is
/// idempotent. Empty by default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub users: Vec<BootstrapUser>,
    #[serde(default)]
    pub tokens: Vec<BootstrapToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    #[serde(default)]
    pub fname: String,
    #[serde(default)]
    pub pname: String,
    #[serde(default)]
    pub age: u32,
    pub username: String,
    /// For security, prefer a `.env` file over committing this
    pub password: String,
    pub role_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapToken {
    pub username: String,
    pub token: String,
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    /// Default configuration file, read from the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "wimo.toml";

    /// Loads the configuration file at `path` (or [`DEFAULT_CONFIG_FILE`]),
    /// applies `WIMO__SECTION__KEY` environment overrides and validates.
    ///
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        let mut builder = Config::builder();
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf).format(FileFormat::Toml));
        }
        // Environment variable overrides, e.g., WIMO__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("WIMO")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
