//! Connection pool management for the PostgreSQL storage backend.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnectOptions, PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

/// Type alias for PostgreSQL pool options.
pub type PgPoolOptions = PoolOptions<Postgres>;

/// Creates a new PostgreSQL connection pool from the given configuration.
///
/// Connections are opened on first use, so the gateway can start while the
/// database is still down and report it through readiness instead.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        idle_timeout_ms = ?config.idle_timeout_ms,
        "Creating PostgreSQL connection pool"
    );

    let connect_options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e| PostgresError::config(format!("Invalid database URL: {e}")))?;

    let mut options = PgPoolOptions::new()
        .max_connections(config.pool_size.max(1))
        .min_connections(0)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .test_before_acquire(false);

    if let Some(idle_timeout) = config.idle_timeout_ms {
        options = options.idle_timeout(Duration::from_millis(idle_timeout));
    }

    let pool = options.connect_lazy_with(connect_options);

    debug!("PostgreSQL connection pool created");

    Ok(pool)
}

/// Tests the connection to the database.
#[instrument(skip(pool))]
pub async fn test_connection(pool: &PgPool) -> Result<()> {
    sqlx_core::query::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(PostgresError::from)?;

    debug!("Database connection test successful");

    Ok(())
}

/// Masks the password in a database URL for logging.
///
/// The last `@` ends the userinfo and the first `:` after the scheme ends
/// the username, so an unencoded `@` or `:` inside the password is masked
/// too.
pub(crate) fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    if let Some(at_pos) = url.rfind('@').filter(|&p| p > scheme_end)
        && let Some(colon_pos) = url[scheme_end..at_pos].find(':')
    {
        let colon_pos = scheme_end + colon_pos;
        return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
    }
    url.to_string()
}
