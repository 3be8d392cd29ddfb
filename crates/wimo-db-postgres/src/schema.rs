//! Schema management for the PostgreSQL storage backend.
//!
//! Each collection is stored in its own table holding the document body as
//! JSONB next to a UUID identifier and an insertion sequence.

use std::sync::Arc;

use dashmap::DashSet;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use crate::error::{PostgresError, Result};

/// Creates collection tables on demand and remembers which ones exist.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    pool: PgPool,
    /// Cache of tables that have been verified to exist.
    created_tables: Arc<DashSet<String>>,
}

impl SchemaManager {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            created_tables: Arc::new(DashSet::new()),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Converts a collection name to a table name.
    ///
    /// Only lowercase ASCII letters, digits and underscores are accepted,
    /// starting with a letter or underscore, since the name is interpolated
    /// into SQL.
    ///
    /// # Errors
    ///
    /// Returns `PostgresError::InvalidCollection` for any other name.
    pub fn table_name(collection: &str) -> Result<&str> {
        let mut chars = collection.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid_start && valid_rest && collection.len() <= 63 {
            Ok(collection)
        } else {
            Err(PostgresError::invalid_collection(collection))
        }
    }

    /// Ensures the table for `collection` exists and returns its name.
    ///
    /// Idempotent; repeated calls for the same collection hit the cache.
    #[instrument(skip(self))]
    pub async fn ensure_table<'a>(&self, collection: &'a str) -> Result<&'a str> {
        let table = Self::table_name(collection)?;

        if self.created_tables.contains(table) {
            debug!("Table {} found in cache", table);
            return Ok(table);
        }

        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                doc JSONB NOT NULL
            )
            "#
        );
        sqlx_core::query::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        let index_sql =
            format!(r#"CREATE INDEX IF NOT EXISTS "idx_{table}_seq" ON "{table}"(seq)"#);
        sqlx_core::query::query(&index_sql)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        info!("Ensured table: {}", table);
        self.created_tables.insert(table.to_string());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert_eq!(SchemaManager::table_name("user").unwrap(), "user");
        assert_eq!(SchemaManager::table_name("_tokens2").unwrap(), "_tokens2");
        assert!(SchemaManager::table_name("").is_err());
        assert!(SchemaManager::table_name("User").is_err());
        assert!(SchemaManager::table_name("2user").is_err());
        assert!(SchemaManager::table_name("user\"; DROP TABLE x").is_err());
        assert!(SchemaManager::table_name(&"a".repeat(64)).is_err());
    }
}
