//! `DocumentStore` implementation backed by PostgreSQL JSONB tables.

use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;
use wimo_core::Document;
use wimo_storage::{DocumentStore, Filter, StorageError, StoredDocument};

use crate::config::PostgresConfig;
use crate::error::PostgresError;
use crate::pool::{create_pool, test_connection};
use crate::schema::SchemaManager;

/// PostgreSQL document store.
///
/// Identifiers are UUIDs generated on insert. Listing follows the `seq`
/// column, which preserves insertion order.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    schema: SchemaManager,
}

impl PostgresStore {
    /// Creates a store with a new connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub async fn new(config: &PostgresConfig) -> Result<Self, StorageError> {
        let pool = create_pool(config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Creates a store over an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            schema: SchemaManager::new(pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.schema.pool()
    }

    async fn table<'a>(&self, collection: &'a str) -> Result<&'a str, StorageError> {
        Ok(self.schema.ensure_table(collection).await?)
    }
}

/// SQL condition and parameters for a filter.
///
/// Returns `None` when the filter can never match, such as an id that is
/// not a UUID.
enum Condition<'a> {
    All,
    Id(Uuid),
    Field { key: &'a str, value: &'a Value },
}

impl<'a> Condition<'a> {
    fn from_filter(filter: Filter<'a>) -> Option<Self> {
        match filter {
            Filter::All => Some(Self::All),
            Filter::Id(id) => Uuid::parse_str(id).ok().map(Self::Id),
            Filter::Field { key, value } => Some(Self::Field { key, value }),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::All => "TRUE",
            Self::Id(_) => "id = $1",
            Self::Field { .. } => "doc -> $1 = $2",
        }
    }
}

fn sql_error(context: &str, err: sqlx_core::error::Error) -> StorageError {
    let err = PostgresError::from(err);
    if err.is_connection_failure() {
        StorageError::unavailable(format!("{context}: {err}"))
    } else {
        StorageError::internal(format!("{context}: {err}"))
    }
}

fn into_document(id: Uuid, doc: Value) -> Result<StoredDocument, StorageError> {
    match doc {
        Value::Object(body) => Ok(StoredDocument::new(id.to_string(), body)),
        other => Err(StorageError::invalid_document(format!(
            "Document {id} is not an object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find(
        &self,
        collection: &str,
        filter: Filter<'_>,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        let table = self.table(collection).await?;
        let Some(condition) = Condition::from_filter(filter) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            r#"SELECT id, doc FROM "{table}" WHERE {} ORDER BY seq"#,
            condition.sql()
        );
        let statement = query_as::<_, (Uuid, Value)>(&sql);
        let statement = match condition {
            Condition::All => statement,
            Condition::Id(id) => statement.bind(id),
            Condition::Field { key, value } => statement.bind(key).bind(value),
        };

        let rows = statement
            .fetch_all(self.pool())
            .await
            .map_err(|e| sql_error("Failed to load documents", e))?;

        debug!(table, count = rows.len(), "Loaded documents");
        rows.into_iter()
            .map(|(id, doc)| into_document(id, doc))
            .collect()
    }

    #[instrument(skip(self, body))]
    async fn insert(&self, collection: &str, body: Document) -> Result<String, StorageError> {
        let table = self.table(collection).await?;
        let id = Uuid::new_v4();

        let sql = format!(r#"INSERT INTO "{table}" (id, doc) VALUES ($1, $2)"#);
        query(&sql)
            .bind(id)
            .bind(Value::Object(body))
            .execute(self.pool())
            .await
            .map_err(|e| sql_error("Failed to insert document", e))?;

        Ok(id.to_string())
    }

    #[instrument(skip(self, body))]
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> Result<Option<String>, StorageError> {
        let table = self.table(collection).await?;
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let sql = format!(r#"UPDATE "{table}" SET doc = doc || $1 WHERE id = $2 RETURNING id"#);
        let row: Option<(Uuid,)> = query_as(&sql)
            .bind(Value::Object(body))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| sql_error("Failed to update document", e))?;

        Ok(row.map(|(id,)| id.to_string()))
    }

    #[instrument(skip(self, body))]
    async fn upsert_by_field(
        &self,
        collection: &str,
        key: &str,
        value: &Value,
        body: Document,
    ) -> Result<String, StorageError> {
        let table = self.table(collection).await?;

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| sql_error("Failed to begin transaction", e))?;

        // Serializes upserts on the same natural key until commit.
        query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{table}:{key}:{value}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| sql_error("Failed to lock natural key", e))?;

        let select_sql =
            format!(r#"SELECT id FROM "{table}" WHERE doc -> $1 = $2 ORDER BY seq LIMIT 1"#);
        let existing: Option<(Uuid,)> = query_as(&select_sql)
            .bind(key)
            .bind(value)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| sql_error("Failed to look up document", e))?;

        let id = match existing {
            Some((id,)) => {
                let sql = format!(r#"UPDATE "{table}" SET doc = doc || $1 WHERE id = $2"#);
                query(&sql)
                    .bind(Value::Object(body))
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| sql_error("Failed to update document", e))?;
                id
            }
            None => {
                let mut body = body;
                body.entry(key.to_string())
                    .or_insert_with(|| value.clone());
                let id = Uuid::new_v4();
                let sql = format!(r#"INSERT INTO "{table}" (id, doc) VALUES ($1, $2)"#);
                query(&sql)
                    .bind(id)
                    .bind(Value::Object(body))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| sql_error("Failed to insert document", e))?;
                id
            }
        };

        tx.commit()
            .await
            .map_err(|e| sql_error("Failed to commit transaction", e))?;

        Ok(id.to_string())
    }

    #[instrument(skip(self))]
    async fn delete_one(
        &self,
        collection: &str,
        filter: Filter<'_>,
    ) -> Result<bool, StorageError> {
        let table = self.table(collection).await?;
        let Some(condition) = Condition::from_filter(filter) else {
            return Ok(false);
        };

        let sql = format!(
            r#"DELETE FROM "{table}" WHERE id = (
                SELECT id FROM "{table}" WHERE {} ORDER BY seq LIMIT 1
            )"#,
            condition.sql()
        );
        let statement = query(&sql);
        let statement = match condition {
            Condition::All => statement,
            Condition::Id(id) => statement.bind(id),
            Condition::Field { key, value } => statement.bind(key).bind(value),
        };

        let result = statement
            .execute(self.pool())
            .await
            .map_err(|e| sql_error("Failed to delete document", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(test_connection(self.pool()).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
