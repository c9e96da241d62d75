//! Key/value + equality-predicate document store over one jsonb table.
//!
//! The core treats the store as schema-less: documents are whole JSON values
//! keyed by `(collection, id)`. Nothing here depends on query features beyond
//! top-level field equality.

use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::errors::AppError;

/// One pending write in a batch: `(collection, id, document)`.
#[derive(Debug, Clone)]
pub struct DocWrite {
    pub collection: String,
    pub id: String,
    pub data: Value,
}

impl DocWrite {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }
}

#[derive(Clone)]
pub struct DocStore {
    pool: PgPool,
}

impl DocStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one document, `None` when it does not exist.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<Value, _>("data")))
    }

    /// All documents in a collection whose top-level `field` equals `value`
    /// (text comparison). Returns `(id, data)` pairs.
    pub async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>, AppError> {
        let rows = sqlx::query(
            "SELECT id, data FROM documents WHERE collection = $1 AND data->>$2 = $3",
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("id"), r.get::<Value, _>("data")))
            .collect())
    }

    /// Upsert a batch of documents in one transaction.
    ///
    /// Either every write in the batch is durably recorded or none is.
    pub async fn batch_write(&self, writes: Vec<DocWrite>) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for write in &writes {
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (collection, id)
                DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                "#,
            )
            .bind(&write.collection)
            .bind(&write.id)
            .bind(&write.data)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!("Committed batch of {} document write(s)", writes.len());
        Ok(())
    }

    /// Convenience single-document upsert.
    pub async fn put(&self, collection: &str, id: &str, data: Value) -> Result<(), AppError> {
        self.batch_write(vec![DocWrite::new(collection, id, data)])
            .await
    }
}
