//! `EntityStore` over a single JSONB `documents` table keyed by
//! `(collection, id)`. Merge writes use `||`, which overlays top-level keys
//! exactly like a document-store merge.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, Row, postgres::PgRow};

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::ports::entity_store::{EntityStore, MAX_BATCH_SIZE, StoredDocument, WriteOp},
    domain::entities::document::Document,
};

const UPSERT_MERGE: &str = r#"
    INSERT INTO documents (collection, id, fields)
    VALUES ($1, $2, $3)
    ON CONFLICT (collection, id)
    DO UPDATE SET fields = documents.fields || EXCLUDED.fields, updated_at = NOW()
"#;

const UPSERT_REPLACE: &str = r#"
    INSERT INTO documents (collection, id, fields)
    VALUES ($1, $2, $3)
    ON CONFLICT (collection, id)
    DO UPDATE SET fields = EXCLUDED.fields, updated_at = NOW()
"#;

fn upsert_sql(merge: bool) -> &'static str {
    if merge { UPSERT_MERGE } else { UPSERT_REPLACE }
}

/// Stored JSONB as a document. Non-object values read as empty.
fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => {
            tracing::warn!(kind = ?other, "Stored document is not a JSON object");
            Document::new()
        }
    }
}

fn row_to_stored(row: PgRow) -> StoredDocument {
    StoredDocument {
        id: row.get("id"),
        fields: into_document(row.get("fields")),
    }
}

/// Dotted field path as a Postgres `text[]` path for `#>`.
fn json_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

async fn apply_write(conn: &mut PgConnection, op: WriteOp) -> AppResult<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            fields,
            merge,
        } => {
            sqlx::query(upsert_sql(merge))
                .bind(collection)
                .bind(id)
                .bind(Value::Object(fields))
                .execute(conn)
                .await?;
        }
        WriteOp::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl EntityStore for PostgresPersistence {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query("SELECT fields FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;

        Ok(row.map(|row| into_document(row.get("fields"))))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> AppResult<()> {
        sqlx::query(upsert_sql(merge))
            .bind(collection)
            .bind(id)
            .bind(Value::Object(fields))
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, fields: Document) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(fields))
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = $1 AND fields #> $2 = $3
            ORDER BY id ASC
            "#,
        )
        .bind(collection)
        .bind(json_path(field))
        .bind(value)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_stored).collect())
    }

    async fn stream(&self, collection: &str) -> AppResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = $1
            ORDER BY id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_stored).collect())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> AppResult<()> {
        if writes.len() > MAX_BATCH_SIZE {
            return Err(AppError::Internal(format!(
                "batch of {} exceeds {MAX_BATCH_SIZE} writes",
                writes.len()
            )));
        }

        let mut tx = self.pool().begin().await?;
        for op in writes {
            apply_write(&mut tx, op).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
