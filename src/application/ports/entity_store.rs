use async_trait::async_trait;
use serde_json::Value;

use crate::{app_error::AppResult, domain::entities::document::Document};

/// Largest number of writes committed in one batch.
pub const MAX_BATCH_SIZE: usize = 400;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        id: String,
        fields: Document,
        merge: bool,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Key-value document store addressed by collection and document id.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Write `fields`. With `merge` the given keys are overlaid on the stored
    /// document; without it the document is replaced.
    async fn set(&self, collection: &str, id: &str, fields: Document, merge: bool)
    -> AppResult<()>;

    /// Insert only if no document exists. Returns `true` if this call created it.
    async fn create(&self, collection: &str, id: &str, fields: Document) -> AppResult<bool>;

    /// Documents whose `field` equals `value`. Dotted paths address nested keys.
    async fn query(&self, collection: &str, field: &str, value: &Value)
    -> AppResult<Vec<StoredDocument>>;

    /// Every document in a collection.
    async fn stream(&self, collection: &str) -> AppResult<Vec<StoredDocument>>;

    /// Apply up to [`MAX_BATCH_SIZE`] writes atomically.
    async fn commit(&self, writes: Vec<WriteOp>) -> AppResult<()>;
}

/// Commit any number of writes, chunked to [`MAX_BATCH_SIZE`]. Each chunk is
/// atomic; chunks are not. Returns the number of chunks committed.
pub async fn batch_commit(store: &dyn EntityStore, mut writes: Vec<WriteOp>) -> AppResult<usize> {
    let mut batches = 0;
    while !writes.is_empty() {
        let rest = writes.split_off(writes.len().min(MAX_BATCH_SIZE));
        store.commit(writes).await?;
        batches += 1;
        writes = rest;
    }
    Ok(batches)
}
