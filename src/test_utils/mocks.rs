//! In-memory mock implementations of the application ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        claims_mirror::ClaimsMirror,
        clock::Clock,
        entity_store::{EntityStore, MAX_BATCH_SIZE, StoredDocument, WriteOp},
        purchase_verifier::{PurchaseVerifier, VerificationRequest, VerificationResult},
    },
    domain::entities::{document::Document, entitlement::EntitlementClaims},
};

// ============================================================================
// FixedClock
// ============================================================================

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// InMemoryEntityStore
// ============================================================================

/// A write observed by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub collection: String,
    pub id: String,
    pub fields: Document,
    pub merge: bool,
}

#[derive(Default)]
pub struct InMemoryEntityStore {
    pub documents: Mutex<BTreeMap<(String, String), Document>>,
    pub writes: Mutex<Vec<RecordedWrite>>,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub fail_collections: Mutex<Vec<String>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without recording a write.
    pub fn insert(&self, collection: &str, id: &str, value: Value) {
        let Value::Object(map) = value else {
            panic!("seeded documents must be JSON objects");
        };
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), map);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Make every operation on `collection` fail with a database error.
    pub fn fail_on(&self, collection: &str) {
        self.fail_collections
            .lock()
            .unwrap()
            .push(collection.to_string());
    }

    fn check(&self, collection: &str) -> AppResult<()> {
        if self
            .fail_collections
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == collection)
        {
            return Err(AppError::Database("Database operation failed".into()));
        }
        Ok(())
    }

    fn apply_set(&self, collection: &str, id: &str, fields: Document, merge: bool) {
        let mut docs = self.documents.lock().unwrap();
        let key = (collection.to_string(), id.to_string());
        if merge {
            docs.entry(key).or_default().extend(fields.clone());
        } else {
            docs.insert(key, fields.clone());
        }
        self.writes.lock().unwrap().push(RecordedWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge,
        });
    }
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        self.check(collection)?;
        Ok(self.document(collection, id))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> AppResult<()> {
        self.check(collection)?;
        self.apply_set(collection, id, fields, merge);
        Ok(())
    }

    async fn create(&self, collection: &str, id: &str, fields: Document) -> AppResult<bool> {
        self.check(collection)?;
        if self.document(collection, id).is_some() {
            return Ok(false);
        }
        self.apply_set(collection, id, fields, false);
        Ok(true)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<StoredDocument>> {
        self.check(collection)?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, _), doc)| c == collection && lookup(doc, field) == Some(value))
            .map(|((_, id), doc)| StoredDocument {
                id: id.clone(),
                fields: doc.clone(),
            })
            .collect())
    }

    async fn stream(&self, collection: &str) -> AppResult<Vec<StoredDocument>> {
        self.check(collection)?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), doc)| StoredDocument {
                id: id.clone(),
                fields: doc.clone(),
            })
            .collect())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> AppResult<()> {
        if writes.len() > MAX_BATCH_SIZE {
            return Err(AppError::Internal("batch too large".into()));
        }
        for op in &writes {
            match op {
                WriteOp::Set { collection, .. } | WriteOp::Delete { collection, .. } => {
                    self.check(collection)?
                }
            }
        }
        self.batch_sizes.lock().unwrap().push(writes.len());
        for op in writes {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                    merge,
                } => self.apply_set(&collection, &id, fields, merge),
                WriteOp::Delete { collection, id } => {
                    self.documents.lock().unwrap().remove(&(collection, id));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// RecordingClaimsMirror
// ============================================================================

#[derive(Default)]
pub struct RecordingClaimsMirror {
    pub calls: Mutex<Vec<(String, EntitlementClaims)>>,
    pub fail: bool,
}

impl RecordingClaimsMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, EntitlementClaims)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_for(&self, user_id: &str) -> Option<EntitlementClaims> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(uid, _)| uid == user_id)
            .map(|(_, claims)| *claims)
    }
}

#[async_trait]
impl ClaimsMirror for RecordingClaimsMirror {
    async fn set_claims(&self, user_id: &str, claims: EntitlementClaims) -> AppResult<()> {
        if self.fail {
            return Err(AppError::UpstreamUnavailable("claims store offline".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), claims));
        Ok(())
    }
}

// ============================================================================
// StaticPurchaseVerifier
// ============================================================================

/// Returns a canned result per raw token; unknown tokens fail as upstream errors.
#[derive(Default)]
pub struct StaticPurchaseVerifier {
    pub results: Mutex<HashMap<String, VerificationResult>>,
    pub requests: Mutex<Vec<VerificationRequest>>,
}

impl StaticPurchaseVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, token: &str, result: VerificationResult) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(token.to_string(), result);
        self
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PurchaseVerifier for StaticPurchaseVerifier {
    async fn verify(&self, request: &VerificationRequest) -> AppResult<VerificationResult> {
        self.requests.lock().unwrap().push(request.clone());
        self.results
            .lock()
            .unwrap()
            .get(request.token())
            .cloned()
            .ok_or_else(|| AppError::UpstreamUnavailable("store verification timed out".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::entity_store::batch_commit;
    use serde_json::json;

    #[tokio::test]
    async fn merge_set_overlays_fields() {
        let store = InMemoryEntityStore::new();
        store.insert("c", "1", json!({ "a": 1, "b": 2 }));

        let mut patch = Document::new();
        patch.insert("b".into(), json!(3));
        store.set("c", "1", patch, true).await.unwrap();

        assert_eq!(Value::Object(store.document("c", "1").unwrap()), json!({ "a": 1, "b": 3 }));
    }

    #[tokio::test]
    async fn create_only_once() {
        let store = InMemoryEntityStore::new();
        assert!(store.create("c", "1", Document::new()).await.unwrap());
        assert!(!store.create("c", "1", Document::new()).await.unwrap());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn query_follows_dotted_paths() {
        let store = InMemoryEntityStore::new();
        store.insert("t", "a", json!({ "ids": { "ios": "x" } }));
        store.insert("t", "b", json!({ "ids": { "ios": "y" } }));
        store.insert("other", "c", json!({ "ids": { "ios": "x" } }));

        let found = store.query("t", "ids.ios", &json!("x")).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
    }

    #[tokio::test]
    async fn batch_commit_chunks_large_inputs() {
        let store = InMemoryEntityStore::new();
        let writes: Vec<WriteOp> = (0..(MAX_BATCH_SIZE * 2 + 5))
            .map(|i| WriteOp::Set {
                collection: "c".into(),
                id: i.to_string(),
                fields: Document::new(),
                merge: false,
            })
            .collect();

        let batches = batch_commit(&store, writes).await.unwrap();

        assert_eq!(batches, 3);
        assert_eq!(
            *store.batch_sizes.lock().unwrap(),
            vec![MAX_BATCH_SIZE, MAX_BATCH_SIZE, 5]
        );
        assert_eq!(store.stream("c").await.unwrap().len(), MAX_BATCH_SIZE * 2 + 5);
    }

    #[tokio::test]
    async fn batch_commit_of_nothing_commits_nothing() {
        let store = InMemoryEntityStore::new();
        assert_eq!(batch_commit(&store, Vec::new()).await.unwrap(), 0);
        assert!(store.batch_sizes.lock().unwrap().is_empty());
    }
}
