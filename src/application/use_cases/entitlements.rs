//! Reads and writes a user's entitlement document.
//!
//! Reads always normalize. `load_canonical` persists whatever drift the
//! normalizer found, so stale trials and lapsed premium grants are repaired the
//! first time anyone looks at them. Writes are merges; fields a caller did not
//! mention are never overwritten.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::ports::{claims_mirror::ClaimsMirror, clock::Clock, entity_store::EntityStore},
    domain::{
        entities::{
            document::Document,
            entitlement::{EntitlementField, EntitlementRecord, Normalized, normalize},
        },
        time::format_instant,
    },
};

pub const USERS_COLLECTION: &str = "users";

pub struct EntitlementStore {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl EntitlementStore {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Canonical record for `user_id`, creating a default document if none
    /// exists and persisting any drift in a single merge-write.
    #[instrument(skip(self))]
    pub async fn load_canonical(&self, user_id: &str) -> AppResult<EntitlementRecord> {
        let now = self.clock.now();
        let doc = self.get_or_create(user_id, now).await?;

        let normalized = normalize(&doc, now);
        if normalized.is_dirty() {
            log_drift(user_id, &normalized);
            self.save(user_id, normalized.changes()).await?;
        }

        Ok(normalized.record)
    }

    /// Canonical record without persisting anything. Missing users read as
    /// the default record.
    pub async fn view(&self, user_id: &str) -> AppResult<EntitlementRecord> {
        let now = self.clock.now();
        let doc = self
            .store
            .get(USERS_COLLECTION, user_id)
            .await?
            .unwrap_or_else(|| initial_document(now));
        Ok(normalize(&doc, now).record)
    }

    /// Merge `fields` into the user document and stamp `updated_at`.
    pub async fn save(&self, user_id: &str, mut fields: Document) -> AppResult<()> {
        fields.insert(
            "updated_at".into(),
            Value::from(format_instant(self.clock.now())),
        );
        self.store
            .set(USERS_COLLECTION, user_id, fields, true)
            .await
    }

    /// Apply a patch computed from the current canonical record, normalize the
    /// result, and persist the patch plus any normalization changes in one
    /// merge-write.
    #[instrument(skip(self, build_patch))]
    pub async fn reconcile<F>(&self, user_id: &str, build_patch: F) -> AppResult<EntitlementRecord>
    where
        F: FnOnce(&EntitlementRecord, DateTime<Utc>) -> Document + Send,
    {
        let now = self.clock.now();
        let stored = self.store.get(USERS_COLLECTION, user_id).await?;
        let is_new = stored.is_none();
        let base = stored.unwrap_or_else(|| initial_document(now));

        let current = normalize(&base, now).record;
        let patch = build_patch(&current, now);

        let mut combined = base.clone();
        combined.extend(patch.clone());
        let normalized = normalize(&combined, now);

        let mut write = if is_new { combined } else { patch };
        write.extend(normalized.changes());

        debug!(
            fields = ?write.keys().collect::<Vec<_>>(),
            "Writing entitlement update"
        );
        self.save(user_id, write).await?;

        Ok(normalized.record)
    }

    async fn get_or_create(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<Document> {
        if let Some(doc) = self.store.get(USERS_COLLECTION, user_id).await? {
            return Ok(doc);
        }

        let initial = initial_document(now);
        if self
            .store
            .create(USERS_COLLECTION, user_id, initial.clone())
            .await?
        {
            info!(user_id, "Created default entitlement document");
            return Ok(initial);
        }

        // Lost a creation race; read what the winner wrote.
        Ok(self
            .store
            .get(USERS_COLLECTION, user_id)
            .await?
            .unwrap_or(initial))
    }
}

/// Document written for a user seen for the first time.
fn initial_document(now: DateTime<Utc>) -> Document {
    let mut doc = EntitlementRecord::default().patch([
        EntitlementField::Plan,
        EntitlementField::AccessPlan,
        EntitlementField::IsPremium,
        EntitlementField::TrialStatus,
        EntitlementField::TrialConsumed,
    ]);
    doc.insert("created_at".into(), Value::from(format_instant(now)));
    doc
}

fn log_drift(user_id: &str, normalized: &Normalized) {
    let record = &normalized.record;
    if normalized.changed.contains(&EntitlementField::Plan) {
        info!(user_id, plan = %record.plan, premium_status = ?record.premium_status, "Plan reconciled");
    }
    if normalized.changed.contains(&EntitlementField::TrialStatus) {
        info!(user_id, trial_status = %record.trial_status, "Trial state reconciled");
    }
    debug!(user_id, changed = ?normalized.changed, "Persisting normalized entitlement");
}

/// Best-effort copy of the externally visible fields into auth claims.
/// The stored record stays authoritative, so failures are only logged.
pub async fn mirror_claims(mirror: &dyn ClaimsMirror, user_id: &str, record: &EntitlementRecord) {
    if let Err(err) = mirror.set_claims(user_id, record.claims()).await {
        warn!(user_id, error = %err, "Failed to update claims mirror");
    }
}
