use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    app_error::AppResult,
    application::{
        ports::entity_store::{EntityStore, WriteOp, batch_commit},
        use_cases::entitlements::EntitlementStore,
    },
    domain::{
        entities::{
            document::Document,
            permission::{AdsConfig, PermissionMap, decode_permissions, encode_permissions},
            plan::Plan,
            purchase::CatalogPlatform,
        },
        time::format_instant,
    },
};

pub const PLAN_PERMISSIONS_COLLECTION: &str = "plan_permissions";
pub const ADS_CONFIG_COLLECTION: &str = "ads_config";

pub struct PermissionUseCases {
    entitlements: Arc<EntitlementStore>,
    store: Arc<dyn EntityStore>,
    ads_defaults: HashMap<CatalogPlatform, AdsConfig>,
}

impl PermissionUseCases {
    pub fn new(
        entitlements: Arc<EntitlementStore>,
        store: Arc<dyn EntityStore>,
        ads_defaults: HashMap<CatalogPlatform, AdsConfig>,
    ) -> Self {
        Self {
            entitlements,
            store,
            ads_defaults,
        }
    }

    /// Permissions granted by the user's effective access plan.
    #[instrument(skip(self))]
    pub async fn permissions_for(&self, user_id: &str) -> AppResult<(Plan, PermissionMap)> {
        let record = self.entitlements.load_canonical(user_id).await?;
        let plan = record.access_plan;
        Ok((plan, self.plan_permissions(plan).await?))
    }

    pub async fn plan_permissions(&self, plan: Plan) -> AppResult<PermissionMap> {
        let Some(doc) = self
            .store
            .get(PLAN_PERMISSIONS_COLLECTION, plan.as_ref())
            .await?
        else {
            return Ok(PermissionMap::new());
        };

        let Some(Value::Object(raw)) = doc.get("permissions") else {
            return Ok(PermissionMap::new());
        };
        let decoded = decode_permissions(raw);
        if !decoded.rejected.is_empty() {
            warn!(plan = %plan, keys = ?decoded.rejected, "Ignoring unsupported permission values");
        }
        Ok(decoded.values)
    }

    /// Write default permission maps for plans that have no document yet.
    /// Returns the plans that were seeded.
    pub async fn seed_defaults(&self, defaults: &BTreeMap<Plan, PermissionMap>) -> AppResult<Vec<Plan>> {
        let mut seeded = Vec::new();
        let mut writes = Vec::new();
        let now = format_instant(self.entitlements.now());

        for (plan, permissions) in defaults {
            if self
                .store
                .get(PLAN_PERMISSIONS_COLLECTION, plan.as_ref())
                .await?
                .is_some()
            {
                continue;
            }

            let mut fields = Document::new();
            fields.insert(
                "permissions".into(),
                Value::Object(encode_permissions(permissions)),
            );
            fields.insert("updated_at".into(), Value::from(now.clone()));
            writes.push(WriteOp::Set {
                collection: PLAN_PERMISSIONS_COLLECTION.to_string(),
                id: plan.as_ref().to_string(),
                fields,
                merge: false,
            });
            seeded.push(*plan);
        }

        batch_commit(self.store.as_ref(), writes).await?;
        if !seeded.is_empty() {
            info!(plans = ?seeded, "Seeded default plan permissions");
        }
        Ok(seeded)
    }

    /// Ad settings for `platform`, disabled unless the user is on the free
    /// access plan.
    #[instrument(skip(self))]
    pub async fn ads_config_for(
        &self,
        user_id: &str,
        platform: CatalogPlatform,
    ) -> AppResult<AdsConfig> {
        let record = self.entitlements.load_canonical(user_id).await?;
        let fallback = self
            .ads_defaults
            .get(&platform)
            .cloned()
            .unwrap_or_default();

        let stored = self
            .store
            .get(ADS_CONFIG_COLLECTION, platform.as_ref())
            .await?
            .and_then(|doc| match doc.get("config") {
                Some(Value::Object(raw)) => AdsConfig::from_document(raw, &fallback),
                _ => None,
            });

        Ok(stored.unwrap_or(fallback).gated_for(record.access_plan))
    }
}
