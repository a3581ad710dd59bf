//! Applies store-verified purchases and administrative overrides to a user's
//! entitlement.
//!
//! Every write is derived from scratch from the verification result, so
//! replaying a result is harmless. The purchase document keyed by token hash is
//! the only place ownership conflicts are detected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult, ConflictReason},
    application::{
        ports::{
            claims_mirror::ClaimsMirror,
            entity_store::EntityStore,
            purchase_verifier::{PurchaseVerifier, VerificationRequest, VerificationResult},
            tariff_catalog::TariffCatalog,
        },
        use_cases::entitlements::{EntitlementStore, mirror_claims},
        validators::{normalize_tariff_id, parse_plan},
    },
    domain::{
        entities::{
            document::Document,
            entitlement::{EntitlementField, EntitlementRecord},
            plan::Plan,
            premium_status::{PREMIUM_STATUS_ADMIN, is_premium_active},
            purchase::{PurchaseRecord, StorePlatform, token_hash},
            tariff::TariffCatalogEntry,
        },
        time::is_future,
    },
};

pub const PURCHASES_COLLECTION: &str = "iap_purchases";

/// A plan assignment from any source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanChange {
    pub plan: Plan,
    pub source: String,
    pub premium_until: Option<DateTime<Utc>>,
    pub premium_status: Option<String>,
    pub tariff_id: Option<String>,
}

/// Administrative plan override as submitted.
#[derive(Debug, Clone)]
pub struct AdminPlanUpdate {
    pub plan: String,
    pub premium_until: Option<DateTime<Utc>>,
    pub tariff_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedPurchase {
    pub entitlement: EntitlementRecord,
    pub platform: StorePlatform,
    pub product_id: Option<String>,
}

pub struct PurchaseUseCases {
    entitlements: Arc<EntitlementStore>,
    store: Arc<dyn EntityStore>,
    catalog: Arc<dyn TariffCatalog>,
    verifier: Arc<dyn PurchaseVerifier>,
    claims: Arc<dyn ClaimsMirror>,
}

impl PurchaseUseCases {
    pub fn new(
        entitlements: Arc<EntitlementStore>,
        store: Arc<dyn EntityStore>,
        catalog: Arc<dyn TariffCatalog>,
        verifier: Arc<dyn PurchaseVerifier>,
        claims: Arc<dyn ClaimsMirror>,
    ) -> Self {
        Self {
            entitlements,
            store,
            catalog,
            verifier,
            claims,
        }
    }

    /// Verify a client-submitted purchase with the store and apply the result.
    /// Verification failures surface before anything is written.
    #[instrument(skip(self, request), fields(platform = %request.platform()))]
    pub async fn verify_and_apply(
        &self,
        user_id: &str,
        request: VerificationRequest,
    ) -> AppResult<AppliedPurchase> {
        if request.token().trim().is_empty() {
            let message = match request.platform() {
                StorePlatform::Google => "Missing purchase token",
                StorePlatform::Apple => "Missing receipt data",
            };
            return Err(AppError::InvalidInput(message.into()));
        }

        let mut result = self.verifier.verify(&request).await?;
        if result.platform != request.platform() {
            return Err(AppError::UpstreamUnavailable(format!(
                "verifier answered for {} instead of {}",
                result.platform,
                request.platform()
            )));
        }
        if result.product_id.is_none() {
            result.product_id = request.product_id().map(str::to_string);
        }

        let token = result
            .purchase_identity
            .clone()
            .unwrap_or_else(|| request.token().to_string());
        let entitlement = self
            .apply_verified_purchase(user_id, &result, &token)
            .await?;

        Ok(AppliedPurchase {
            entitlement,
            platform: result.platform,
            product_id: result.product_id,
        })
    }

    /// Link the purchase to `user_id`, derive the plan from the verification
    /// result, and merge it into the user's entitlement.
    #[instrument(skip(self, result, token), fields(platform = %result.platform))]
    pub async fn apply_verified_purchase(
        &self,
        user_id: &str,
        result: &VerificationResult,
        token: &str,
    ) -> AppResult<EntitlementRecord> {
        if token.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing purchase token".into()));
        }
        let now = self.entitlements.now();

        self.link_purchase(user_id, result, token, now).await?;

        let plan = derive_plan(result, now);
        let matched = self.match_tariff(result).await;

        let record = self
            .apply_plan_change(
                user_id,
                PlanChange {
                    plan,
                    source: result.platform.premium_source(),
                    premium_until: result.expires_at,
                    premium_status: result.status.clone(),
                    tariff_id: matched.map(|t| t.id),
                },
            )
            .await?;

        info!(
            user_id,
            plan = %record.plan,
            access_plan = %record.access_plan,
            "Applied verified purchase"
        );
        Ok(record)
    }

    /// Administrative override of a user's plan.
    #[instrument(skip(self, update))]
    pub async fn set_plan(
        &self,
        user_id: &str,
        admin_id: &str,
        update: AdminPlanUpdate,
    ) -> AppResult<EntitlementRecord> {
        let plan = parse_plan(&update.plan)?;
        let tariff_id = update
            .tariff_id
            .as_deref()
            .map(normalize_tariff_id)
            .transpose()?;

        let record = self
            .apply_plan_change(
                user_id,
                PlanChange {
                    plan,
                    source: format!("admin:{admin_id}"),
                    premium_until: update.premium_until,
                    premium_status: plan
                        .is_premium()
                        .then(|| PREMIUM_STATUS_ADMIN.to_string()),
                    tariff_id,
                },
            )
            .await?;

        info!(user_id, admin_id, plan = %record.plan, "Plan set by admin");
        Ok(record)
    }

    /// Merge a plan change through the normalizer and mirror the result.
    pub async fn apply_plan_change(
        &self,
        user_id: &str,
        change: PlanChange,
    ) -> AppResult<EntitlementRecord> {
        let record = self
            .entitlements
            .reconcile(user_id, move |current, now| plan_change_patch(current, change, now))
            .await?;

        mirror_claims(self.claims.as_ref(), user_id, &record).await;
        Ok(record)
    }

    async fn link_purchase(
        &self,
        user_id: &str,
        result: &VerificationResult,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let hash = token_hash(token);
        let doc_id = PurchaseRecord::document_id(result.platform, &hash);
        let purchase = PurchaseRecord {
            platform: result.platform,
            token_hash: hash,
            uid: user_id.to_string(),
            product_id: result.product_id.clone(),
            status: result.status.clone(),
            expires_at: result.expires_at,
            created_at: now,
            updated_at: now,
        };

        if self
            .store
            .create(PURCHASES_COLLECTION, &doc_id, purchase.to_document())
            .await?
        {
            info!(user_id, purchase = %doc_id, "Linked new purchase");
            return Ok(());
        }

        let existing = self
            .store
            .get(PURCHASES_COLLECTION, &doc_id)
            .await?
            .unwrap_or_default();
        if PurchaseRecord::owner(&existing).is_some_and(|owner| owner != user_id) {
            warn!(user_id, purchase = %doc_id, "Purchase token already linked to another user");
            return Err(AppError::Conflict(
                ConflictReason::PurchaseTokenLinkedToAnotherUser,
            ));
        }

        let mut update = purchase.to_document();
        if existing.contains_key("created_at") {
            update.remove("created_at");
        }
        self.store
            .set(PURCHASES_COLLECTION, &doc_id, update, true)
            .await
    }

    async fn match_tariff(&self, result: &VerificationResult) -> Option<TariffCatalogEntry> {
        let product_id = result.product_id.as_deref()?;
        match self
            .catalog
            .find_by_store_product_id(product_id, result.platform.catalog_platform())
            .await
        {
            Ok(found) => found,
            Err(err) => {
                warn!(product_id, error = %err, "Tariff lookup failed; continuing without match");
                None
            }
        }
    }
}

/// Store statuses that end access once the paid-through date is gone.
const TERMINAL_STATUSES: [&str; 5] = ["expired", "canceled", "cancelled", "revoked", "refunded"];

fn is_terminal_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| {
        let s = s.trim();
        TERMINAL_STATUSES.iter().any(|t| s.eq_ignore_ascii_case(t))
    })
}

/// Plan implied by a verification result. A cancelled or terminal purchase
/// without a future paid-through date grants nothing.
pub fn derive_plan(result: &VerificationResult, now: DateTime<Utc>) -> Plan {
    let terminal = result.cancelled || is_terminal_status(result.status.as_deref());
    if terminal && !is_future(result.expires_at, now) {
        return Plan::Free;
    }
    if is_premium_active(
        Plan::Premium,
        result.expires_at,
        result.status.as_deref(),
        now,
    ) {
        Plan::Premium
    } else {
        Plan::Free
    }
}

fn plan_change_patch(
    current: &EntitlementRecord,
    change: PlanChange,
    now: DateTime<Utc>,
) -> Document {
    let will_be_premium = is_premium_active(
        change.plan,
        change.premium_until,
        change.premium_status.as_deref(),
        now,
    );

    let mut next = current.clone();
    next.plan = change.plan;
    next.premium_source = Some(change.source);
    next.premium_until = change.premium_until;
    next.premium_status = change.premium_status;
    next.premium_since = match (will_be_premium, current.is_premium) {
        (true, true) => current.premium_since.or(Some(now)),
        (true, false) => Some(now),
        (false, _) => None,
    };

    let mut fields = vec![
        EntitlementField::Plan,
        EntitlementField::PremiumSource,
        EntitlementField::PremiumUntil,
        EntitlementField::PremiumStatus,
        EntitlementField::PremiumSince,
        EntitlementField::ActiveTariffId,
    ];

    if change.plan == Plan::Premium {
        next.active_tariff_id = change.tariff_id.or(current.active_tariff_id.clone());
        next.pending_tariff_id = None;
        fields.push(EntitlementField::PendingTariffId);
    } else {
        next.active_tariff_id = None;
        if let Some(tariff_id) = change.tariff_id {
            next.pending_tariff_id = Some(tariff_id);
            fields.push(EntitlementField::PendingTariffId);
        }
    }

    next.patch(fields)
}
