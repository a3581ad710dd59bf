//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use crate::{
    application::{
        ports::purchase_verifier::VerificationResult,
        use_cases::tariff_catalog::TARIFFS_COLLECTION,
    },
    domain::entities::{
        plan::Plan,
        purchase::StorePlatform,
        tariff::{BillingPeriodUnit, PurchaseType, StoreProductIds, TariffCatalogEntry},
    },
    test_utils::InMemoryEntityStore,
};

/// Fixed "now" used across tests.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Create a test tariff with sensible defaults: an active monthly premium
/// subscription with a 7 day trial, sold on both platforms.
pub fn create_test_tariff(overrides: impl FnOnce(&mut TariffCatalogEntry)) -> TariffCatalogEntry {
    let mut tariff = TariffCatalogEntry {
        id: "premium-monthly".to_string(),
        name: "Premium Monthly".to_string(),
        access_plan: Plan::Premium,
        purchase_type: PurchaseType::Subscription,
        billing_period_unit: BillingPeriodUnit::Month,
        billing_period_count: 1,
        trial_days: 7,
        store_product_ids: StoreProductIds {
            ios: Some("com.voxwallet.premium.monthly".to_string()),
            android: Some("voxwallet.premium.monthly".to_string()),
        },
        is_active: true,
        is_featured: false,
        sort_order: 0,
    };
    overrides(&mut tariff);
    tariff
}

/// Stored form of a tariff, as the admin tooling writes it.
pub fn tariff_document(tariff: &TariffCatalogEntry) -> Value {
    json!({
        "name": tariff.name,
        "access_plan": tariff.access_plan.as_ref(),
        "purchase_type": tariff.purchase_type.as_ref(),
        "billing_period_unit": tariff.billing_period_unit.as_ref(),
        "billing_period_count": tariff.billing_period_count,
        "trial_days": tariff.trial_days,
        "store_product_ids": {
            "ios": tariff.store_product_ids.ios,
            "android": tariff.store_product_ids.android,
        },
        "is_active": tariff.is_active,
        "is_featured": tariff.is_featured,
        "sort_order": tariff.sort_order,
    })
}

/// Put a tariff into the catalog collection without recording a write.
pub fn seed_tariff(store: &InMemoryEntityStore, tariff: &TariffCatalogEntry) {
    store.insert(TARIFFS_COLLECTION, &tariff.id, tariff_document(tariff));
}

/// Create a verification result for an active Google subscription on the
/// default tariff, paid through 30 days after [`test_now`].
pub fn create_test_verification(
    overrides: impl FnOnce(&mut VerificationResult),
) -> VerificationResult {
    let mut result = VerificationResult {
        platform: StorePlatform::Google,
        product_id: Some("voxwallet.premium.monthly".to_string()),
        status: Some("active".to_string()),
        expires_at: Some(test_now() + Duration::days(30)),
        cancelled: false,
        purchase_identity: None,
    };
    overrides(&mut result);
    result
}
