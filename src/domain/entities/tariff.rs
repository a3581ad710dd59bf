use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use super::{
    document::{Document, FieldRead, read_i64, read_str, read_truthy},
    plan::Plan,
    purchase::CatalogPlatform,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PurchaseType {
    #[default]
    Subscription,
    OneTime,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BillingPeriodUnit {
    Day,
    Week,
    #[default]
    Month,
    Year,
    Lifetime,
}

/// Store product identifiers keyed by catalog platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProductIds {
    pub ios: Option<String>,
    pub android: Option<String>,
}

impl StoreProductIds {
    pub fn get(&self, platform: CatalogPlatform) -> Option<&str> {
        match platform {
            CatalogPlatform::Ios => self.ios.as_deref(),
            CatalogPlatform::Android => self.android.as_deref(),
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };
        let product = |key: &str| match map.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            ios: product("ios"),
            android: product("android"),
        }
    }
}

pub const MAX_TRIAL_DAYS: i64 = 365;

/// Read-only catalog entry describing a purchasable tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffCatalogEntry {
    pub id: String,
    pub name: String,
    pub access_plan: Plan,
    pub purchase_type: PurchaseType,
    pub billing_period_unit: BillingPeriodUnit,
    pub billing_period_count: i64,
    pub trial_days: i64,
    pub store_product_ids: StoreProductIds,
    pub is_active: bool,
    pub is_featured: bool,
    pub sort_order: i64,
}

impl TariffCatalogEntry {
    /// Decode a catalog document. Never fails; bad values fall back to
    /// defaults so a single broken entry cannot take the catalog down.
    pub fn from_document(id: &str, doc: &Document) -> Self {
        let purchase_type: PurchaseType = read_str(doc, "purchase_type")
            .value()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default();
        let billing_period_unit: BillingPeriodUnit = read_str(doc, "billing_period_unit")
            .value()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default();

        let billing_period_count = match billing_period_unit {
            BillingPeriodUnit::Lifetime => 0,
            _ => read_i64(doc, "billing_period_count").value().unwrap_or(1).max(1),
        };

        let is_active = match doc.get("is_active") {
            None | Some(Value::Null) => true,
            Some(_) => read_truthy(doc, "is_active"),
        };

        Self {
            id: id.to_string(),
            name: read_str(doc, "name").value().unwrap_or_else(|| id.to_string()),
            access_plan: Plan::coerce(read_str(doc, "access_plan").value().as_deref(), Plan::Premium),
            purchase_type,
            billing_period_unit,
            billing_period_count,
            trial_days: read_i64(doc, "trial_days")
                .value()
                .unwrap_or(0)
                .clamp(0, MAX_TRIAL_DAYS),
            store_product_ids: StoreProductIds::from_value(doc.get("store_product_ids")),
            is_active,
            is_featured: read_truthy(doc, "is_featured"),
            sort_order: match read_i64(doc, "sort_order") {
                FieldRead::Present(v) => v,
                FieldRead::Absent | FieldRead::Malformed => 0,
            },
        }
    }

    pub fn supports_trial(&self) -> bool {
        self.trial_days > 0
    }

    /// Recurring subscriptions are the only tariffs offered on the paywall.
    pub fn is_recurring_subscription(&self) -> bool {
        self.purchase_type == PurchaseType::Subscription
            && self.billing_period_unit != BillingPeriodUnit::Lifetime
    }
}
