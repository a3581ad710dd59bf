use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{entity_store::EntityStore, tariff_catalog::TariffCatalog},
        validators::normalize_tariff_id,
    },
    domain::entities::{purchase::CatalogPlatform, tariff::TariffCatalogEntry},
};

pub const TARIFFS_COLLECTION: &str = "tariff_plans";

/// Tariff catalog read from the entity store.
pub struct StoreTariffCatalog {
    store: Arc<dyn EntityStore>,
}

impl StoreTariffCatalog {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TariffCatalog for StoreTariffCatalog {
    #[instrument(skip(self))]
    async fn get(&self, tariff_id: &str) -> AppResult<TariffCatalogEntry> {
        let id = normalize_tariff_id(tariff_id)?;
        let doc = self
            .store
            .get(TARIFFS_COLLECTION, &id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(TariffCatalogEntry::from_document(&id, &doc))
    }

    async fn find_by_store_product_id(
        &self,
        product_id: &str,
        platform: CatalogPlatform,
    ) -> AppResult<Option<TariffCatalogEntry>> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Ok(None);
        }

        // Compare decoded ids so trimmed and numeric store values still match.
        let mut matches: Vec<TariffCatalogEntry> = self
            .store
            .stream(TARIFFS_COLLECTION)
            .await?
            .into_iter()
            .map(|doc| TariffCatalogEntry::from_document(&doc.id, &doc.fields))
            .filter(|t| t.store_product_ids.get(platform) == Some(product_id))
            .collect();
        sort_for_display(&mut matches);

        Ok(matches.into_iter().next())
    }

    async fn list_active(
        &self,
        platform: Option<CatalogPlatform>,
    ) -> AppResult<Vec<TariffCatalogEntry>> {
        let mut tariffs: Vec<TariffCatalogEntry> = self
            .store
            .stream(TARIFFS_COLLECTION)
            .await?
            .into_iter()
            .map(|doc| TariffCatalogEntry::from_document(&doc.id, &doc.fields))
            .filter(|t| t.is_active)
            .filter(|t| platform.is_none_or(|p| t.store_product_ids.get(p).is_some()))
            .collect();
        sort_for_display(&mut tariffs);
        Ok(tariffs)
    }
}

/// Sort order, then featured first, then id.
fn sort_for_display(tariffs: &mut [TariffCatalogEntry]) {
    tariffs.sort_by(|a, b| {
        (a.sort_order, !a.is_featured, &a.id).cmp(&(b.sort_order, !b.is_featured, &b.id))
    });
}

/// Tariffs shown on the mobile paywall: active recurring subscriptions.
pub async fn paywall_tariffs(
    catalog: &dyn TariffCatalog,
    platform: Option<CatalogPlatform>,
) -> AppResult<Vec<TariffCatalogEntry>> {
    Ok(catalog
        .list_active(platform)
        .await?
        .into_iter()
        .filter(TariffCatalogEntry::is_recurring_subscription)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::entities::tariff::{BillingPeriodUnit, PurchaseType, StoreProductIds},
        test_utils::{InMemoryEntityStore, create_test_tariff, seed_tariff},
    };
    use serde_json::json;

    fn catalog_with(tariffs: &[TariffCatalogEntry]) -> StoreTariffCatalog {
        let store = Arc::new(InMemoryEntityStore::new());
        for t in tariffs {
            seed_tariff(&store, t);
        }
        StoreTariffCatalog::new(store)
    }

    #[tokio::test]
    async fn get_normalizes_id() {
        let catalog = catalog_with(&[create_test_tariff(|t| t.id = "premium-monthly".into())]);

        let tariff = catalog.get("  Premium Monthly ").await.unwrap();

        assert_eq!(tariff.id, "premium-monthly");
    }

    #[tokio::test]
    async fn get_rejects_bad_id_and_missing_entry() {
        let catalog = catalog_with(&[]);

        assert!(matches!(catalog.get("!!").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(catalog.get("nope").await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn find_by_product_id_includes_inactive() {
        let catalog = catalog_with(&[create_test_tariff(|t| {
            t.id = "legacy".into();
            t.is_active = false;
            t.store_product_ids = StoreProductIds {
                ios: Some("com.app.legacy".into()),
                android: None,
            };
        })]);

        let ios = catalog
            .find_by_store_product_id("com.app.legacy", CatalogPlatform::Ios)
            .await
            .unwrap();
        let android = catalog
            .find_by_store_product_id("com.app.legacy", CatalogPlatform::Android)
            .await
            .unwrap();
        let empty = catalog
            .find_by_store_product_id("  ", CatalogPlatform::Ios)
            .await
            .unwrap();

        assert_eq!(ios.map(|t| t.id), Some("legacy".to_string()));
        assert!(android.is_none());
        assert!(empty.is_none());
    }

    #[tokio::test]
    async fn find_by_product_id_matches_decoded_ids() {
        let store = Arc::new(InMemoryEntityStore::new());
        store.insert(
            TARIFFS_COLLECTION,
            "padded",
            json!({ "store_product_ids": { "ios": "  com.app.padded  ", "android": 4242 } }),
        );
        let catalog = StoreTariffCatalog::new(store);

        let padded = catalog
            .find_by_store_product_id("com.app.padded", CatalogPlatform::Ios)
            .await
            .unwrap();
        let numeric = catalog
            .find_by_store_product_id(" 4242 ", CatalogPlatform::Android)
            .await
            .unwrap();

        assert_eq!(padded.map(|t| t.id), Some("padded".to_string()));
        assert_eq!(numeric.map(|t| t.id), Some("padded".to_string()));
    }

    #[tokio::test]
    async fn list_active_filters_and_sorts() {
        let catalog = catalog_with(&[
            create_test_tariff(|t| {
                t.id = "b".into();
                t.sort_order = 1;
            }),
            create_test_tariff(|t| {
                t.id = "a".into();
                t.sort_order = 1;
                t.is_featured = true;
            }),
            create_test_tariff(|t| {
                t.id = "first".into();
                t.sort_order = 0;
            }),
            create_test_tariff(|t| {
                t.id = "off".into();
                t.is_active = false;
            }),
            create_test_tariff(|t| {
                t.id = "ios-only".into();
                t.sort_order = 5;
                t.store_product_ids.android = None;
            }),
        ]);

        let all: Vec<_> = catalog
            .list_active(None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        let android: Vec<_> = catalog
            .list_active(Some(CatalogPlatform::Android))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(all, vec!["first", "a", "b", "ios-only"]);
        assert_eq!(android, vec!["first", "a", "b"]);
    }

    #[tokio::test]
    async fn paywall_excludes_one_time_and_lifetime() {
        let catalog = catalog_with(&[
            create_test_tariff(|t| t.id = "monthly".into()),
            create_test_tariff(|t| {
                t.id = "lifetime".into();
                t.billing_period_unit = BillingPeriodUnit::Lifetime;
                t.billing_period_count = 0;
            }),
            create_test_tariff(|t| {
                t.id = "pack".into();
                t.purchase_type = PurchaseType::OneTime;
            }),
        ]);

        let ids: Vec<_> = paywall_tariffs(&catalog, None)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        assert_eq!(ids, vec!["monthly"]);
    }
}
