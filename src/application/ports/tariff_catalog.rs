use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::entities::{purchase::CatalogPlatform, tariff::TariffCatalogEntry},
};

/// Read-only view of the tariff catalog.
#[async_trait]
pub trait TariffCatalog: Send + Sync {
    /// Fails with `NotFound` if no entry has this id.
    async fn get(&self, tariff_id: &str) -> AppResult<TariffCatalogEntry>;

    /// Entry whose store product id for `platform` matches, active or not.
    async fn find_by_store_product_id(
        &self,
        product_id: &str,
        platform: CatalogPlatform,
    ) -> AppResult<Option<TariffCatalogEntry>>;

    /// Active entries, optionally only those sold on `platform`.
    async fn list_active(
        &self,
        platform: Option<CatalogPlatform>,
    ) -> AppResult<Vec<TariffCatalogEntry>>;
}
