use std::sync::Arc;

use crate::{
    application::{
        ports::tariff_catalog::TariffCatalog,
        use_cases::{
            entitlements::EntitlementStore, permissions::PermissionUseCases,
            purchases::PurchaseUseCases, trials::TrialUseCases,
        },
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub entitlements: Arc<EntitlementStore>,
    pub purchase_use_cases: Arc<PurchaseUseCases>,
    pub trial_use_cases: Arc<TrialUseCases>,
    pub permission_use_cases: Arc<PermissionUseCases>,
    pub tariff_catalog: Arc<dyn TariffCatalog>,
}
