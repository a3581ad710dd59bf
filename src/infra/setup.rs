use std::fs::File;
use std::sync::Arc;

use env_helpers::get_env_default;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        claims::redis_mirror::RedisClaimsMirror, http::app_state::AppState,
        persistence::PostgresPersistence, verifier::http::HttpPurchaseVerifier,
    },
    application::{
        ports::{
            claims_mirror::ClaimsMirror, clock::SystemClock, entity_store::EntityStore,
            tariff_catalog::TariffCatalog,
        },
        use_cases::{
            entitlements::EntitlementStore, permissions::PermissionUseCases,
            purchases::PurchaseUseCases, tariff_catalog::StoreTariffCatalog, trials::TrialUseCases,
        },
    },
    infra::{config::AppConfig, db::init_db},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let store: Arc<dyn EntityStore> = Arc::new(PostgresPersistence::new(pool));
    let claims: Arc<dyn ClaimsMirror> = Arc::new(RedisClaimsMirror::new(&config.redis_url).await?);
    let verifier = Arc::new(HttpPurchaseVerifier::new(
        &config.verifier_url,
        config.verifier_timeout,
    )?);

    let entitlements = Arc::new(EntitlementStore::new(store.clone(), Arc::new(SystemClock)));
    let tariff_catalog: Arc<dyn TariffCatalog> = Arc::new(StoreTariffCatalog::new(store.clone()));

    let purchase_use_cases = PurchaseUseCases::new(
        entitlements.clone(),
        store.clone(),
        tariff_catalog.clone(),
        verifier,
        claims.clone(),
    );
    let trial_use_cases = TrialUseCases::new(entitlements.clone(), tariff_catalog.clone(), claims);
    let permission_use_cases =
        PermissionUseCases::new(entitlements.clone(), store, config.default_ads.clone());

    let seeded = permission_use_cases
        .seed_defaults(&config.default_permissions)
        .await?;
    info!(seeded = seeded.len(), "Plan permissions ready");

    Ok(AppState {
        config: Arc::new(config),
        entitlements,
        purchase_use_cases: Arc::new(purchase_use_cases),
        trial_use_cases: Arc::new(trial_use_cases),
        permission_use_cases: Arc::new(permission_use_cases),
        tariff_catalog,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voxwallet_entitlements=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs), only when LOG_FILE is set
    let log_file: String = get_env_default("LOG_FILE", String::new());
    let json_layer = (!log_file.is_empty())
        .then(|| File::create(&log_file))
        .and_then(|file| match file {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!("cannot create log file {log_file}: {err}");
                None
            }
        })
        .map(|file| {
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
