//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates an `AppState`
//! backed by the in-memory ports, plus a helper for minting bearer tokens.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use axum::http::HeaderValue;
use secrecy::SecretString;
use serde_json::Value;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::{purchase_verifier::VerificationResult, tariff_catalog::TariffCatalog},
        use_cases::{
            entitlements::EntitlementStore, permissions::PermissionUseCases,
            purchases::PurchaseUseCases, tariff_catalog::StoreTariffCatalog, trials::TrialUseCases,
        },
    },
    domain::entities::{
        permission::AdsConfig, purchase::CatalogPlatform, tariff::TariffCatalogEntry,
    },
    infra::config::AppConfig,
    test_utils::{
        FixedClock, InMemoryEntityStore, RecordingClaimsMirror, StaticPurchaseVerifier,
        seed_tariff, test_now,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// `Authorization` header value for `user_id`.
pub fn test_bearer(user_id: &str, admin: bool) -> String {
    let token = jwt::issue(
        user_id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        chrono::Duration::hours(1),
        admin,
    )
    .unwrap();
    format!("Bearer {token}")
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let (app_state, store, claims) = TestAppStateBuilder::new()
///     .with_tariff(create_test_tariff(|_| {}))
///     .with_verification("tok-1", create_test_verification(|_| {}))
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    store: Arc<InMemoryEntityStore>,
    verifier: StaticPurchaseVerifier,
    admin_uids: HashSet<String>,
    default_ads: HashMap<CatalogPlatform, AdsConfig>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryEntityStore::new()),
            verifier: StaticPurchaseVerifier::new(),
            admin_uids: HashSet::new(),
            default_ads: HashMap::new(),
        }
    }

    /// Add a tariff to the catalog.
    pub fn with_tariff(self, tariff: TariffCatalogEntry) -> Self {
        seed_tariff(&self.store, &tariff);
        self
    }

    /// Seed an arbitrary stored document.
    pub fn with_document(self, collection: &str, id: &str, value: Value) -> Self {
        self.store.insert(collection, id, value);
        self
    }

    /// Canned verifier answer for a raw token or receipt.
    pub fn with_verification(mut self, token: &str, result: VerificationResult) -> Self {
        self.verifier = self.verifier.with_result(token, result);
        self
    }

    /// Treat `user_id` as an administrator without an `admin` claim.
    pub fn with_admin_uid(mut self, user_id: &str) -> Self {
        self.admin_uids.insert(user_id.to_string());
        self
    }

    pub fn with_default_ads(mut self, platform: CatalogPlatform, config: AdsConfig) -> Self {
        self.default_ads.insert(platform, config);
        self
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and return the store and claims mirror for
    /// assertions.
    pub fn build_with_mocks(
        self,
    ) -> (
        AppState,
        Arc<InMemoryEntityStore>,
        Arc<RecordingClaimsMirror>,
    ) {
        let store = self.store;
        let claims = Arc::new(RecordingClaimsMirror::new());
        let clock = Arc::new(FixedClock::new(test_now()));

        let entitlements = Arc::new(EntitlementStore::new(store.clone(), clock));
        let tariff_catalog: Arc<dyn TariffCatalog> =
            Arc::new(StoreTariffCatalog::new(store.clone()));

        let purchase_use_cases = Arc::new(PurchaseUseCases::new(
            entitlements.clone(),
            store.clone(),
            tariff_catalog.clone(),
            Arc::new(self.verifier),
            claims.clone(),
        ));
        let trial_use_cases = Arc::new(TrialUseCases::new(
            entitlements.clone(),
            tariff_catalog.clone(),
            claims.clone(),
        ));
        let permission_use_cases = Arc::new(PermissionUseCases::new(
            entitlements.clone(),
            store.clone(),
            self.default_ads.clone(),
        ));

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            redis_url: String::new(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            verifier_url: Url::parse("http://verifier.test").unwrap(),
            verifier_timeout: Duration::from_secs(5),
            admin_uids: self.admin_uids,
            default_permissions: BTreeMap::new(),
            default_ads: self.default_ads,
        });

        let app_state = AppState {
            config,
            entitlements,
            purchase_use_cases,
            trial_use_cases,
            permission_use_cases,
            tariff_catalog,
        };

        (app_state, store, claims)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
