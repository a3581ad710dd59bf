use std::{
    collections::{BTreeMap, HashMap, HashSet},
    net::SocketAddr,
    time::Duration,
};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::domain::entities::{
    document::Document,
    permission::{AdsConfig, PermissionMap, decode_permissions},
    plan::Plan,
    purchase::CatalogPlatform,
};

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,
    pub cors_origin: HeaderValue,
    /// Store verification service that talks to Google Play and the App Store.
    pub verifier_url: Url,
    pub verifier_timeout: Duration,
    /// User ids treated as administrators even without an `admin` claim.
    pub admin_uids: HashSet<String>,
    /// Permission maps written for plans that have none yet.
    pub default_permissions: BTreeMap<Plan, PermissionMap>,
    /// Ads config served when a platform has no stored config.
    pub default_ads: HashMap<CatalogPlatform, AdsConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let verifier_url: Url = get_env("VERIFIER_URL");
        let verifier_timeout_secs: u64 = get_env_default("VERIFIER_TIMEOUT_SECS", 30);

        let admin_uids = parse_admin_uids(&get_env_default("ADMIN_UIDS", String::new()));

        let mut default_permissions = BTreeMap::new();
        for (plan, var) in [
            (Plan::Free, "DEFAULT_PERMISSIONS_FREE"),
            (Plan::Premium, "DEFAULT_PERMISSIONS_PREMIUM"),
        ] {
            if let Some(raw) = json_object_env(var) {
                let decoded = decode_permissions(&raw);
                if !decoded.rejected.is_empty() {
                    warn!(var, keys = ?decoded.rejected, "Ignoring unsupported permission values");
                }
                default_permissions.insert(plan, decoded.values);
            }
        }

        let mut default_ads = HashMap::new();
        for (platform, var) in [
            (CatalogPlatform::Ios, "DEFAULT_ADS_CONFIG_IOS"),
            (CatalogPlatform::Android, "DEFAULT_ADS_CONFIG_ANDROID"),
        ] {
            if let Some(config) = json_object_env(var)
                .and_then(|raw| AdsConfig::from_document(&raw, &AdsConfig::default()))
            {
                default_ads.insert(platform, config);
            }
        }

        Self {
            jwt_secret,
            bind_addr,
            database_url,
            redis_url,
            cors_origin,
            verifier_url,
            verifier_timeout: Duration::from_secs(verifier_timeout_secs),
            admin_uids,
            default_permissions,
            default_ads,
        }
    }

    pub fn is_admin_uid(&self, user_id: &str) -> bool {
        self.admin_uids.contains(user_id)
    }
}

fn parse_admin_uids(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read an optional JSON object from the environment. Unset or empty reads as
/// `None`; anything that is not a JSON object is logged and ignored.
fn json_object_env(var: &str) -> Option<Document> {
    let raw: String = get_env_default(var, String::new());
    parse_json_object(var, &raw)
}

fn parse_json_object(var: &str, raw: &str) -> Option<Document> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!(var, "Expected a JSON object; ignoring");
            None
        }
        Err(err) => {
            warn!(var, error = %err, "Invalid JSON; ignoring");
            None
        }
    }
}
