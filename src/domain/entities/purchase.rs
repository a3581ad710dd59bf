use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumString};

use super::document::{Document, read_str};
use crate::domain::time::format_instant;

/// App store that issued a purchase token.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StorePlatform {
    Google,
    Apple,
}

/// Device platform used by the tariff catalog and ad configuration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CatalogPlatform {
    Ios,
    Android,
}

impl StorePlatform {
    pub fn catalog_platform(&self) -> CatalogPlatform {
        match self {
            StorePlatform::Google => CatalogPlatform::Android,
            StorePlatform::Apple => CatalogPlatform::Ios,
        }
    }

    /// Provenance recorded on entitlements granted through this store.
    pub fn premium_source(&self) -> String {
        format!("iap:{}", self.as_ref())
    }
}

/// Hex-encoded SHA-256 of a raw purchase token.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Ownership and last known state of a single store purchase.
///
/// Keyed by platform and token hash, never by user, so a token cannot move
/// between accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub platform: StorePlatform,
    pub token_hash: String,
    pub uid: String,
    pub product_id: Option<String>,
    pub status: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRecord {
    pub fn document_id(platform: StorePlatform, token_hash: &str) -> String {
        format!("{}_{}", platform.as_ref(), token_hash)
    }

    /// Owning user id stored on a purchase document, if any.
    pub fn owner(doc: &Document) -> Option<String> {
        read_str(doc, "uid").value()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("platform".into(), Value::from(self.platform.as_ref()));
        doc.insert("token_hash".into(), Value::from(self.token_hash.clone()));
        doc.insert("uid".into(), Value::from(self.uid.clone()));
        doc.insert("product_id".into(), self.product_id.clone().into());
        doc.insert("status".into(), self.status.clone().into());
        doc.insert(
            "expires_at".into(),
            self.expires_at.map(format_instant).into(),
        );
        doc.insert("created_at".into(), format_instant(self.created_at).into());
        doc.insert("updated_at".into(), format_instant(self.updated_at).into());
        doc
    }
}
