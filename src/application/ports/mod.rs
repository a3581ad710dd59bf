pub mod claims_mirror;
pub mod clock;
pub mod entity_store;
pub mod purchase_verifier;
pub mod tariff_catalog;
