pub mod entitlements;
pub mod permissions;
pub mod purchases;
pub mod tariff_catalog;
pub mod trials;
