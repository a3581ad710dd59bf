pub mod access_plan;
pub mod document;
pub mod entitlement;
pub mod permission;
pub mod plan;
pub mod premium_status;
pub mod purchase;
pub mod tariff;
