use chrono::{DateTime, Utc};

use super::plan::Plan;
use crate::domain::time::is_future;

/// Status stamped when a premium grant runs out without a store-reported status.
pub const PREMIUM_STATUS_EXPIRED: &str = "expired";

/// Status used for manual grants.
pub const PREMIUM_STATUS_ADMIN: &str = "admin";

/// How a store-reported subscription status affects entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Subscription is paid and current.
    Entitled,
    /// Payment problem or cancellation; entitled until the paid-through date.
    Grace,
    /// Payment never completed or subscription paused.
    Blocked,
    /// Anything else; treated like `Grace`.
    Unrecognized,
}

impl StatusClass {
    pub fn classify(status: &str) -> StatusClass {
        match status.trim().to_lowercase().as_str() {
            "active" | "trialing" => StatusClass::Entitled,
            "past_due" | "unpaid" | "canceled" | "paid" => StatusClass::Grace,
            "incomplete" | "incomplete_expired" | "paused" => StatusClass::Blocked,
            _ => StatusClass::Unrecognized,
        }
    }
}

/// Whether a premium grant is currently in effect.
///
/// A passed `premium_until` always wins over the status. An empty status on a
/// premium plan is trusted.
pub fn is_premium_active(
    plan: Plan,
    premium_until: Option<DateTime<Utc>>,
    premium_status: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    if plan != Plan::Premium {
        return false;
    }
    if premium_until.is_some_and(|until| until <= now) {
        return false;
    }

    let status = premium_status.map(str::trim).unwrap_or_default();
    if status.is_empty() {
        return true;
    }

    match StatusClass::classify(status) {
        StatusClass::Entitled => true,
        StatusClass::Blocked => false,
        StatusClass::Grace | StatusClass::Unrecognized => {
            premium_until.is_none() || is_future(premium_until, now)
        }
    }
}
