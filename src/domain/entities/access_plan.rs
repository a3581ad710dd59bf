use chrono::{DateTime, Utc};

use super::plan::{Plan, TrialStatus};
use crate::domain::time::is_future;

/// A trial counts only while its status is active and its end is in the future.
pub fn is_trial_active(
    trial_status: TrialStatus,
    trial_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    trial_status == TrialStatus::Active && is_future(trial_ends_at, now)
}

/// Effective plan used for permission lookups and ad gating.
///
/// This is the only place the effective plan is derived; everything that needs
/// it reads `access_plan` from a canonical record.
pub fn resolve_access_plan(
    plan: Plan,
    is_premium: bool,
    trial_status: TrialStatus,
    trial_ends_at: Option<DateTime<Utc>>,
    trial_access_plan: Option<Plan>,
    now: DateTime<Utc>,
) -> Plan {
    if is_premium {
        return Plan::Premium;
    }
    if is_trial_active(trial_status, trial_ends_at, now) {
        return trial_access_plan.unwrap_or(Plan::Premium);
    }
    plan
}
