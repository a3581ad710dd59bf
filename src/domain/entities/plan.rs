use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Base billing plan and, after resolution, the effective access plan.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    /// Lenient read of a stored plan name; unknown or missing values fall back
    /// to `default`.
    pub fn coerce(value: Option<&str>, default: Plan) -> Plan {
        value
            .and_then(|v| v.trim().parse::<Plan>().ok())
            .unwrap_or(default)
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Plan::Premium)
    }
}

/// Lifecycle of the one-time trial.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TrialStatus {
    #[default]
    None,
    Active,
    Expired,
    Converted,
    Canceled,
}

impl TrialStatus {
    /// Unknown values coerce to `None`.
    pub fn coerce(value: Option<&str>) -> TrialStatus {
        value
            .and_then(|v| v.trim().parse::<TrialStatus>().ok())
            .unwrap_or_default()
    }
}
