//! Canonical entitlement state and the normalizer that produces it.
//!
//! Stored user documents are written by several generations of clients and
//! may be stale (expired premium, trials past their end) or malformed. Every
//! read goes through [`normalize`], which derives the canonical record and
//! reports which stored fields disagree with it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use super::{
    access_plan::resolve_access_plan,
    document::{Document, read_instant, read_str, read_truthy},
    plan::{Plan, TrialStatus},
    premium_status::{PREMIUM_STATUS_EXPIRED, is_premium_active},
};
use crate::domain::time::{format_instant, is_future, parse_instant};

/// Persisted fields of a user's entitlement, in storage order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EntitlementField {
    Plan,
    AccessPlan,
    IsPremium,
    PremiumStatus,
    PremiumUntil,
    PremiumSince,
    PremiumSource,
    ActiveTariffId,
    PendingTariffId,
    TrialStatus,
    TrialStartedAt,
    TrialEndsAt,
    TrialExpiredAt,
    TrialConvertedAt,
    TrialTariffId,
    TrialAccessPlan,
    TrialConsumed,
}

impl EntitlementField {
    /// Document key for this field.
    pub fn key(self) -> &'static str {
        self.into()
    }

    fn is_instant(self) -> bool {
        matches!(
            self,
            EntitlementField::PremiumUntil
                | EntitlementField::PremiumSince
                | EntitlementField::TrialStartedAt
                | EntitlementField::TrialEndsAt
                | EntitlementField::TrialExpiredAt
                | EntitlementField::TrialConvertedAt
        )
    }
}

/// A user's entitlement after normalization.
///
/// `is_premium` and `access_plan` are derived on every read. They are written
/// back so the stored document mirrors what readers saw, but never read as a
/// source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub plan: Plan,
    pub access_plan: Plan,
    pub is_premium: bool,
    pub premium_status: Option<String>,
    pub premium_until: Option<DateTime<Utc>>,
    pub premium_since: Option<DateTime<Utc>>,
    pub premium_source: Option<String>,
    pub active_tariff_id: Option<String>,
    pub pending_tariff_id: Option<String>,
    pub trial_status: TrialStatus,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_expired_at: Option<DateTime<Utc>>,
    pub trial_converted_at: Option<DateTime<Utc>>,
    pub trial_tariff_id: Option<String>,
    pub trial_access_plan: Option<Plan>,
    pub trial_consumed: bool,
}

/// The reduced view mirrored into auth claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementClaims {
    pub plan: Plan,
    pub is_premium: bool,
    pub access_plan: Plan,
}

impl EntitlementRecord {
    /// JSON value of a single field as it is persisted. `None` maps to null.
    pub fn field_value(&self, field: EntitlementField) -> Value {
        fn opt_str(v: &Option<String>) -> Value {
            v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))
        }
        fn opt_instant(v: &Option<DateTime<Utc>>) -> Value {
            v.map_or(Value::Null, |dt| Value::String(format_instant(dt)))
        }

        match field {
            EntitlementField::Plan => Value::from(self.plan.as_ref()),
            EntitlementField::AccessPlan => Value::from(self.access_plan.as_ref()),
            EntitlementField::IsPremium => Value::Bool(self.is_premium),
            EntitlementField::PremiumStatus => opt_str(&self.premium_status),
            EntitlementField::PremiumUntil => opt_instant(&self.premium_until),
            EntitlementField::PremiumSince => opt_instant(&self.premium_since),
            EntitlementField::PremiumSource => opt_str(&self.premium_source),
            EntitlementField::ActiveTariffId => opt_str(&self.active_tariff_id),
            EntitlementField::PendingTariffId => opt_str(&self.pending_tariff_id),
            EntitlementField::TrialStatus => Value::from(self.trial_status.as_ref()),
            EntitlementField::TrialStartedAt => opt_instant(&self.trial_started_at),
            EntitlementField::TrialEndsAt => opt_instant(&self.trial_ends_at),
            EntitlementField::TrialExpiredAt => opt_instant(&self.trial_expired_at),
            EntitlementField::TrialConvertedAt => opt_instant(&self.trial_converted_at),
            EntitlementField::TrialTariffId => opt_str(&self.trial_tariff_id),
            EntitlementField::TrialAccessPlan => self
                .trial_access_plan
                .map_or(Value::Null, |p| Value::from(p.as_ref())),
            EntitlementField::TrialConsumed => Value::Bool(self.trial_consumed),
        }
    }

    /// Document containing only the given fields.
    pub fn patch<I>(&self, fields: I) -> Document
    where
        I: IntoIterator<Item = EntitlementField>,
    {
        fields
            .into_iter()
            .map(|f| (f.key().to_string(), self.field_value(f)))
            .collect()
    }

    /// Full document for every entitlement field.
    pub fn to_document(&self) -> Document {
        self.patch(EntitlementField::iter())
    }

    pub fn claims(&self) -> EntitlementClaims {
        EntitlementClaims {
            plan: self.plan,
            is_premium: self.is_premium,
            access_plan: self.access_plan,
        }
    }
}

/// Entitlement fields read leniently from a stored document.
///
/// Malformed values read as absent; the normalizer's diff flags them so the
/// next write replaces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntitlement {
    pub plan: Option<String>,
    pub premium_status: Option<String>,
    pub premium_until: Option<DateTime<Utc>>,
    pub premium_since: Option<DateTime<Utc>>,
    pub premium_source: Option<String>,
    pub active_tariff_id: Option<String>,
    pub pending_tariff_id: Option<String>,
    pub trial_status: Option<String>,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_expired_at: Option<DateTime<Utc>>,
    pub trial_converted_at: Option<DateTime<Utc>>,
    pub trial_tariff_id: Option<String>,
    pub trial_access_plan: Option<String>,
    pub trial_consumed: bool,
}

impl RawEntitlement {
    pub fn from_document(doc: &Document) -> Self {
        let s = |f: EntitlementField| read_str(doc, f.key()).value();
        let t = |f: EntitlementField| read_instant(doc, f.key()).value();

        Self {
            plan: s(EntitlementField::Plan),
            premium_status: s(EntitlementField::PremiumStatus),
            premium_until: t(EntitlementField::PremiumUntil),
            premium_since: t(EntitlementField::PremiumSince),
            premium_source: s(EntitlementField::PremiumSource),
            active_tariff_id: s(EntitlementField::ActiveTariffId),
            pending_tariff_id: s(EntitlementField::PendingTariffId),
            trial_status: s(EntitlementField::TrialStatus),
            trial_started_at: t(EntitlementField::TrialStartedAt),
            trial_ends_at: t(EntitlementField::TrialEndsAt),
            trial_expired_at: t(EntitlementField::TrialExpiredAt),
            trial_converted_at: t(EntitlementField::TrialConvertedAt),
            trial_tariff_id: s(EntitlementField::TrialTariffId),
            trial_access_plan: s(EntitlementField::TrialAccessPlan),
            trial_consumed: read_truthy(doc, EntitlementField::TrialConsumed.key()),
        }
    }
}

/// Result of normalizing a stored document.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub record: EntitlementRecord,
    /// Fields whose stored value differs from the canonical one.
    pub changed: BTreeSet<EntitlementField>,
}

impl Normalized {
    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Document holding just the fields that need rewriting.
    pub fn changes(&self) -> Document {
        self.record.patch(self.changed.iter().copied())
    }
}

/// Derive the canonical record from leniently-read fields.
///
/// Steps run in a fixed order; later steps see earlier results.
pub fn canonicalize(raw: &RawEntitlement, now: DateTime<Utc>) -> EntitlementRecord {
    let mut plan = Plan::coerce(raw.plan.as_deref(), Plan::Free);
    let mut premium_status = raw.premium_status.clone();
    let premium_until = raw.premium_until;
    let is_premium = is_premium_active(plan, premium_until, premium_status.as_deref(), now);

    if plan == Plan::Premium && !is_premium {
        plan = Plan::Free;
        if premium_until.is_some_and(|until| until <= now) && premium_status.is_none() {
            premium_status = Some(PREMIUM_STATUS_EXPIRED.to_string());
        }
    }

    let mut trial_status = TrialStatus::coerce(raw.trial_status.as_deref());
    let mut trial_consumed = raw.trial_consumed;
    let mut trial_expired_at = raw.trial_expired_at;
    let mut trial_converted_at = raw.trial_converted_at;
    let mut pending_tariff_id = raw.pending_tariff_id.clone();

    if trial_status == TrialStatus::Active {
        if is_future(raw.trial_ends_at, now) {
            trial_consumed = true;
        } else {
            trial_status = TrialStatus::Expired;
            trial_expired_at.get_or_insert(now);
            // Nothing is pending once the trial that selected it is over.
            if pending_tariff_id.is_some() && pending_tariff_id == raw.trial_tariff_id {
                pending_tariff_id = None;
            }
        }
    }

    if plan == Plan::Premium && trial_status == TrialStatus::Active {
        trial_status = TrialStatus::Converted;
        trial_converted_at.get_or_insert(now);
        pending_tariff_id = None;
    }

    let trial_access_plan = match raw.trial_access_plan.as_deref() {
        Some(value) => Some(Plan::coerce(Some(value), Plan::Premium)),
        None => (trial_status == TrialStatus::Active).then_some(Plan::Premium),
    };

    let access_plan = resolve_access_plan(
        plan,
        is_premium,
        trial_status,
        raw.trial_ends_at,
        trial_access_plan,
        now,
    );

    let active_tariff_id = if plan == Plan::Premium {
        raw.active_tariff_id.clone()
    } else {
        None
    };

    EntitlementRecord {
        plan,
        access_plan,
        is_premium,
        premium_status,
        premium_until,
        premium_since: raw.premium_since,
        premium_source: raw.premium_source.clone(),
        active_tariff_id,
        pending_tariff_id,
        trial_status,
        trial_started_at: raw.trial_started_at,
        trial_ends_at: raw.trial_ends_at,
        trial_expired_at,
        trial_converted_at,
        trial_tariff_id: raw.trial_tariff_id.clone(),
        trial_access_plan,
        trial_consumed,
    }
}

/// Normalize a stored document against `now`.
///
/// Never fails: unknown enum values coerce to safe defaults and malformed
/// fields are reported as changed.
pub fn normalize(doc: &Document, now: DateTime<Utc>) -> Normalized {
    let record = canonicalize(&RawEntitlement::from_document(doc), now);
    let changed = EntitlementField::iter()
        .filter(|&field| !stored_matches(doc, field, &record.field_value(field)))
        .collect();

    Normalized { record, changed }
}

fn stored_matches(doc: &Document, field: EntitlementField, canonical: &Value) -> bool {
    let stored = doc.get(field.key()).unwrap_or(&Value::Null);
    if canonical.is_null() {
        return stored.is_null();
    }
    if field.is_instant() {
        // Same instant written with a different offset is not drift.
        let stored = stored.as_str().and_then(parse_instant);
        let canonical = canonical.as_str().and_then(parse_instant);
        return stored.is_some() && stored == canonical;
    }
    stored == canonical
}
