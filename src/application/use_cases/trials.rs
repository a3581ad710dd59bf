use std::sync::Arc;

use chrono::Duration;
use tracing::{info, instrument};

use crate::{
    app_error::{AppError, AppResult, ConflictReason},
    application::{
        ports::{claims_mirror::ClaimsMirror, tariff_catalog::TariffCatalog},
        use_cases::entitlements::{EntitlementStore, mirror_claims},
    },
    domain::entities::{
        document::Document,
        entitlement::{EntitlementField, EntitlementRecord},
        plan::TrialStatus,
        tariff::TariffCatalogEntry,
    },
};

pub struct TrialUseCases {
    entitlements: Arc<EntitlementStore>,
    catalog: Arc<dyn TariffCatalog>,
    claims: Arc<dyn ClaimsMirror>,
}

impl TrialUseCases {
    pub fn new(
        entitlements: Arc<EntitlementStore>,
        catalog: Arc<dyn TariffCatalog>,
        claims: Arc<dyn ClaimsMirror>,
    ) -> Self {
        Self {
            entitlements,
            catalog,
            claims,
        }
    }

    /// Start the one trial a user gets, on the given tariff.
    #[instrument(skip(self))]
    pub async fn start_trial(
        &self,
        user_id: &str,
        tariff_id: &str,
    ) -> AppResult<(EntitlementRecord, TariffCatalogEntry)> {
        let tariff = self.catalog.get(tariff_id).await?;
        if !tariff.is_active {
            return Err(AppError::InvalidInput("Tariff is inactive".into()));
        }
        if !tariff.supports_trial() {
            return Err(AppError::InvalidInput(
                "Selected tariff does not support trial".into(),
            ));
        }

        let trial_length = Duration::try_days(tariff.trial_days)
            .filter(|length| self.entitlements.now().checked_add_signed(*length).is_some())
            .ok_or_else(|| AppError::InvalidInput("Invalid trial length".into()))?;

        let current = self.entitlements.view(user_id).await?;
        check_trial_eligibility(&current)?;

        let trial_tariff_id = tariff.id.clone();
        let trial_access_plan = tariff.access_plan;
        let mut rejected = None;
        let rejected_slot = &mut rejected;
        let record = self
            .entitlements
            .reconcile(user_id, move |current, now| {
                // A concurrent start may have landed since the view.
                if let Err(err) = check_trial_eligibility(current) {
                    *rejected_slot = Some(err);
                    return Document::new();
                }
                let mut next = current.clone();
                next.trial_status = TrialStatus::Active;
                next.trial_started_at = Some(now);
                next.trial_ends_at = now.checked_add_signed(trial_length);
                next.trial_tariff_id = Some(trial_tariff_id.clone());
                next.trial_access_plan = Some(trial_access_plan);
                next.trial_consumed = true;
                next.pending_tariff_id = Some(trial_tariff_id);
                next.patch([
                    EntitlementField::TrialStatus,
                    EntitlementField::TrialStartedAt,
                    EntitlementField::TrialEndsAt,
                    EntitlementField::TrialTariffId,
                    EntitlementField::TrialAccessPlan,
                    EntitlementField::TrialConsumed,
                    EntitlementField::PendingTariffId,
                ])
            })
            .await?;
        if let Some(err) = rejected {
            return Err(err);
        }

        mirror_claims(self.claims.as_ref(), user_id, &record).await;
        info!(
            user_id,
            tariff_id = %tariff.id,
            trial_ends_at = ?record.trial_ends_at,
            "Trial started"
        );
        Ok((record, tariff))
    }
}

fn check_trial_eligibility(record: &EntitlementRecord) -> AppResult<()> {
    if record.is_premium {
        return Err(AppError::Conflict(ConflictReason::PremiumUserCannotStartTrial));
    }
    if record.trial_status == TrialStatus::Active {
        return Err(AppError::Conflict(ConflictReason::TrialAlreadyActive));
    }
    if record.trial_consumed {
        return Err(AppError::Conflict(ConflictReason::TrialAlreadyUsed));
    }
    Ok(())
}
