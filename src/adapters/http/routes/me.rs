use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::AuthUser},
    app_error::AppResult,
    domain::entities::{
        entitlement::EntitlementRecord,
        permission::PermissionValue,
        plan::Plan,
        tariff::TariffCatalogEntry,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entitlement", get(get_entitlement))
        .route("/permissions", get(get_permissions))
        .route("/trial/start", post(start_trial))
}

/// GET /api/me/entitlement
async fn get_entitlement(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<EntitlementRecord>> {
    let record = app_state.entitlements.load_canonical(&user.user_id).await?;
    Ok(Json(record))
}

#[derive(Serialize)]
struct PermissionsResponse {
    plan: Plan,
    permissions: BTreeMap<String, PermissionValue>,
}

/// GET /api/me/permissions
async fn get_permissions(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let (plan, permissions) = app_state
        .permission_use_cases
        .permissions_for(&user.user_id)
        .await?;

    Ok(Json(PermissionsResponse { plan, permissions }))
}

#[derive(Deserialize)]
struct StartTrialPayload {
    tariff_id: String,
}

#[derive(Serialize)]
struct StartTrialResponse {
    entitlement: EntitlementRecord,
    tariff: TariffCatalogEntry,
}

/// POST /api/me/trial/start
async fn start_trial(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<StartTrialPayload>,
) -> AppResult<impl IntoResponse> {
    let (entitlement, tariff) = app_state
        .trial_use_cases
        .start_trial(&user.user_id, &payload.tariff_id)
        .await?;

    Ok(Json(StartTrialResponse {
        entitlement,
        tariff,
    }))
}
