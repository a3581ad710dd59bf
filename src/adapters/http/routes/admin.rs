use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Deserialize;

use crate::{
    adapters::http::{app_state::AppState, auth::AuthUser},
    app_error::{AppError, AppResult},
    application::use_cases::purchases::AdminPlanUpdate,
    domain::{entities::entitlement::EntitlementRecord, time::parse_instant},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{uid}/plan", post(set_user_plan))
}

#[derive(Deserialize)]
struct SetPlanPayload {
    plan: String,
    #[serde(default)]
    premium_until: Option<String>,
    #[serde(default)]
    tariff_id: Option<String>,
}

/// POST /api/admin/users/{uid}/plan
async fn set_user_plan(
    State(app_state): State<AppState>,
    admin: AuthUser,
    Path(uid): Path<String>,
    Json(payload): Json<SetPlanPayload>,
) -> AppResult<Json<EntitlementRecord>> {
    admin.require_admin()?;

    let uid = uid.trim();
    if uid.is_empty() {
        return Err(AppError::InvalidInput("Missing uid".into()));
    }

    let premium_until = match payload.premium_until.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            parse_instant(raw)
                .ok_or_else(|| AppError::InvalidInput("Invalid premium_until".into()))?,
        ),
    };
    let tariff_id = payload.tariff_id.filter(|t| !t.trim().is_empty());

    let record = app_state
        .purchase_use_cases
        .set_plan(
            uid,
            &admin.user_id,
            AdminPlanUpdate {
                plan: payload.plan,
                premium_until,
                tariff_id,
            },
        )
        .await?;
    Ok(Json(record))
}
