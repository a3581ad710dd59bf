use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    adapters::http::{app_state::AppState, auth::AuthUser},
    app_error::AppResult,
    application::validators::parse_platform,
    domain::entities::permission::AdsConfig,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/config/{platform}", get(get_ads_config))
}

/// GET /api/ads/config/{platform}
async fn get_ads_config(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(platform): Path<String>,
) -> AppResult<Json<AdsConfig>> {
    let platform = parse_platform(&platform)?;
    let config = app_state
        .permission_use_cases
        .ads_config_for(&user.user_id, platform)
        .await?;
    Ok(Json(config))
}
