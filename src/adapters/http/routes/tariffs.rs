use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::{use_cases::tariff_catalog::paywall_tariffs, validators::parse_platform},
    domain::entities::tariff::TariffCatalogEntry,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/tariffs", get(list_tariffs))
}

#[derive(Deserialize)]
struct TariffsQuery {
    platform: Option<String>,
}

#[derive(Serialize)]
struct TariffsResponse {
    tariffs: Vec<TariffCatalogEntry>,
}

/// GET /api/tariffs?platform=
async fn list_tariffs(
    State(app_state): State<AppState>,
    Query(query): Query<TariffsQuery>,
) -> AppResult<impl IntoResponse> {
    let platform = query
        .platform
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(parse_platform)
        .transpose()?;

    let tariffs = paywall_tariffs(app_state.tariff_catalog.as_ref(), platform).await?;
    Ok(Json(TariffsResponse { tariffs }))
}
