use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{
    adapters::http::{app_state::AppState, auth::AuthUser},
    app_error::AppResult,
    application::{
        ports::purchase_verifier::VerificationRequest, use_cases::purchases::AppliedPurchase,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/google/verify", post(verify_google))
        .route("/apple/verify", post(verify_apple))
}

fn default_is_subscription() -> bool {
    true
}

#[derive(Deserialize)]
struct GoogleVerifyPayload {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    purchase_token: String,
    #[serde(default = "default_is_subscription")]
    is_subscription: bool,
}

#[derive(Deserialize)]
struct AppleVerifyPayload {
    #[serde(default)]
    receipt_data: String,
    #[serde(default)]
    product_id: Option<String>,
}

/// POST /api/iap/google/verify
async fn verify_google(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GoogleVerifyPayload>,
) -> AppResult<Json<AppliedPurchase>> {
    let request = VerificationRequest::Google {
        product_id: payload.product_id,
        purchase_token: payload.purchase_token,
        is_subscription: payload.is_subscription,
    };
    let applied = app_state
        .purchase_use_cases
        .verify_and_apply(&user.user_id, request)
        .await?;
    Ok(Json(applied))
}

/// POST /api/iap/apple/verify
async fn verify_apple(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AppleVerifyPayload>,
) -> AppResult<Json<AppliedPurchase>> {
    let request = VerificationRequest::Apple {
        receipt_data: payload.receipt_data,
        product_id: payload.product_id,
    };
    let applied = app_state
        .purchase_use_cases
        .verify_and_apply(&user.user_id, request)
        .await?;
    Ok(Json(applied))
}
