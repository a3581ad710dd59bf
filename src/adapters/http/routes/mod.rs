pub mod admin;
pub mod ads;
pub mod iap;
pub mod me;
pub mod tariffs;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/me", me::router())
        .nest("/iap", iap::router())
        .nest("/admin", admin::router())
        .nest("/ads", ads::router())
        .merge(tariffs::router())
}
