use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> AppResult<Self> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidCredentials)?;

        let claims = jwt::verify(bearer.token(), &state.config.jwt_secret)?;
        if claims.sub.trim().is_empty() {
            return Err(AppError::InvalidCredentials);
        }

        let is_admin = claims.admin == Some(true) || state.config.is_admin_uid(&claims.sub);
        Ok(AuthUser {
            user_id: claims.sub,
            is_admin,
        })
    }
}
