//! API handlers for the library rental REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod rentals;
pub mod users;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for the caller's verified bearer token claims
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = state.services.auth.validate_token(bearer.token())?;
        Ok(AuthenticatedUser(claims))
    }
}
