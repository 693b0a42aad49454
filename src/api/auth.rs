//! Authentication endpoints backed by the identity provider

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, RoleName, UserDto},
    services::auth::{LoginRequest, TokenResponse},
};

use super::AuthenticatedUser;

/// Identity of the current caller
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub sub: String,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    /// Local profile, absent for accounts only known to the identity provider
    pub profile: Option<UserDto>,
    /// Role recorded on the local profile
    pub profile_role: Option<String>,
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 502, description = "Identity provider unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state.services.auth.login(&request).await?;
    Ok(Json(tokens))
}

/// Register a new member.
///
/// Anyone may register as a Member. Choosing another role needs an admin
/// token.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = UserDto),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Role requires an administrator"),
        (status = 409, description = "Username or email already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    caller: Option<AuthenticatedUser>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserDto>)> {
    let role = request.role.unwrap_or(RoleName::Member);
    if role != RoleName::Member {
        match caller {
            Some(AuthenticatedUser(claims)) => claims.require_admin()?,
            None => {
                return Err(AppError::Authorization(
                    "Only administrators may assign this role".to_string(),
                ))
            }
        }
    }

    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

/// Current user information
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let user = match claims.user_id() {
        Ok(id) => match state.services.users.get_by_id(id).await {
            Ok(user) => Some(user),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        Err(_) => None,
    };
    let profile_role = match &user {
        Some(user) => Some(state.services.users.role_of(user).await?.name),
        None => None,
    };

    Ok(Json(UserInfo {
        sub: claims.sub,
        user_name: claims.preferred_username,
        email: claims.email,
        roles: claims.roles,
        profile: user.as_ref().map(UserDto::from),
        profile_role,
    }))
}
