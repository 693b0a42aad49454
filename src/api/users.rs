//! User management endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        ids::UserId,
        user::{ChangeBiography, ChangeEmail, ChangeRole, UserDto},
    },
};

use super::AuthenticatedUser;

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserDto>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserDto>>> {
    claims.require_staff()?;

    let users = state.services.users.list().await?;
    Ok(Json(users.iter().map(UserDto::from).collect()))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDto),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserDto>> {
    let id = UserId::parse(&id)?;
    claims.require_self_or_staff(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(UserDto::from(&user)))
}

/// Change a user's email. Both addresses are notified.
#[utoipa::path(
    put,
    path = "/users/{id}/email",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangeEmail,
    responses(
        (status = 200, description = "Email changed", body = UserDto),
        (status = 400, description = "Invalid email", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_email(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<ChangeEmail>,
) -> AppResult<Json<UserDto>> {
    let id = UserId::parse(&id)?;
    claims.require_self_or_staff(id)?;

    let user = state.services.users.change_email(id, &body.email).await?;
    Ok(Json(UserDto::from(&user)))
}

#[utoipa::path(
    put,
    path = "/users/{id}/biography",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangeBiography,
    responses(
        (status = 200, description = "Biography changed", body = UserDto),
        (status = 400, description = "Invalid biography", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_biography(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<ChangeBiography>,
) -> AppResult<Json<UserDto>> {
    let id = UserId::parse(&id)?;
    claims.require_self_or_staff(id)?;

    let user = state.services.users.change_biography(id, &body.biography).await?;
    Ok(Json(UserDto::from(&user)))
}

/// Change a user's role (admin only)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangeRole,
    responses(
        (status = 200, description = "Role changed", body = UserDto),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<ChangeRole>,
) -> AppResult<Json<UserDto>> {
    claims.require_admin()?;

    let user = state
        .services
        .users
        .change_role(UserId::parse(&id)?, body.role)
        .await?;
    Ok(Json(UserDto::from(&user)))
}
