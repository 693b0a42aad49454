//! Rental endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        ids::RentalId,
        rental::{CreateRental, RentalDto, RentalQuery},
        user::UserClaims,
        value_objects::Email,
    },
    services::rentals::RentalAction,
};

use super::AuthenticatedUser;

fn own_email(claims: &UserClaims) -> AppResult<String> {
    claims
        .email
        .clone()
        .ok_or_else(|| AppError::Authentication("Token carries no email".to_string()))
}

/// List rentals. Members only ever see their own.
#[utoipa::path(
    get,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(RentalQuery),
    responses(
        (status = 200, description = "Matching rentals", body = Vec<RentalDto>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse),
        (status = 403, description = "Another user's rentals")
    )
)]
pub async fn list_rentals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<RentalQuery>,
) -> AppResult<Json<Vec<RentalDto>>> {
    query.validate()?;

    if !claims.is_staff() {
        match query.user_email.as_deref() {
            Some(email) => claims.require_email_access(&Email::new(email)?)?,
            None => query.user_email = Some(own_email(&claims)?),
        }
    }

    let rentals = state.services.rentals.list_rentals(&query).await?;
    Ok(Json(rentals.iter().map(RentalDto::from).collect()))
}

/// Get rental by ID
#[utoipa::path(
    get,
    path = "/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental details", body = RentalDto),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<RentalDto>> {
    let rental = state.services.rentals.get_rental(RentalId::parse(&id)?).await?;
    claims.require_email_access(rental.user_email())?;
    Ok(Json(RentalDto::from(&rental)))
}

/// Book a copy
#[utoipa::path(
    post,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = CreateRental,
    responses(
        (status = 201, description = "Rental created", body = RentalDto),
        (status = 400, description = "Invalid dates or email", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available or overlapping rental", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(input): Json<CreateRental>,
) -> AppResult<(StatusCode, Json<RentalDto>)> {
    let email = match input.user_email.clone() {
        Some(email) => email,
        None => own_email(&claims)?,
    };
    claims.require_email_access(&Email::new(&email)?)?;

    let rental = state.services.rentals.create_rental(&input, &email).await?;
    Ok((StatusCode::CREATED, Json(RentalDto::from(&rental))))
}

async fn change_status(
    state: crate::AppState,
    claims: UserClaims,
    id: String,
    action: RentalAction,
) -> AppResult<Json<RentalDto>> {
    let id = RentalId::parse(&id)?;

    if action == RentalAction::Cancel {
        let rental = state.services.rentals.get_rental(id).await?;
        claims.require_email_access(rental.user_email())?;
    } else {
        claims.require_staff()?;
    }

    let rental = state.services.rentals.change_status(id, action).await?;
    Ok(Json(RentalDto::from(&rental)))
}

/// Put a rental back to pending
#[utoipa::path(
    post,
    path = "/rentals/{id}/pending",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental pending", body = RentalDto),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_pending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<RentalDto>> {
    change_status(state, claims, id, RentalAction::Pending).await
}

/// Activate a rental
#[utoipa::path(
    post,
    path = "/rentals/{id}/activate",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental active", body = RentalDto),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<RentalDto>> {
    change_status(state, claims, id, RentalAction::Activate).await
}

/// Complete a rental (book returned)
#[utoipa::path(
    post,
    path = "/rentals/{id}/complete",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental completed", body = RentalDto),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<RentalDto>> {
    change_status(state, claims, id, RentalAction::Complete).await
}

/// Cancel a rental. Members may cancel their own.
#[utoipa::path(
    post,
    path = "/rentals/{id}/cancel",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental cancelled", body = RentalDto),
        (status = 403, description = "Another user's rental"),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<RentalDto>> {
    change_status(state, claims, id, RentalAction::Cancel).await
}
