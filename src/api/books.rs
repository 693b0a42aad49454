//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookAvailability, BookDto, BookQuery, CreateBook, UpdateStock},
        ids::BookId,
        rental::DateWindow,
    },
};

use super::AuthenticatedUser;

/// List or look up books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookDto>),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookDto>>> {
    query.validate()?;
    if query.include_deleted.unwrap_or(false) {
        claims.require_staff()?;
    }

    let books = state.services.catalog.search_books(&query).await?;
    Ok(Json(books.iter().map(BookDto::from).collect()))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDto),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookDto>> {
    let book = state.services.catalog.get_book(BookId::parse(&id)?).await?;
    Ok(Json(BookDto::from(&book)))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 400, description = "Invalid field", body = crate::error::ErrorResponse),
        (status = 403, description = "Librarian privileges required"),
        (status = 409, description = "ISBN already catalogued", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(draft): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDto>)> {
    claims.require_staff()?;

    let book = state.services.catalog.create_book(draft).await?;
    Ok((StatusCode::CREATED, Json(BookDto::from(&book))))
}

/// Replace the number of copies
#[utoipa::path(
    put,
    path = "/books/{id}/stock",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    request_body = UpdateStock,
    responses(
        (status = 200, description = "Stock updated", body = BookDto),
        (status = 400, description = "Count outside 0-1500", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStock>,
) -> AppResult<Json<BookDto>> {
    claims.require_staff()?;

    let book = state
        .services
        .catalog
        .update_stock(BookId::parse(&id)?, body.amount_of_copies)
        .await?;
    Ok(Json(BookDto::from(&book)))
}

/// Soft delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.delete_book(BookId::parse(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stock and overlapping rentals for a date window
#[utoipa::path(
    get,
    path = "/books/{id}/availability",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID"), DateWindow),
    responses(
        (status = 200, description = "Availability", body = BookAvailability),
        (status = 400, description = "Invalid dates", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
    Query(window): Query<DateWindow>,
) -> AppResult<Json<BookAvailability>> {
    let availability = state
        .services
        .catalog
        .availability(BookId::parse(&id)?, &window.start_date, &window.end_date)
        .await?;
    Ok(Json(availability))
}
