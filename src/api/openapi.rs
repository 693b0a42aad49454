//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, rentals, users};

/// Registers the `bearer_auth` scheme referenced by the handlers
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Rental API",
        version = "1.0.0",
        description = "Book catalog, members and rentals REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_stock,
        books::delete_book,
        books::availability,
        // Rentals
        rentals::list_rentals,
        rentals::get_rental,
        rentals::create_rental,
        rentals::mark_pending,
        rentals::activate,
        rentals::complete,
        rentals::cancel,
        // Users
        users::list_users,
        users::get_user,
        users::change_email,
        users::change_biography,
        users::change_role,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth::LoginRequest,
            crate::services::auth::TokenResponse,
            auth::UserInfo,
            // Books
            crate::models::book::BookDto,
            crate::models::book::CreateBook,
            crate::models::book::UpdateStock,
            crate::models::book::BookAvailability,
            // Rentals
            crate::models::rental::RentalDto,
            crate::models::rental::RentalStatus,
            crate::models::rental::CreateRental,
            // Users
            crate::models::user::UserDto,
            crate::models::user::RegisterUser,
            crate::models::user::RoleName,
            crate::models::user::ChangeEmail,
            crate::models::user::ChangeBiography,
            crate::models::user::ChangeRole,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication through the identity provider"),
        (name = "books", description = "Book catalog"),
        (name = "rentals", description = "Rental lifecycle"),
        (name = "users", description = "User profiles")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
