//! Library rental server
//!
//! REST API over the book catalog, member profiles and rentals.

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use library_rental::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Held until shutdown so buffered log lines are flushed
    let _log_guard = init_tracing(&config.logging)?;

    tracing::info!("Starting library rental server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), &config).context("Failed to create services")?;

    if !config.email.enabled {
        tracing::warn!("Email notifications are disabled");
    }
    if config.rentals.restock_on_close {
        tracing::info!("Closing a rental returns its copy to stock");
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        repository,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Console output in the configured format, plus daily files when a
/// directory is configured
fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_rental={},tower_http=debug", config.level).into());

    let console = match config.format.as_str() {
        "json" => fmt::layer().json().with_current_span(true).boxed(),
        _ => fmt::layer().pretty().with_target(true).boxed(),
    };

    let (file, guard) = match config.directory.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(dir, "library-rental.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/register", post(api::auth::register))
        .route("/auth/me", get(api::auth::me))
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book).delete(api::books::delete_book))
        .route("/books/:id/stock", put(api::books::update_stock))
        .route("/books/:id/availability", get(api::books::availability))
        // Rentals
        .route("/rentals", get(api::rentals::list_rentals).post(api::rentals::create_rental))
        .route("/rentals/:id", get(api::rentals::get_rental))
        .route("/rentals/:id/pending", post(api::rentals::mark_pending))
        .route("/rentals/:id/activate", post(api::rentals::activate))
        .route("/rentals/:id/complete", post(api::rentals::complete))
        .route("/rentals/:id/cancel", post(api::rentals::cancel))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/email", put(api::users::change_email))
        .route("/users/:id/biography", put(api::users::change_biography))
        .route("/users/:id/role", put(api::users::change_role))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
}
