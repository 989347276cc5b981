//! Libris Server - Library Management System
//!
//! REST API server for books, authors, categories, members and reservations.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use libris_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{redis::RedisService, Services},
    telemetry, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging);

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = Repository::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Connected to Redis");

    let (services, background) = Services::new(repository, &config, redis_service);
    background.spawn();

    if let Some(admin) = &config.admin {
        services
            .users
            .ensure_admin(admin)
            .await
            .context("Failed to create administrator account")?;
    }

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login));

    // Every successful response here may schedule an overdue check
    let protected = Router::new()
        // Auth
        .route("/logout", post(api::auth::logout))
        .route("/me", get(api::auth::me))
        // Users
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route("/users/overdue/books", get(api::users::overdue_users))
        .route(
            "/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        // Authors
        .route("/authors", get(api::authors::list_authors).post(api::authors::create_author))
        .route("/authors/search", get(api::authors::search_authors))
        .route(
            "/authors/:id",
            get(api::authors::get_author)
                .put(api::authors::update_author)
                .delete(api::authors::delete_author),
        )
        // Categories
        .route(
            "/categories",
            get(api::categories::list_categories).post(api::categories::create_category),
        )
        .route(
            "/categories/:id",
            get(api::categories::get_category)
                .put(api::categories::update_category)
                .delete(api::categories::delete_category),
        )
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route("/books/search", get(api::books::search_books))
        .route("/books/available", get(api::books::available_books))
        .route("/books/category/:id", get(api::books::books_by_category))
        .route("/books/author/:id", get(api::books::books_by_author))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        // Reservations
        .route(
            "/reservations",
            get(api::reservations::list_reservations).post(api::reservations::create_reservation),
        )
        .route("/reservations/:id", get(api::reservations::get_reservation))
        .route("/reservations/:id/return", patch(api::reservations::return_book))
        .route("/reservations/user/:id", get(api::reservations::user_reservations))
        .route("/reservations/book/:id", get(api::reservations::book_reservations))
        // Statistics
        .route("/stats/dashboard", get(api::stats::dashboard))
        .route("/stats/reports", get(api::stats::reports))
        // Notifications
        .route("/notifications", get(api::notifications::list_notifications))
        .route("/notifications/:id/read", post(api::notifications::mark_read))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::middleware::trigger_overdue_check,
        ));

    let api_v1 = public.merge(protected).with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(api::openapi::create_openapi_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
