//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, authors, books, categories, health, notifications, reservations, stats, users,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library Management System REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::overdue_users,
        // Authors
        authors::list_authors,
        authors::search_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::search_books,
        books::available_books,
        books::books_by_category,
        books::books_by_author,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::return_book,
        reservations::user_reservations,
        reservations::book_reservations,
        // Stats
        stats::dashboard,
        stats::reports,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::AuthResponse,
            // Users
            crate::models::user::Role,
            crate::models::user::Permission,
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserWithOverdue,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::pagination::PaginatedUsers,
            // Authors
            crate::models::author::Author,
            crate::models::author::AuthorShort,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::pagination::PaginatedAuthors,
            // Categories
            crate::models::category::CategoryWithCount,
            crate::models::category::CategoryShort,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            crate::models::pagination::PaginatedCategories,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::pagination::PaginatedBooks,
            // Reservations
            crate::models::reservation::ReservationStatus,
            crate::models::reservation::ReservedBook,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::CreateReservation,
            crate::models::pagination::PaginatedReservations,
            // Stats
            crate::models::stats::DashboardStats,
            crate::models::stats::Overview,
            crate::models::stats::PopularBook,
            crate::models::stats::MonthlyStats,
            crate::models::stats::ReportsResponse,
            // Notifications
            crate::models::notification::NotificationKind,
            crate::models::notification::Notification,
            crate::models::pagination::PaginatedNotifications,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "users", description = "User management"),
        (name = "authors", description = "Author management"),
        (name = "categories", description = "Category management"),
        (name = "books", description = "Book catalog"),
        (name = "reservations", description = "Borrowing and returns"),
        (name = "stats", description = "Dashboard and reports"),
        (name = "notifications", description = "In-app notifications")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
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

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_security() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/reservations/{id}/return"));
        assert!(doc.paths.paths.contains_key("/books/search"));
        assert!(doc.paths.paths.contains_key("/users/overdue/books"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
