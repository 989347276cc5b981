//! Dashboard and report aggregates

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{category::CategoryWithCount, reservation::ReservationDetails};

#[derive(Debug, Clone, Default, Serialize, FromRow, ToSchema)]
pub struct DashboardStats {
    pub total_books: i64,
    /// Books with at least one copy available
    pub available_books: i64,
    pub total_users: i64,
    pub total_categories: i64,
    pub total_authors: i64,
    pub total_reservations: i64,
    pub active_reservations: i64,
    pub overdue_reservations: i64,
    pub returned_reservations: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Overview {
    pub total_books: i64,
    pub total_users: i64,
    pub total_reservations: i64,
    pub active_reservations: i64,
    pub overdue_reservations: i64,
}

impl From<&DashboardStats> for Overview {
    fn from(stats: &DashboardStats) -> Self {
        Self {
            total_books: stats.total_books,
            total_users: stats.total_users,
            total_reservations: stats.total_reservations,
            active_reservations: stats.active_reservations,
            overdue_reservations: stats.overdue_reservations,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PopularBook {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_name: String,
    pub reservations_count: i64,
}

/// Activity within the current calendar month
#[derive(Debug, Clone, Default, Serialize, FromRow, ToSchema)]
pub struct MonthlyStats {
    pub books_added: i64,
    pub reservations: i64,
    pub users_joined: i64,
    pub books_returned: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportsResponse {
    pub overview: Overview,
    pub popular_books: Vec<PopularBook>,
    pub recent_reservations: Vec<ReservationDetails>,
    pub categories_stats: Vec<CategoryWithCount>,
    pub monthly_stats: MonthlyStats,
}
