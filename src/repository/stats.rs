//! Aggregate queries behind the dashboard and reports

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::stats::{DashboardStats, MonthlyStats, PopularBook},
};

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books) AS total_books,
                (SELECT COUNT(*) FROM books WHERE available_copies > 0) AS available_books,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM authors) AS total_authors,
                (SELECT COUNT(*) FROM reservations) AS total_reservations,
                (SELECT COUNT(*) FROM reservations WHERE status = 'borrowed') AS active_reservations,
                (SELECT COUNT(*) FROM reservations
                  WHERE status = 'borrowed' AND returned_at IS NULL AND due_date < NOW()) AS overdue_reservations,
                (SELECT COUNT(*) FROM reservations WHERE status = 'returned') AS returned_reservations
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Most reserved books, ties broken by title
    pub async fn popular_books(&self, limit: i64) -> AppResult<Vec<PopularBook>> {
        let books = sqlx::query_as::<_, PopularBook>(
            r#"
            SELECT b.id, b.title, b.isbn, a.name AS author_name, COUNT(r.id) AS reservations_count
            FROM books b
            JOIN authors a ON a.id = b.author_id
            LEFT JOIN reservations r ON r.book_id = b.id
            GROUP BY b.id, a.name
            ORDER BY reservations_count DESC, b.title
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Activity between `start` (inclusive) and `end` (exclusive)
    pub async fn activity_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<MonthlyStats> {
        let stats = sqlx::query_as::<_, MonthlyStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books WHERE created_at >= $1 AND created_at < $2) AS books_added,
                (SELECT COUNT(*) FROM reservations WHERE reserved_at >= $1 AND reserved_at < $2) AS reservations,
                (SELECT COUNT(*) FROM users WHERE created_at >= $1 AND created_at < $2) AS users_joined,
                (SELECT COUNT(*) FROM reservations WHERE returned_at >= $1 AND returned_at < $2) AS books_returned
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
