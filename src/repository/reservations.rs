//! Reservations repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::PageQuery,
        reservation::{
            Reservation, ReservationDetails, ReservationQuery, ReservationRow, ReservationStatus,
        },
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.book_id, r.reserved_at, r.due_date, r.returned_at, r.status,
           r.created_at, r.updated_at,
           u.name AS user_name, u.email AS user_email,
           b.title AS book_title, b.isbn AS book_isbn, b.available_copies AS book_available_copies,
           a.id AS author_id, a.name AS author_name
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
    JOIN authors a ON a.id = b.author_id
"#;

/// Borrowed, unreturned and past due
const OVERDUE_CONDITION: &str =
    "r.status = 'borrowed' AND r.returned_at IS NULL AND r.due_date < NOW()";

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Get reservation with user, book and author
    pub async fn get_details(&self, id: i32) -> AppResult<ReservationDetails> {
        sqlx::query_as::<_, ReservationRow>(&format!("{} WHERE r.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ReservationDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Search reservations with pagination, newest first
    pub async fn search(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let page = PageQuery { page: query.page, per_page: query.per_page };

        let mut conditions = Vec::new();
        if let Some(status) = query.status {
            conditions.push(match status {
                ReservationStatus::Borrowed => "r.status = 'borrowed'".to_string(),
                ReservationStatus::Returned => "r.status = 'returned'".to_string(),
            });
        }
        if let Some(user_id) = query.user_id {
            conditions.push(format!("r.user_id = {}", user_id));
        }
        if let Some(book_id) = query.book_id {
            conditions.push(format!("r.book_id = {}", book_id));
        }
        if query.overdue == Some(true) {
            conditions.push(OVERDUE_CONDITION.to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM reservations r {}",
            where_clause
        ))
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} {} ORDER BY r.reserved_at DESC, r.id DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT,
            where_clause,
            page.per_page(),
            page.offset()
        ))
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok((
            rows.into_iter()
                .map(|row| ReservationDetails::from_row(row, now))
                .collect(),
            total,
        ))
    }

    /// Every reservation of a user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.list_where("r.user_id = $1", user_id).await
    }

    /// One page of a user's reservations, newest first
    pub async fn page_for_user(
        &self,
        user_id: i32,
        page: &PageQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.page_where("r.user_id = $1", user_id, page).await
    }

    /// One page of a book's reservations, newest first
    pub async fn page_for_book(
        &self,
        book_id: i32,
        page: &PageQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.page_where("r.book_id = $1", book_id, page).await
    }

    async fn page_where(
        &self,
        condition: &str,
        id: i32,
        page: &PageQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM reservations r WHERE {}",
            condition
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} WHERE {} ORDER BY r.reserved_at DESC, r.id DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT,
            condition,
            page.per_page(),
            page.offset()
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok((
            rows.into_iter()
                .map(|row| ReservationDetails::from_row(row, now))
                .collect(),
            total,
        ))
    }

    /// Overdue reservations of a user
    pub async fn list_overdue_for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        self.list_where(&format!("r.user_id = $1 AND {}", OVERDUE_CONDITION), user_id)
            .await
    }

    async fn list_where(&self, condition: &str, id: i32) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} WHERE {} ORDER BY r.reserved_at DESC, r.id DESC",
            DETAILS_SELECT, condition
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| ReservationDetails::from_row(row, now))
            .collect())
    }

    /// All overdue reservations, oldest due date first
    pub async fn list_overdue(&self) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} WHERE {} ORDER BY r.due_date, r.id",
            DETAILS_SELECT, OVERDUE_CONDITION
        ))
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|row| ReservationDetails::from_row(row, now))
            .collect())
    }

    /// Latest reservations, any status
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<ReservationDetails>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{} ORDER BY r.created_at DESC, r.id DESC LIMIT $1",
            DETAILS_SELECT
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReservationDetails::from).collect())
    }

    /// Take one copy off the shelf and record the reservation, atomically.
    ///
    /// Fails with `Unavailable` and changes nothing when no copy is left.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        reserved_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1, updated_at = $2
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .bind(reserved_at)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(AppError::Unavailable(
                "Book is not available for reservation".to_string(),
            ));
        }

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reservations (user_id, book_id, reserved_at, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(reserved_at)
        .bind(due_date)
        .bind(ReservationStatus::Borrowed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(id)
    }

    /// Mark a borrowed reservation returned and put the copy back, atomically.
    ///
    /// Returns `false` when the reservation was not in the borrowed state.
    pub async fn mark_returned(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let book_id = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE reservations SET status = $2, returned_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'borrowed'
            RETURNING book_id
            "#,
        )
        .bind(id)
        .bind(ReservationStatus::Returned)
        .bind(returned_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(book_id) = book_id else {
            return Ok(false);
        };

        let restored = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies + 1, updated_at = $2
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(book_id)
        .bind(returned_at)
        .execute(&mut *tx)
        .await?;

        if restored.rows_affected() == 0 {
            tracing::warn!(
                book_id,
                reservation_id = id,
                "Book already has all copies available, availability left unchanged"
            );
        }

        tx.commit().await?;

        Ok(true)
    }
}
