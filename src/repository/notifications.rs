//! Notifications repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{Notification, NotificationData},
        pagination::PageQuery,
    },
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i32, data: &NotificationData) -> AppResult<Notification> {
        let payload = serde_json::to_value(data)
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {}", e)))?;

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, kind, data)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(data.kind)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Notifications of a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: &PageQuery,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((notifications, total))
    }

    /// Mark a notification read; already-read notifications keep their timestamp
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, $3)
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))
    }
}
