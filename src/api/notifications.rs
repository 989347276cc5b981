//! In-app notifications of the current user

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        notification::Notification,
        pagination::{PageQuery, Paginated},
    },
};

use super::{ApiResponse, AuthenticatedUser};

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = crate::models::pagination::PaginatedNotifications)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<Notification>>> {
    let notifications = state
        .services
        .notifications
        .list_for_user(claims.user_id, &page)
        .await?;
    Ok(ApiResponse::ok("Notifications retrieved successfully", notifications))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Notification>> {
    let notification = state
        .services
        .notifications
        .mark_read(id, claims.user_id)
        .await?;
    Ok(ApiResponse::ok("Notification marked as read", notification))
}
