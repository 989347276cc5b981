//! User management endpoints

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        pagination::Paginated,
        user::{CreateUser, Permission, UpdateUser, User, UserQuery, UserWithOverdue},
    },
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// List users with search and pagination
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Users page", body = crate::models::pagination::PaginatedUsers),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<ApiResponse<Paginated<User>>> {
    claims.require(Permission::ViewUsers)?;

    let users = state.services.users.search(&query).await?;
    Ok(ApiResponse::ok("Users retrieved successfully", users))
}

/// Get user details with reservations
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<User>> {
    claims.require(Permission::ViewUsers)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateUser>,
) -> AppResult<ApiResponse<User>> {
    claims.require(Permission::CreateUsers)?;

    let user = state.services.users.create_user(request).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateUser>,
) -> AppResult<ApiResponse<User>> {
    claims.require(Permission::EditUsers)?;

    let user = state.services.users.update_user(id, request).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "User has reservations", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    claims.require(Permission::DeleteUsers)?;

    state.services.users.delete_user(id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

/// Users holding overdue books
#[utoipa::path(
    get,
    path = "/users/overdue/books",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users with their overdue reservations", body = Vec<UserWithOverdue>)
    )
)]
pub async fn overdue_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<Vec<UserWithOverdue>>> {
    claims.require(Permission::ViewUsers)?;

    let users = state.services.users.overdue_users().await?;
    Ok(ApiResponse::ok("Users with overdue books retrieved successfully", users))
}
