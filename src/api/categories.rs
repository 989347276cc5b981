//! Category endpoints

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        category::{CategoryQuery, CategoryWithCount, CreateCategory, UpdateCategory},
        pagination::Paginated,
        user::Permission,
    },
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(CategoryQuery),
    responses(
        (status = 200, description = "Categories page with book counts", body = crate::models::pagination::PaginatedCategories)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<CategoryQuery>,
) -> AppResult<ApiResponse<Paginated<CategoryWithCount>>> {
    claims.require(Permission::ViewCategories)?;

    let categories = state.services.categories.search(&query).await?;
    Ok(ApiResponse::ok("Categories retrieved successfully", categories))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category details", body = CategoryWithCount),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<CategoryWithCount>> {
    claims.require(Permission::ViewCategories)?;

    let category = state.services.categories.get_by_id(id).await?;
    Ok(ApiResponse::ok("Category retrieved successfully", category))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = CategoryWithCount),
        (status = 422, description = "Name taken or invalid", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateCategory>,
) -> AppResult<ApiResponse<CategoryWithCount>> {
    claims.require(Permission::CreateCategories)?;

    let category = state.services.categories.create(request).await?;
    Ok(ApiResponse::created("Category created successfully", category))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategory,
    responses(
        (status = 200, description = "Category updated", body = CategoryWithCount),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Name taken or invalid", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateCategory>,
) -> AppResult<ApiResponse<CategoryWithCount>> {
    claims.require(Permission::EditCategories)?;

    let category = state.services.categories.update(id, request).await?;
    Ok(ApiResponse::ok("Category updated successfully", category))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted, books detached"),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    claims.require(Permission::DeleteCategories)?;

    state.services.categories.delete(id).await?;
    Ok(ApiResponse::message("Category deleted successfully"))
}
