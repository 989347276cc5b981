//! Author endpoints

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        pagination::Paginated,
        user::Permission,
    },
};

use super::{ApiResponse, AuthenticatedUser, SearchQuery, ValidatedJson};

#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(AuthorQuery),
    responses(
        (status = 200, description = "Authors page", body = crate::models::pagination::PaginatedAuthors)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AuthorQuery>,
) -> AppResult<ApiResponse<Paginated<Author>>> {
    claims.require(Permission::ViewAuthors)?;

    let authors = state.services.authors.search(&query).await?;
    Ok(ApiResponse::ok("Authors retrieved successfully", authors))
}

/// Search authors by name
#[utoipa::path(
    get,
    path = "/authors/search",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching authors", body = crate::models::pagination::PaginatedAuthors),
        (status = 400, description = "Missing query", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_authors(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Paginated<Author>>> {
    claims.require(Permission::ViewAuthors)?;

    let authors = state
        .services
        .authors
        .search(&AuthorQuery {
            search: Some(query.term()?),
            page: query.page,
            per_page: query.per_page,
        })
        .await?;
    Ok(ApiResponse::ok("Authors retrieved successfully", authors))
}

/// Get an author with their books
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Author>> {
    claims.require(Permission::ViewAuthors)?;

    let author = state.services.authors.get_by_id(id).await?;
    Ok(ApiResponse::ok("Author retrieved successfully", author))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateAuthor>,
) -> AppResult<ApiResponse<Author>> {
    claims.require(Permission::CreateAuthors)?;

    let author = state.services.authors.create(request).await?;
    Ok(ApiResponse::created("Author created successfully", author))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = UpdateAuthor,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateAuthor>,
) -> AppResult<ApiResponse<Author>> {
    claims.require(Permission::EditAuthors)?;

    let author = state.services.authors.update(id, request).await?;
    Ok(ApiResponse::ok("Author updated successfully", author))
}

#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author deleted"),
        (status = 400, description = "Author still has books", body = crate::error::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    claims.require(Permission::DeleteAuthors)?;

    state.services.authors.delete(id).await?;
    Ok(ApiResponse::message("Author deleted successfully"))
}
