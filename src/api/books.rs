//! Book catalog endpoints

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::{PageQuery, Paginated},
        user::Permission,
    },
};

use super::{ApiResponse, AuthenticatedUser, SearchQuery, ValidatedJson};

/// List books with optional filters
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Books page", body = crate::models::pagination::PaginatedBooks),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<ApiResponse<Paginated<Book>>> {
    claims.require(Permission::ViewBooks)?;

    let books = state.services.books.search(&query).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

/// Search by title, ISBN or author name
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    security(("bearer_auth" = [])),
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = crate::models::pagination::PaginatedBooks),
        (status = 400, description = "Missing query", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Paginated<Book>>> {
    claims.require(Permission::ViewBooks)?;

    let filter = BookQuery {
        search: Some(query.term()?),
        page: query.page,
        per_page: query.per_page,
        ..Default::default()
    };
    let books = state.services.books.search(&filter).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

/// Books with at least one copy on the shelf
#[utoipa::path(
    get,
    path = "/books/available",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Available books", body = crate::models::pagination::PaginatedBooks)
    )
)]
pub async fn available_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<Book>>> {
    claims.require(Permission::ViewBooks)?;

    let filter = BookQuery {
        available: Some(true),
        page: page.page,
        per_page: page.per_page,
        ..Default::default()
    };
    let books = state.services.books.search(&filter).await?;
    Ok(ApiResponse::ok("Available books retrieved successfully", books))
}

#[utoipa::path(
    get,
    path = "/books/category/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Category ID"), PageQuery),
    responses(
        (status = 200, description = "Books in the category", body = crate::models::pagination::PaginatedBooks),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn books_by_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<Book>>> {
    claims.require(Permission::ViewBooks)?;

    let books = state.services.books.by_category(id, page).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

#[utoipa::path(
    get,
    path = "/books/author/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID"), PageQuery),
    responses(
        (status = 200, description = "Books by the author", body = crate::models::pagination::PaginatedBooks),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn books_by_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<Book>>> {
    claims.require(Permission::ViewBooks)?;

    let books = state.services.books.by_author(id, page).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<Book>> {
    claims.require(Permission::ViewBooks)?;

    let book = state.services.books.get_by_id(id).await?;
    Ok(ApiResponse::ok("Book retrieved successfully", book))
}

#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateBook>,
) -> AppResult<ApiResponse<Book>> {
    claims.require(Permission::CreateBooks)?;

    let book = state.services.books.create(request).await?;
    Ok(ApiResponse::created("Book created successfully", book))
}

#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateBook>,
) -> AppResult<ApiResponse<Book>> {
    claims.require(Permission::EditBooks)?;

    let book = state.services.books.update(id, request).await?;
    Ok(ApiResponse::ok("Book updated successfully", book))
}

#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 400, description = "Book has reservations", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<()>> {
    claims.require(Permission::DeleteBooks)?;

    state.services.books.delete(id).await?;
    Ok(ApiResponse::message("Book deleted successfully"))
}
