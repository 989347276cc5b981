//! Reservation endpoints

use axum::extract::{Path, Query, State};

use crate::{
    error::AppResult,
    models::{
        pagination::{PageQuery, Paginated},
        reservation::{CreateReservation, ReservationDetails, ReservationQuery},
        user::Permission,
    },
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// List reservations, newest first
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations page", body = crate::models::pagination::PaginatedReservations)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<ApiResponse<Paginated<ReservationDetails>>> {
    claims.require(Permission::ViewReservations)?;

    let reservations = state.services.reservations.search(&query).await?;
    Ok(ApiResponse::ok("Reservations retrieved successfully", reservations))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ReservationDetails),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<ReservationDetails>> {
    claims.require(Permission::ViewReservations)?;

    let reservation = state.services.reservations.get_by_id(id).await?;
    Ok(ApiResponse::ok("Reservation retrieved successfully", reservation))
}

/// Borrow a book for 14 days
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Book reserved", body = ReservationDetails),
        (status = 400, description = "Book is not available", body = crate::error::ErrorResponse),
        (status = 404, description = "User or book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateReservation>,
) -> AppResult<ApiResponse<ReservationDetails>> {
    claims.require(Permission::CreateReservations)?;

    let reservation = state.services.reservations.create(request).await?;
    Ok(ApiResponse::created("Book reserved successfully", reservation))
}

#[utoipa::path(
    patch,
    path = "/reservations/{id}/return",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Book returned", body = ReservationDetails),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<ReservationDetails>> {
    claims.require(Permission::EditReservations)?;

    let reservation = state.services.reservations.return_book(id).await?;
    Ok(ApiResponse::ok("Book returned successfully", reservation))
}

#[utoipa::path(
    get,
    path = "/reservations/user/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID"), PageQuery),
    responses(
        (status = 200, description = "Reservations of the user", body = crate::models::pagination::PaginatedReservations),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<ReservationDetails>>> {
    claims.require(Permission::ViewReservations)?;

    let reservations = state.services.reservations.for_user(id, page).await?;
    Ok(ApiResponse::ok("User reservations retrieved successfully", reservations))
}

#[utoipa::path(
    get,
    path = "/reservations/book/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID"), PageQuery),
    responses(
        (status = 200, description = "Reservations of the book", body = crate::models::pagination::PaginatedReservations),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn book_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<ReservationDetails>>> {
    claims.require(Permission::ViewReservations)?;

    let reservations = state.services.reservations.for_book(id, page).await?;
    Ok(ApiResponse::ok("Book reservations retrieved successfully", reservations))
}
