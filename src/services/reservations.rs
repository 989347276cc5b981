//! Reservation (borrow/return) service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::{PageQuery, Paginated},
        reservation::{
            due_date_for, CreateReservation, ReservationDetails, ReservationQuery,
            ReservationStatus,
        },
    },
    repository::Repository,
    services::{
        events::{DomainEvent, EventBus},
        overdue::OverdueScheduler,
    },
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    events: EventBus,
    overdue: OverdueScheduler,
}

impl ReservationsService {
    pub fn new(repository: Repository, events: EventBus, overdue: OverdueScheduler) -> Self {
        Self { repository, events, overdue }
    }

    pub async fn search(&self, query: &ReservationQuery) -> AppResult<Paginated<ReservationDetails>> {
        let (reservations, total) = self.repository.reservations.search(query).await?;
        let page = PageQuery { page: query.page, per_page: query.per_page };
        Ok(Paginated::new(reservations, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<ReservationDetails> {
        self.repository.reservations.get_details(id).await
    }

    /// Reservations of a user, newest first; 404 when the user does not exist
    pub async fn for_user(
        &self,
        user_id: i32,
        page: PageQuery,
    ) -> AppResult<Paginated<ReservationDetails>> {
        if !self.repository.users.exists(user_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        let (reservations, total) = self
            .repository
            .reservations
            .page_for_user(user_id, &page)
            .await?;
        Ok(Paginated::new(reservations, total, &page))
    }

    /// Reservations of a book, newest first; 404 when the book does not exist
    pub async fn for_book(
        &self,
        book_id: i32,
        page: PageQuery,
    ) -> AppResult<Paginated<ReservationDetails>> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        let (reservations, total) = self
            .repository
            .reservations
            .page_for_book(book_id, &page)
            .await?;
        Ok(Paginated::new(reservations, total, &page))
    }

    /// Borrow a copy of a book for `LOAN_PERIOD_DAYS`
    pub async fn create(&self, request: CreateReservation) -> AppResult<ReservationDetails> {
        if !self.repository.users.exists(request.user_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", request.user_id)));
        }
        let book = self.repository.books.get_row(request.book_id).await?;
        if !crate::models::book::is_available(book.available_copies) {
            return Err(AppError::Unavailable(
                "Book is not available for reservation".to_string(),
            ));
        }

        let reserved_at = Utc::now();
        let id = self
            .repository
            .reservations
            .create(request.user_id, request.book_id, reserved_at, due_date_for(reserved_at))
            .await?;

        let reservation = self.repository.reservations.get_details(id).await?;

        tracing::info!(
            reservation_id = id,
            user_id = request.user_id,
            book_id = request.book_id,
            "Book reserved"
        );
        self.events.publish(DomainEvent::BookReserved(reservation.clone()));

        Ok(reservation)
    }

    /// Return a borrowed book and schedule an overdue sweep
    pub async fn return_book(&self, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        if reservation.status == ReservationStatus::Returned {
            return Err(AppError::BusinessRule("Book has already been returned".to_string()));
        }

        if !self.repository.reservations.mark_returned(id, Utc::now()).await? {
            // Lost a race with a concurrent return
            return Err(AppError::BusinessRule("Book has already been returned".to_string()));
        }

        let reservation = self.repository.reservations.get_details(id).await?;

        tracing::info!(
            reservation_id = id,
            book_id = reservation.book_id,
            "Book returned"
        );
        self.events.publish(DomainEvent::BookReturned(reservation.clone()));
        self.overdue.trigger_now();

        Ok(reservation)
    }
}
