//! Reservation (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::AuthorShort, user::UserShort};

/// Loan period applied to every new reservation
pub const LOAN_PERIOD_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Borrowed,
    Returned,
}

/// Due date of a reservation made at `reserved_at`
pub fn due_date_for(reserved_at: DateTime<Utc>) -> DateTime<Utc> {
    reserved_at + Duration::days(LOAN_PERIOD_DAYS)
}

/// Reservation model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.status, self.returned_at, self.due_date, now)
    }
}

/// Still out and past its due date
pub fn is_overdue(
    status: ReservationStatus,
    returned_at: Option<DateTime<Utc>>,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    status == ReservationStatus::Borrowed && returned_at.is_none() && due_date < now
}

/// Reservation joined with its user, book and author
#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
    pub book_title: String,
    pub book_isbn: String,
    pub book_available_copies: i32,
    pub author_id: i32,
    pub author_name: String,
}

/// Book as embedded in a reservation payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservedBook {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub available_copies: i32,
    pub is_available: bool,
    pub author: AuthorShort,
}

/// Reservation with full details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reserved_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub is_overdue: bool,
    pub user: UserShort,
    pub book: ReservedBook,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationDetails {
    pub fn from_row(row: ReservationRow, now: DateTime<Utc>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            reserved_at: row.reserved_at,
            due_date: row.due_date,
            returned_at: row.returned_at,
            status: row.status,
            is_overdue: is_overdue(row.status, row.returned_at, row.due_date, now),
            user: UserShort {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            book: ReservedBook {
                id: row.book_id,
                title: row.book_title,
                isbn: row.book_isbn,
                available_copies: row.book_available_copies,
                is_available: super::book::is_available(row.book_available_copies),
                author: AuthorShort {
                    id: row.author_id,
                    name: row.author_name,
                },
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Whole days elapsed since the due date, zero when not yet due
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.due_date).num_days().max(0)
    }
}

impl From<ReservationRow> for ReservationDetails {
    fn from(row: ReservationRow) -> Self {
        Self::from_row(row, Utc::now())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only borrowed reservations past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    #[validate(range(min = 1, message = "The user id field is required."))]
    pub user_id: i32,
    #[validate(range(min = 1, message = "The book id field is required."))]
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reservation(status: ReservationStatus, due_in_days: i64) -> Reservation {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let due_date = now + Duration::days(due_in_days);
        Reservation {
            id: 1,
            user_id: 1,
            book_id: 1,
            reserved_at: due_date - Duration::days(LOAN_PERIOD_DAYS),
            due_date,
            returned_at: match status {
                ReservationStatus::Returned => Some(now),
                ReservationStatus::Borrowed => None,
            },
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_due_date_is_fourteen_days_later() {
        let reserved_at = now();
        assert_eq!(
            due_date_for(reserved_at),
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_overdue_when_borrowed_and_past_due() {
        assert!(reservation(ReservationStatus::Borrowed, -1).is_overdue_at(now()));
    }

    #[test]
    fn test_not_overdue_before_due_date() {
        assert!(!reservation(ReservationStatus::Borrowed, 3).is_overdue_at(now()));
    }

    #[test]
    fn test_returned_is_never_overdue() {
        assert!(!reservation(ReservationStatus::Returned, -10).is_overdue_at(now()));
    }

    #[test]
    fn test_days_overdue() {
        let row = ReservationRow {
            id: 1,
            user_id: 2,
            book_id: 3,
            reserved_at: now() - Duration::days(20),
            due_date: now() - Duration::days(6),
            returned_at: None,
            status: ReservationStatus::Borrowed,
            created_at: now(),
            updated_at: now(),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            book_title: "Dune".to_string(),
            book_isbn: "9780441013593".to_string(),
            book_available_copies: 0,
            author_id: 4,
            author_name: "Frank Herbert".to_string(),
        };
        let details = ReservationDetails::from_row(row, now());

        assert!(details.is_overdue);
        assert!(!details.book.is_available);
        assert_eq!(details.days_overdue_at(now()), 6);
        assert_eq!(details.days_overdue_at(now() - Duration::days(30)), 0);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Borrowed).unwrap(),
            "\"borrowed\""
        );
    }
}
