//! Reservation notifications: in-app records plus e-mail

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        notification::{Notification, NotificationData, NotificationKind},
        pagination::{PageQuery, Paginated},
        reservation::ReservationDetails,
    },
    repository::Repository,
    services::{email::Mailer, events::DomainEvent},
};

/// Rendered notification for one event
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub user_id: i32,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub data: NotificationData,
}

impl NotificationMessage {
    pub fn for_event(event: &DomainEvent, now: DateTime<Utc>) -> Self {
        let reservation = event.reservation();
        match event {
            DomainEvent::BookReserved(_) => Self::render(
                reservation,
                NotificationKind::BookReserved,
                "Book Reservation Confirmation",
                "Your book reservation has been confirmed.",
                vec![
                    format!("Due Date: {}", reservation.due_date.format("%Y-%m-%d")),
                    "Please return the book by the due date to avoid late fees.".to_string(),
                    "Thank you for using our library!".to_string(),
                ],
                None,
            ),
            DomainEvent::BookReturned(_) => {
                let returned_at = reservation.returned_at.unwrap_or(now);
                Self::render(
                    reservation,
                    NotificationKind::BookReturned,
                    "Book Return Confirmation",
                    "Your book return has been confirmed.",
                    vec![
                        format!("Returned on: {}", returned_at.format("%Y-%m-%d %H:%M:%S")),
                        "Thank you for using our library!".to_string(),
                    ],
                    None,
                )
            }
            DomainEvent::ReservationOverdue(_) => {
                let days_overdue = reservation.days_overdue_at(now);
                Self::render(
                    reservation,
                    NotificationKind::BookOverdue,
                    "Overdue Book Notice",
                    "You have an overdue book that needs to be returned.",
                    vec![
                        format!("Due Date: {}", reservation.due_date.format("%Y-%m-%d")),
                        format!("Days Overdue: {}", days_overdue),
                        "Please return the book as soon as possible to avoid additional late fees."
                            .to_string(),
                    ],
                    Some(days_overdue),
                )
            }
        }
    }

    fn render(
        reservation: &ReservationDetails,
        kind: NotificationKind,
        subject: &str,
        message: &str,
        details: Vec<String>,
        days_overdue: Option<i64>,
    ) -> Self {
        let mut lines = vec![
            format!("Hello {}!", reservation.user.name),
            String::new(),
            message.to_string(),
            format!("Book: {}", reservation.book.title),
            format!("Author: {}", reservation.book.author.name),
        ];
        lines.extend(details);

        Self {
            user_id: reservation.user_id,
            to: reservation.user.email.clone(),
            subject: subject.to_string(),
            body: lines.join("\n"),
            data: NotificationData {
                kind,
                reservation_id: reservation.id,
                book_title: reservation.book.title.clone(),
                due_date: reservation.due_date,
                returned_at: reservation.returned_at,
                days_overdue,
                message: message.to_string(),
            },
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(repository: Repository, mailer: Arc<dyn Mailer>) -> Self {
        Self { repository, mailer }
    }

    /// Record the notification for the user, then mail it.
    ///
    /// A mail failure is logged and does not undo the in-app record.
    pub async fn dispatch(&self, event: &DomainEvent) -> AppResult<()> {
        let message = NotificationMessage::for_event(event, Utc::now());

        self.repository
            .notifications
            .create(message.user_id, &message.data)
            .await?;

        if let Err(e) = self
            .mailer
            .send(&message.to, &message.subject, &message.body)
            .await
        {
            tracing::warn!(user_id = message.user_id, "Failed to mail notification: {}", e);
        }

        tracing::info!(
            user_id = message.user_id,
            kind = message.data.kind.as_str(),
            "Notification delivered"
        );

        Ok(())
    }

    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: &PageQuery,
    ) -> AppResult<Paginated<Notification>> {
        let (items, total) = self
            .repository
            .notifications
            .list_for_user(user_id, page)
            .await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        self.repository.notifications.mark_read(id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        author::AuthorShort,
        reservation::{ReservationStatus, ReservedBook},
        user::UserShort,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap()
    }

    fn reservation(due_date: DateTime<Utc>, returned_at: Option<DateTime<Utc>>) -> ReservationDetails {
        ReservationDetails {
            id: 42,
            user_id: 3,
            book_id: 9,
            reserved_at: due_date - Duration::days(14),
            due_date,
            returned_at,
            status: if returned_at.is_some() {
                ReservationStatus::Returned
            } else {
                ReservationStatus::Borrowed
            },
            is_overdue: false,
            user: UserShort {
                id: 3,
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
            },
            book: ReservedBook {
                id: 9,
                title: "The Left Hand of Darkness".to_string(),
                isbn: "9780441478125".to_string(),
                available_copies: 1,
                is_available: true,
                author: AuthorShort {
                    id: 5,
                    name: "Ursula K. Le Guin".to_string(),
                },
            },
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_reserved_message() {
        let event = DomainEvent::BookReserved(reservation(now() + Duration::days(14), None));
        let message = NotificationMessage::for_event(&event, now());

        assert_eq!(message.to, "grace@example.com");
        assert_eq!(message.subject, "Book Reservation Confirmation");
        assert!(message.body.contains("Book: The Left Hand of Darkness"));
        assert!(message.body.contains("Author: Ursula K. Le Guin"));
        assert!(message.body.contains("Due Date: 2024-06-03"));
        assert_eq!(message.data.kind, NotificationKind::BookReserved);
        assert_eq!(message.data.reservation_id, 42);
        assert_eq!(message.data.days_overdue, None);
    }

    #[test]
    fn test_returned_message() {
        let event = DomainEvent::BookReturned(reservation(now(), Some(now())));
        let message = NotificationMessage::for_event(&event, now());

        assert_eq!(message.data.kind, NotificationKind::BookReturned);
        assert_eq!(message.data.returned_at, Some(now()));
        assert!(message.body.contains("Returned on: 2024-05-20 09:30:00"));
    }

    #[test]
    fn test_overdue_message_counts_days() {
        let event = DomainEvent::ReservationOverdue(reservation(now() - Duration::days(4), None));
        let message = NotificationMessage::for_event(&event, now());

        assert_eq!(message.subject, "Overdue Book Notice");
        assert_eq!(message.data.days_overdue, Some(4));
        assert!(message.body.contains("Days Overdue: 4"));

        let data = serde_json::to_value(&message.data).unwrap();
        assert_eq!(data["type"], "book_overdue");
        assert_eq!(data["days_overdue"], 4);
        assert_eq!(
            data["message"],
            "You have an overdue book that needs to be returned."
        );
    }
}
