//! In-process domain event bus

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::{models::reservation::ReservationDetails, services::notifications::NotificationService};

/// Something that happened to a reservation
#[derive(Debug, Clone)]
pub enum DomainEvent {
    BookReserved(ReservationDetails),
    BookReturned(ReservationDetails),
    ReservationOverdue(ReservationDetails),
}

impl DomainEvent {
    pub fn reservation(&self) -> &ReservationDetails {
        match self {
            DomainEvent::BookReserved(r)
            | DomainEvent::BookReturned(r)
            | DomainEvent::ReservationOverdue(r) => r,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookReserved(_) => "book_reserved",
            DomainEvent::BookReturned(_) => "book_returned",
            DomainEvent::ReservationOverdue(_) => "reservation_overdue",
        }
    }
}

/// Publishing side of the event queue
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event; never blocks the caller
    pub fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let reservation_id = event.reservation().id;
        if self.sender.send(event).is_err() {
            tracing::warn!(event = name, reservation_id, "Event listener is gone, event dropped");
        } else {
            tracing::debug!(event = name, reservation_id, "Event published");
        }
    }
}

/// Deliver every queued event as a notification, one at a time
pub async fn run_listener(
    mut events: mpsc::UnboundedReceiver<DomainEvent>,
    notifications: NotificationService,
) {
    tracing::info!("Notification listener started");

    while let Some(event) = events.recv().await {
        let span = tracing::info_span!(
            "notify",
            event = event.name(),
            reservation_id = event.reservation().id
        );

        if let Err(e) = notifications.dispatch(&event).instrument(span).await {
            tracing::error!(event = event.name(), "Failed to deliver notification: {}", e);
        }
    }

    tracing::info!("Notification listener stopped");
}
