//! Data models for Libris

pub mod author;
pub mod book;
pub mod category;
pub mod notification;
pub mod pagination;
pub mod reservation;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use category::Category;
pub use notification::Notification;
pub use pagination::{PageQuery, Paginated};
pub use reservation::{Reservation, ReservationDetails, ReservationStatus};
pub use user::{Permission, Role, User, UserClaims};
