//! Pagination helpers shared by every list endpoint

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    author::Author, book::Book, category::CategoryWithCount, notification::Notification,
    reservation::ReservationDetails, user::User,
};

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

/// Page selection from the query string
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size (default 15, max 100)
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE)
    }

    /// Rows to skip; saturates for absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

/// A page of results
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    PaginatedUsers = Paginated<User>,
    PaginatedAuthors = Paginated<Author>,
    PaginatedCategories = Paginated<CategoryWithCount>,
    PaginatedBooks = Paginated<Book>,
    PaginatedReservations = Paginated<ReservationDetails>,
    PaginatedNotifications = Paginated<Notification>
)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        let per_page = query.per_page();
        let last_page = (total.saturating_add(per_page - 1) / per_page).max(1);
        Self {
            items,
            total,
            page: query.page(),
            per_page,
            last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 15);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let query = PageQuery { page: Some(0), per_page: Some(1000) };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PER_PAGE);

        let query = PageQuery { page: Some(3), per_page: Some(-5) };
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query.offset(), 30);
    }

    #[test]
    fn test_last_page() {
        let query = PageQuery { page: Some(1), per_page: Some(10) };
        assert_eq!(Paginated::new(Vec::<i32>::new(), 0, &query).last_page, 1);
        assert_eq!(Paginated::new(Vec::<i32>::new(), 10, &query).last_page, 1);
        assert_eq!(Paginated::new(Vec::<i32>::new(), 11, &query).last_page, 2);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let query = PageQuery { page: Some(i64::MAX), per_page: Some(15) };
        assert_eq!(query.page(), i64::MAX);
        assert_eq!(query.offset(), i64::MAX);
        assert!(query.offset() >= 0);

        let page = Paginated::new(Vec::<i32>::new(), i64::MAX, &query);
        assert!(page.last_page > 0);
    }
}
