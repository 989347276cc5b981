//! Book model and related types

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::{author::AuthorShort, category::CategoryShort};
use crate::error::{AppError, AppResult};

pub const MIN_PUBLISHED_YEAR: i32 = 1000;

/// Book row as stored, joined with its author's name
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub published_year: i32,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub author_id: i32,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book with author, categories and availability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub published_year: i32,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub author_id: i32,
    pub is_available: bool,
    pub author: AuthorShort,
    pub categories: Vec<CategoryShort>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn from_row(row: BookRow, categories: Vec<CategoryShort>) -> Self {
        let is_available = is_available(row.available_copies);
        Self {
            id: row.id,
            title: row.title,
            isbn: row.isbn,
            published_year: row.published_year,
            description: row.description,
            cover_image: row.cover_image,
            total_copies: row.total_copies,
            available_copies: row.available_copies,
            author_id: row.author_id,
            is_available,
            author: AuthorShort {
                id: row.author_id,
                name: row.author_name,
            },
            categories,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A book can be reserved while at least one copy is on the shelf
pub fn is_available(available_copies: i32) -> bool {
    available_copies > 0
}

/// Checks `0 <= available <= total`
pub fn check_copies(total_copies: i32, available_copies: i32) -> Result<(), ValidationError> {
    if total_copies < 0 {
        let mut err = ValidationError::new("total_copies");
        err.message = Some("The total copies must be at least 0.".into());
        return Err(err);
    }
    if available_copies < 0 || available_copies > total_copies {
        let mut err = ValidationError::new("available_copies");
        err.message =
            Some("The available copies must be between 0 and the total copies.".into());
        return Err(err);
    }
    Ok(())
}

/// Resulting `(total, available)` after a partial update, checked against the invariant
pub fn merge_copies(
    existing: (i32, i32),
    total_copies: Option<i32>,
    available_copies: Option<i32>,
) -> AppResult<(i32, i32)> {
    let total = total_copies.unwrap_or(existing.0);
    let available = available_copies.unwrap_or(existing.1);

    check_copies(total, available).map_err(|e| {
        let message = e
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "Invalid copy counts.".to_string());
        AppError::field(&e.code, message)
    })?;

    Ok((total, available))
}

fn validate_published_year(year: i32) -> Result<(), ValidationError> {
    let max = Utc::now().year() + 1;
    if (MIN_PUBLISHED_YEAR..=max).contains(&year) {
        Ok(())
    } else {
        let mut err = ValidationError::new("published_year");
        err.message = Some(
            format!("The published year must be between {} and {}.", MIN_PUBLISHED_YEAR, max)
                .into(),
        );
        Err(err)
    }
}

fn validate_create_copies(book: &CreateBook) -> Result<(), ValidationError> {
    check_copies(book.total_copies, book.available_copies)
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Title, ISBN or author name contains
    pub search: Option<String>,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Only books with at least one copy available
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_copies", skip_on_field_errors = false))]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "The title field is required."))]
    pub title: String,
    #[validate(length(min = 1, max = 20, message = "The isbn must be between 1 and 20 characters."))]
    pub isbn: String,
    #[validate(custom(function = "validate_published_year"))]
    pub published_year: i32,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0, message = "The total copies must be at least 0."))]
    pub total_copies: i32,
    #[validate(range(min = 0, message = "The available copies must be at least 0."))]
    pub available_copies: i32,
    pub author_id: i32,
    pub category_ids: Option<Vec<i32>>,
}

/// Partial update; the merged copy counts are checked by the service
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "The title field is required."))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20, message = "The isbn must be between 1 and 20 characters."))]
    pub isbn: Option<String>,
    #[validate(custom(function = "validate_published_year"))]
    pub published_year: Option<i32>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub cover_image: Option<String>,
    #[validate(range(min = 0, message = "The total copies must be at least 0."))]
    pub total_copies: Option<i32>,
    #[validate(range(min = 0, message = "The available copies must be at least 0."))]
    pub available_copies: Option<i32>,
    pub author_id: Option<i32>,
    /// Replaces the whole category set when present
    pub category_ids: Option<Vec<i32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_book() -> CreateBook {
        CreateBook {
            title: "Dune".to_string(),
            isbn: "9780441013593".to_string(),
            published_year: 1965,
            description: None,
            cover_image: None,
            total_copies: 3,
            available_copies: 3,
            author_id: 1,
            category_ids: Some(vec![1, 2]),
        }
    }

    #[test]
    fn test_is_available() {
        assert!(is_available(1));
        assert!(!is_available(0));
    }

    #[test]
    fn test_check_copies() {
        assert!(check_copies(3, 0).is_ok());
        assert!(check_copies(3, 3).is_ok());
        assert!(check_copies(0, 0).is_ok());
        assert!(check_copies(3, 4).is_err());
        assert!(check_copies(3, -1).is_err());
        assert!(check_copies(-1, 0).is_err());
    }

    #[test]
    fn test_create_book_valid() {
        assert!(create_book().validate().is_ok());
    }

    #[test]
    fn test_create_book_rejects_bad_fields() {
        let book = CreateBook {
            title: String::new(),
            isbn: "x".repeat(21),
            published_year: 999,
            available_copies: 5,
            ..create_book()
        };
        let err: crate::error::AppError = book.validate().unwrap_err().into();
        match err {
            crate::error::AppError::Validation(fields) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("isbn"));
                assert!(fields.contains_key("published_year"));
                assert!(fields.contains_key("available_copies"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_published_year_upper_bound() {
        let next_year = Utc::now().year() + 1;
        assert!(validate_published_year(next_year).is_ok());
        assert!(validate_published_year(next_year + 1).is_err());
    }

    #[test]
    fn test_update_book_partial() {
        let update = UpdateBook {
            title: Some("Dune Messiah".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateBook {
            total_copies: Some(-1),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_merge_keeps_existing_values() {
        assert_eq!(merge_copies((5, 2), None, None).unwrap(), (5, 2));
        assert_eq!(merge_copies((5, 2), Some(8), None).unwrap(), (8, 2));
        assert_eq!(merge_copies((5, 2), None, Some(5)).unwrap(), (5, 5));
    }

    #[test]
    fn test_merge_rejects_total_below_available() {
        match merge_copies((5, 4), Some(3), None) {
            Err(AppError::Validation(fields)) => assert!(fields.contains_key("available_copies")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_available_above_total() {
        assert!(merge_copies((2, 0), None, Some(3)).is_err());
    }
}
