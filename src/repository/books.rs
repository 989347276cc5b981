//! Books repository for database operations

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{merge_copies, Book, BookQuery, BookRow},
        category::CategoryShort,
        pagination::PageQuery,
    },
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, b.published_year, b.description, b.cover_image,
           b.total_copies, b.available_copies, b.author_id, a.name AS author_name,
           b.created_at, b.updated_at
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

/// Column values written on insert and update
pub struct BookFields<'a> {
    pub title: &'a str,
    pub isbn: &'a str,
    pub published_year: i32,
    pub description: Option<&'a str>,
    pub cover_image: Option<&'a str>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub author_id: i32,
}

/// Partial update; `None` keeps the stored value
pub struct BookChanges<'a> {
    pub title: Option<&'a str>,
    pub isbn: Option<&'a str>,
    pub published_year: Option<i32>,
    pub description: Option<&'a str>,
    pub cover_image: Option<&'a str>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
    pub author_id: Option<i32>,
}

#[derive(FromRow)]
struct BookCategoryRow {
    book_id: i32,
    id: i32,
    name: String,
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_row(&self, id: i32) -> AppResult<BookRow> {
        sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ID, with author and categories
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let row = self.get_row(id).await?;
        let mut books = self.with_categories(vec![row]).await?;
        books
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = PageQuery { page: query.page, per_page: query.per_page };

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(super::contains_pattern(search));
            let idx = params.len();
            conditions.push(format!(
                r"(LOWER(b.title) LIKE ${idx} ESCAPE '\' OR LOWER(b.isbn) LIKE ${idx} ESCAPE '\' OR LOWER(a.name) LIKE ${idx} ESCAPE '\')"
            ));
        }

        if let Some(author_id) = query.author_id {
            conditions.push(format!("b.author_id = {}", author_id));
        }

        if let Some(category_id) = query.category_id {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_category bc WHERE bc.book_id = b.id AND bc.category_id = {})",
                category_id
            ));
        }

        if query.available == Some(true) {
            conditions.push("b.available_copies > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            "SELECT COUNT(*) FROM books b JOIN authors a ON a.id = b.author_id {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY b.title, b.id LIMIT {} OFFSET {}",
            BOOK_SELECT,
            where_clause,
            page.per_page(),
            page.offset()
        );
        let mut select_builder = sqlx::query_as::<_, BookRow>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        Ok((self.with_categories(rows).await?, total))
    }

    /// Every book written by an author, by title
    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{} WHERE b.author_id = $1 ORDER BY b.title, b.id",
            BOOK_SELECT
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_categories(rows).await
    }

    /// Attach categories to book rows with a single query
    async fn with_categories(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, BookCategoryRow>(
            r#"
            SELECT bc.book_id, c.id, c.name
            FROM book_category bc
            JOIN categories c ON c.id = bc.category_id
            WHERE bc.book_id = ANY($1)
            ORDER BY c.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_book: HashMap<i32, Vec<CategoryShort>> = HashMap::new();
        for link in links {
            by_book
                .entry(link.book_id)
                .or_default()
                .push(CategoryShort { id: link.id, name: link.name });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = by_book.remove(&row.id).unwrap_or_default();
                Book::from_row(row, categories)
            })
            .collect())
    }

    /// Create a book and attach its categories
    pub async fn create(&self, book: &BookFields<'_>, category_ids: &[i32]) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (
                title, isbn, published_year, description, cover_image,
                total_copies, available_copies, author_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(book.title)
        .bind(book.isbn)
        .bind(book.published_year)
        .bind(book.description)
        .bind(book.cover_image)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.author_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::sync_categories(&mut tx, id, category_ids).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Apply `changes` to a book; categories are replaced only when given.
    ///
    /// The copy counts are merged under a row lock so a concurrent
    /// reservation or return cannot be overwritten with a stale value.
    pub async fn update(
        &self,
        id: i32,
        changes: &BookChanges<'_>,
        category_ids: Option<&[i32]>,
    ) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let (stored_total, stored_available) = sqlx::query_as::<_, (i32, i32)>(
            "SELECT total_copies, available_copies FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let (total_copies, available_copies) = merge_copies(
            (stored_total, stored_available),
            changes.total_copies,
            changes.available_copies,
        )?;

        sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                isbn = COALESCE($3, isbn),
                published_year = COALESCE($4, published_year),
                description = COALESCE($5, description),
                cover_image = COALESCE($6, cover_image),
                total_copies = $7,
                available_copies = $8,
                author_id = COALESCE($9, author_id),
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.isbn)
        .bind(changes.published_year)
        .bind(changes.description)
        .bind(changes.cover_image)
        .bind(total_copies)
        .bind(available_copies)
        .bind(changes.author_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if let Some(category_ids) = category_ids {
            sqlx::query("DELETE FROM book_category WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::sync_categories(&mut tx, id, category_ids).await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn sync_categories(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        book_id: i32,
        category_ids: &[i32],
    ) -> AppResult<()> {
        if category_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO book_category (book_id, category_id)
            SELECT $1, UNNEST($2::INT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(category_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn has_reservations(&self, id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reservations WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
