//! Authors repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        pagination::PageQuery,
    },
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// List authors with pagination, optionally filtered by name
    pub async fn search(&self, query: &AuthorQuery) -> AppResult<(Vec<Author>, i64)> {
        let page = PageQuery { page: query.page, per_page: query.per_page };
        let pattern = query
            .search
            .as_ref()
            .map(|s| super::contains_pattern(s));

        let where_clause = if pattern.is_some() {
            r"WHERE LOWER(a.name) LIKE $1 ESCAPE '\'"
        } else {
            ""
        };

        let count_query = format!("SELECT COUNT(*) FROM authors a {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref pattern) = pattern {
            count_builder = count_builder.bind(pattern);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT a.* FROM authors a
            {}
            ORDER BY a.name, a.id
            LIMIT {} OFFSET {}
            "#,
            where_clause,
            page.per_page(),
            page.offset()
        );
        let mut select_builder = sqlx::query_as::<_, Author>(&select_query);
        if let Some(ref pattern) = pattern {
            select_builder = select_builder.bind(pattern);
        }
        let mut authors = select_builder.fetch_all(&self.pool).await?;

        let ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
        let counts: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT author_id, COUNT(*) FROM books WHERE author_id = ANY($1) GROUP BY author_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for author in &mut authors {
            let count = counts
                .iter()
                .find(|(id, _)| *id == author.id)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            author.books_count = Some(count);
        }

        Ok((authors, total))
    }

    pub async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let created = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, biography, birth_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&author.name)
        .bind(&author.biography)
        .bind(author.birth_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors SET
                name = COALESCE($2, name),
                biography = COALESCE($3, biography),
                birth_date = COALESCE($4, birth_date),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&author.name)
        .bind(&author.biography)
        .bind(author.birth_date)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn has_books(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE author_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }

        Ok(())
    }
}
