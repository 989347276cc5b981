//! Categories repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{CategoryQuery, CategoryWithCount, CreateCategory, UpdateCategory},
        pagination::PageQuery,
    },
};

const WITH_COUNT: &str = r#"
    SELECT c.id, c.name, c.description, c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM book_category bc WHERE bc.category_id = c.id) AS books_count
    FROM categories c
"#;

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CategoryWithCount> {
        sqlx::query_as::<_, CategoryWithCount>(&format!("{} WHERE c.id = $1", WITH_COUNT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Case-insensitive name uniqueness check
    pub async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE LOWER(name) = LOWER($1) AND ($2::INT IS NULL OR id != $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Ids from `ids` that match no category
    pub async fn missing_ids(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        let missing: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT wanted FROM UNNEST($1::INT[]) AS wanted
            WHERE NOT EXISTS (SELECT 1 FROM categories c WHERE c.id = wanted)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(missing)
    }

    pub async fn search(&self, query: &CategoryQuery) -> AppResult<(Vec<CategoryWithCount>, i64)> {
        let page = PageQuery { page: query.page, per_page: query.per_page };
        let pattern = query
            .search
            .as_ref()
            .map(|s| super::contains_pattern(s));
        let where_clause = if pattern.is_some() {
            r"WHERE LOWER(c.name) LIKE $1 ESCAPE '\'"
        } else {
            ""
        };

        let count_query = format!("SELECT COUNT(*) FROM categories c {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref pattern) = pattern {
            count_builder = count_builder.bind(pattern);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY c.name, c.id LIMIT {} OFFSET {}",
            WITH_COUNT,
            where_clause,
            page.per_page(),
            page.offset()
        );
        let mut select_builder = sqlx::query_as::<_, CategoryWithCount>(&select_query);
        if let Some(ref pattern) = pattern {
            select_builder = select_builder.bind(pattern);
        }
        let categories = select_builder.fetch_all(&self.pool).await?;

        Ok((categories, total))
    }

    /// Every category with its book count, largest first
    pub async fn list_with_counts(&self) -> AppResult<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(&format!(
            "{} ORDER BY books_count DESC, c.name",
            WITH_COUNT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn create(&self, category: &CreateCategory) -> AppResult<CategoryWithCount> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, category: &UpdateCategory) -> AppResult<CategoryWithCount> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete a category; its book links go with it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }

        Ok(())
    }
}
