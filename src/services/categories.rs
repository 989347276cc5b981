//! Category management service

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{CategoryQuery, CategoryWithCount, CreateCategory, UpdateCategory},
        pagination::{PageQuery, Paginated},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &CategoryQuery) -> AppResult<Paginated<CategoryWithCount>> {
        let (categories, total) = self.repository.categories.search(query).await?;
        let page = PageQuery { page: query.page, per_page: query.per_page };
        Ok(Paginated::new(categories, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CategoryWithCount> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create(&self, category: CreateCategory) -> AppResult<CategoryWithCount> {
        self.ensure_name_free(&category.name, None).await?;
        let category = self.repository.categories.create(&category).await?;
        tracing::info!(category_id = category.id, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: i32, category: UpdateCategory) -> AppResult<CategoryWithCount> {
        if let Some(ref name) = category.name {
            self.ensure_name_free(name, Some(id)).await?;
        }
        self.repository.categories.update(id, &category).await
    }

    /// Delete a category; books stay, only the link goes
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await
    }

    async fn ensure_name_free(&self, name: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self.repository.categories.name_exists(name, exclude_id).await? {
            return Err(AppError::field("name", "The name has already been taken."));
        }
        Ok(())
    }
}
