//! Author management service

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorQuery, CreateAuthor, UpdateAuthor},
        pagination::{PageQuery, Paginated},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &AuthorQuery) -> AppResult<Paginated<Author>> {
        let (authors, total) = self.repository.authors.search(query).await?;
        let page = PageQuery { page: query.page, per_page: query.per_page };
        Ok(Paginated::new(authors, total, &page))
    }

    /// Author with every book
    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        let mut author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.list_by_author(id).await?;
        author.books_count = Some(books.len() as i64);
        author.books = Some(books);
        Ok(author)
    }

    pub async fn create(&self, author: CreateAuthor) -> AppResult<Author> {
        let author = self.repository.authors.create(&author).await?;
        tracing::info!(author_id = author.id, "Author created");
        Ok(author)
    }

    pub async fn update(&self, id: i32, author: UpdateAuthor) -> AppResult<Author> {
        self.repository.authors.update(id, &author).await
    }

    /// Delete an author that no book references
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.authors.exists(id).await? {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        if self.repository.authors.has_books(id).await? {
            return Err(AppError::BusinessRule(
                "Cannot delete an author who has books".to_string(),
            ));
        }
        self.repository.authors.delete(id).await
    }
}
