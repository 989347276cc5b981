//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::{PageQuery, Paginated},
    },
    repository::{
        books::{BookChanges, BookFields},
        Repository,
    },
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &BookQuery) -> AppResult<Paginated<Book>> {
        let (books, total) = self.repository.books.search(query).await?;
        let page = PageQuery { page: query.page, per_page: query.per_page };
        Ok(Paginated::new(books, total, &page))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Books of one category; 404 when the category does not exist
    pub async fn by_category(&self, category_id: i32, page: PageQuery) -> AppResult<Paginated<Book>> {
        if !self.repository.categories.exists(category_id).await? {
            return Err(AppError::NotFound(format!("Category with id {} not found", category_id)));
        }
        self.search(&BookQuery {
            category_id: Some(category_id),
            page: page.page,
            per_page: page.per_page,
            ..Default::default()
        })
        .await
    }

    /// Books of one author; 404 when the author does not exist
    pub async fn by_author(&self, author_id: i32, page: PageQuery) -> AppResult<Paginated<Book>> {
        if !self.repository.authors.exists(author_id).await? {
            return Err(AppError::NotFound(format!("Author with id {} not found", author_id)));
        }
        self.search(&BookQuery {
            author_id: Some(author_id),
            page: page.page,
            per_page: page.per_page,
            ..Default::default()
        })
        .await
    }

    pub async fn create(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::field("isbn", "The isbn has already been taken."));
        }
        self.ensure_author(book.author_id).await?;
        let category_ids = book.category_ids.clone().unwrap_or_default();
        self.ensure_categories(&category_ids).await?;

        let created = self
            .repository
            .books
            .create(
                &BookFields {
                    title: &book.title,
                    isbn: &book.isbn,
                    published_year: book.published_year,
                    description: book.description.as_deref(),
                    cover_image: book.cover_image.as_deref(),
                    total_copies: book.total_copies,
                    available_copies: book.available_copies,
                    author_id: book.author_id,
                },
                &category_ids,
            )
            .await?;

        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book created");
        Ok(created)
    }

    /// Apply a partial update on top of the stored book
    pub async fn update(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        if !self.repository.books.exists(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        if let Some(ref isbn) = update.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::field("isbn", "The isbn has already been taken."));
            }
        }
        if let Some(author_id) = update.author_id {
            self.ensure_author(author_id).await?;
        }
        if let Some(ref category_ids) = update.category_ids {
            self.ensure_categories(category_ids).await?;
        }

        self.repository
            .books
            .update(
                id,
                &BookChanges {
                    title: update.title.as_deref(),
                    isbn: update.isbn.as_deref(),
                    published_year: update.published_year,
                    description: update.description.as_deref(),
                    cover_image: update.cover_image.as_deref(),
                    total_copies: update.total_copies,
                    available_copies: update.available_copies,
                    author_id: update.author_id,
                },
                update.category_ids.as_deref(),
            )
            .await
    }

    /// Delete a book that was never reserved
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.repository.books.exists(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if self.repository.books.has_reservations(id).await? {
            return Err(AppError::BusinessRule(
                "Cannot delete a book with reservations".to_string(),
            ));
        }
        self.repository.books.delete(id).await
    }

    async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
        if !self.repository.authors.exists(author_id).await? {
            return Err(AppError::field("author_id", "The selected author id is invalid."));
        }
        Ok(())
    }

    async fn ensure_categories(&self, category_ids: &[i32]) -> AppResult<()> {
        if category_ids.is_empty() {
            return Ok(());
        }
        let missing = self.repository.categories.missing_ids(category_ids).await?;
        if !missing.is_empty() {
            return Err(AppError::field(
                "category_ids",
                format!("The selected category ids are invalid: {:?}.", missing),
            ));
        }
        Ok(())
    }
}
