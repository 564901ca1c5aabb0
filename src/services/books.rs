//! Books service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;
        self.ensure_author(data.author_id).await?;
        self.repository.books.create(&data).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Update catalog fields. The availability flag is left to the rental service.
    pub async fn update(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        data.validate()?;
        if let Some(author_id) = data.author_id {
            self.ensure_author(author_id).await?;
        }
        self.repository.books.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
        if !self.repository.authors.exists(author_id).await? {
            return Err(AppError::NotFound(format!("Author with id {} not found", author_id)));
        }
        Ok(())
    }
}
