//! Authors service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorWithRentCount, CreateAuthor},
        book::Book,
    },
    repository::Repository,
};

const DEFAULT_TOP_LIMIT: i64 = 10;
const MAX_TOP_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: CreateAuthor) -> AppResult<Author> {
        data.validate()?;
        self.repository.authors.create(&data).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    /// Most rented authors, `limit` clamped to 1..=100
    pub async fn top(&self, limit: Option<i64>) -> AppResult<Vec<AuthorWithRentCount>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
        self.repository.authors.top(limit).await
    }

    pub async fn books(&self, author_id: i32) -> AppResult<Vec<Book>> {
        // Verify author exists
        self.repository.authors.get_by_id(author_id).await?;
        self.repository.authors.books_of(author_id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }
}
