//! Authors repository for database operations

use std::collections::HashMap;

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorWithRentCount, CreateAuthor},
        book::Book,
    },
};

use super::conflict_on_violation;

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get author by ID, with their books
    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        let mut author = sqlx::query_as::<_, Author>(
            "SELECT id, name, biography, created_at FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;

        author.books = self.books_of(id).await?;
        Ok(author)
    }

    /// Check that an author exists
    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// List all authors with their books
    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let mut authors = sqlx::query_as::<_, Author>(
            "SELECT id, name, biography, created_at FROM authors ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author_id, available, created_at FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_author: HashMap<i32, Vec<Book>> = HashMap::new();
        for book in books {
            by_author.entry(book.author_id).or_default().push(book);
        }
        for author in &mut authors {
            author.books = by_author.remove(&author.id).unwrap_or_default();
        }

        Ok(authors)
    }

    /// Authors ranked by number of rentals of their books, open or closed
    pub async fn top(&self, limit: i64) -> AppResult<Vec<AuthorWithRentCount>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.name, a.biography, a.created_at, COUNT(r.id) AS rent_count
            FROM authors a
            LEFT JOIN books b ON b.author_id = a.id
            LEFT JOIN book_rentals r ON r.book_id = b.id
            GROUP BY a.id
            ORDER BY rent_count DESC, a.id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i32 = row.get("id");
            result.push(AuthorWithRentCount {
                author: Author {
                    id,
                    name: row.get("name"),
                    biography: row.get("biography"),
                    created_at: row.get("created_at"),
                    books: self.books_of(id).await?,
                },
                rent_count: row.get("rent_count"),
            });
        }

        Ok(result)
    }

    /// Books written by an author
    pub async fn books_of(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author_id, available, created_at
            FROM books
            WHERE author_id = $1
            ORDER BY id
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Create an author
    pub async fn create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (name, biography)
            VALUES ($1, $2)
            RETURNING id, name, biography, created_at
            "#,
        )
        .bind(&data.name)
        .bind(data.biography.as_deref().unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    /// Delete an author and their books
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                conflict_on_violation(e, || {
                    format!("Author {} has books with rental history", id)
                })
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }
}
