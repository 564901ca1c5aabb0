//! Books repository for database operations
//!
//! Catalog writes never touch `available`; the rental store owns that column.

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::AuthorShort,
        book::{Book, CreateBook, UpdateBook},
    },
};

use super::conflict_on_violation;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID, with its author
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.title, b.author_id, b.available, b.created_at,
                   a.name AS author_name
            FROM books b
            JOIN authors a ON a.id = b.author_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let author_id: i32 = row.get("author_id");
        Ok(Book {
            id: row.get("id"),
            title: row.get("title"),
            author_id,
            available: row.get("available"),
            created_at: row.get("created_at"),
            author: Some(AuthorShort {
                id: author_id,
                name: row.get("author_name"),
            }),
        })
    }

    /// Add a book. New books start available.
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, available)
            VALUES ($1, $2, TRUE)
            RETURNING id, title, author_id, available, created_at
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update title and/or author
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($1, title),
                author_id = COALESCE($2, author_id)
            WHERE id = $3
            RETURNING id, title, author_id, available, created_at
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book that was never rented
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_violation(e, || format!("Book {} has rental history", id)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
