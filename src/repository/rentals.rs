//! PostgreSQL rental store.
//!
//! Every rent/return runs in one database transaction. The book row is locked
//! with `FOR UPDATE`, the user row with `FOR SHARE`, and both the
//! `active_book_rentals` primary key and the partial unique index on open
//! `book_rentals` rows reject a second open rental for the same book.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Transaction};

use crate::{
    error::StorageError,
    models::{Book, RentalRecord, User},
};

use super::store::{
    BookStore, CloseRental, OpenRental, RentalLedger, RentalStore, RentalTransaction, UserStore,
};

#[derive(Clone)]
pub struct PgRentalStore {
    pool: Pool<Postgres>,
}

impl PgRentalStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open rentals of a user, outside of any rent/return transaction
    pub async fn open_rentals_for_user(&self, user_id: i32) -> Result<Vec<RentalRecord>, StorageError> {
        let mut con = self.pool.acquire().await?;
        PgRentalInternal::open_rentals_for_user(&mut *con, user_id).await
    }

    /// Open rentals of several users at once
    pub async fn open_rentals_for_users(&self, user_ids: &[i32]) -> Result<Vec<RentalRecord>, StorageError> {
        let rentals = sqlx::query_as::<_, RentalRecord>(
            r#"
            SELECT id, book_id, user_id, rental_date, return_date, created_at
            FROM book_rentals
            WHERE user_id = ANY($1) AND return_date IS NULL
            ORDER BY rental_date
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rentals)
    }
}

pub struct PgRentalTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RentalStore for PgRentalStore {
    type Transaction = PgRentalTransaction;

    async fn begin(&self) -> Result<PgRentalTransaction, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(PgRentalTransaction { tx })
    }
}

#[async_trait]
impl RentalTransaction for PgRentalTransaction {
    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl BookStore for PgRentalTransaction {
    async fn lock_book(&mut self, book_id: i32) -> Result<Option<Book>, StorageError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author_id, available, created_at
            FROM books
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }

    async fn update_book_availability(
        &mut self,
        book_id: i32,
        available: bool,
    ) -> Result<Option<Book>, StorageError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET available = $1
            WHERE id = $2
            RETURNING id, title, author_id, available, created_at
            "#,
        )
        .bind(available)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(book)
    }
}

#[async_trait]
impl UserStore for PgRentalTransaction {
    async fn get_user(&mut self, user_id: i32) -> Result<Option<User>, StorageError> {
        // FOR SHARE keeps the user from being deleted under an in-flight rental
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at FROM users WHERE id = $1 FOR SHARE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl RentalLedger for PgRentalTransaction {
    async fn insert_open_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        start: DateTime<Utc>,
    ) -> Result<OpenRental, StorageError> {
        let record = sqlx::query_as::<_, RentalRecord>(
            r#"
            INSERT INTO book_rentals (book_id, user_id, rental_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (book_id) WHERE return_date IS NULL DO NOTHING
            RETURNING id, book_id, user_id, rental_date, return_date, created_at
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(start)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(record) = record else {
            return Ok(OpenRental::DuplicateActiveRental);
        };

        let guarded = sqlx::query(
            r#"
            INSERT INTO active_book_rentals (book_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (book_id) DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if guarded == 0 {
            return Ok(OpenRental::DuplicateActiveRental);
        }

        Ok(OpenRental::Opened(record))
    }

    async fn close_open_rental(
        &mut self,
        book_id: i32,
        end: DateTime<Utc>,
    ) -> Result<CloseRental, StorageError> {
        let released = sqlx::query("DELETE FROM active_book_rentals WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        if released == 0 {
            tracing::warn!("No active rental guard for book {}", book_id);
        }

        let record = sqlx::query_as::<_, RentalRecord>(
            r#"
            UPDATE book_rentals SET return_date = $1
            WHERE book_id = $2 AND return_date IS NULL
            RETURNING id, book_id, user_id, rental_date, return_date, created_at
            "#,
        )
        .bind(end)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(match record {
            Some(record) => CloseRental::Closed(record),
            None => CloseRental::NoOpenRental,
        })
    }

    async fn list_open_rentals_for_user(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<RentalRecord>, StorageError> {
        PgRentalInternal::open_rentals_for_user(&mut *self.tx, user_id).await
    }
}

struct PgRentalInternal;

impl PgRentalInternal {
    async fn open_rentals_for_user(
        con: &mut PgConnection,
        user_id: i32,
    ) -> Result<Vec<RentalRecord>, StorageError> {
        let rentals = sqlx::query_as::<_, RentalRecord>(
            r#"
            SELECT id, book_id, user_id, rental_date, return_date, created_at
            FROM book_rentals
            WHERE user_id = $1 AND return_date IS NULL
            ORDER BY rental_date
            "#,
        )
        .bind(user_id)
        .fetch_all(con)
        .await?;
        Ok(rentals)
    }
}
