//! Storage contracts consumed by the rental service.
//!
//! A rent or return runs inside one [`RentalTransaction`] obtained from a
//! [`RentalStore`]. Everything written through the transaction becomes visible
//! on [`RentalTransaction::commit`]; dropping the transaction without
//! committing discards it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::StorageError,
    models::{Book, RentalRecord, User},
};

/// Result of asking the ledger to open a rental
#[derive(Debug, Clone, PartialEq)]
pub enum OpenRental {
    Opened(RentalRecord),
    /// The book already has an active rental guard
    DuplicateActiveRental,
}

/// Result of asking the ledger to close the open rental of a book
#[derive(Debug, Clone, PartialEq)]
pub enum CloseRental {
    Closed(RentalRecord),
    NoOpenRental,
}

#[async_trait]
pub trait BookStore: Send {
    /// Fetch a book and hold it exclusively until the transaction ends
    async fn lock_book(&mut self, book_id: i32) -> Result<Option<Book>, StorageError>;

    /// Persist the availability flag. `None` when the book does not exist.
    async fn update_book_availability(
        &mut self,
        book_id: i32,
        available: bool,
    ) -> Result<Option<Book>, StorageError>;
}

#[async_trait]
pub trait UserStore: Send {
    async fn get_user(&mut self, user_id: i32) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait RentalLedger: Send {
    /// Append an open rental and its active rental guard
    async fn insert_open_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        start: DateTime<Utc>,
    ) -> Result<OpenRental, StorageError>;

    /// Drop the active rental guard and set the end date of the open rental
    async fn close_open_rental(
        &mut self,
        book_id: i32,
        end: DateTime<Utc>,
    ) -> Result<CloseRental, StorageError>;

    async fn list_open_rentals_for_user(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<RentalRecord>, StorageError>;
}

/// One all-or-nothing unit of work over books, users and the rental ledger
#[async_trait]
pub trait RentalTransaction: BookStore + UserStore + RentalLedger + 'static {
    async fn commit(self) -> Result<(), StorageError>;
    async fn rollback(self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait RentalStore: Clone + Send + Sync + 'static {
    type Transaction: RentalTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StorageError>;
}
