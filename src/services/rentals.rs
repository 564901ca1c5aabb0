//! Rental service: renting and returning books.
//!
//! Per book the only transitions are `Available --rent--> Rented --return--> Available`.
//! Each operation is one transaction: the book row is locked first, then the
//! ledger and the availability flag are written, and nothing is visible until
//! commit. A failure at any step rolls the whole unit back.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use crate::{
    error::{RentalError, RentalStep, StorageError},
    models::RentalRecord,
    repository::store::{
        BookStore, CloseRental, OpenRental, RentalLedger, RentalStore, RentalTransaction, UserStore,
    },
};

#[derive(Clone)]
pub struct RentalService<S> {
    store: S,
    timeout: Duration,
}

impl<S: RentalStore> RentalService<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Rent a book to a user
    pub async fn rent(&self, book_id: i32, user_id: i32) -> Result<RentalRecord, RentalError> {
        let rental = self
            .in_transaction(|tx| Box::pin(rent_steps(tx, book_id, user_id)))
            .await?;

        tracing::info!(
            rental_id = rental.id,
            book_id,
            user_id,
            "Book rented"
        );
        Ok(rental)
    }

    /// Return a rented book, closing its open rental
    pub async fn return_book(&self, book_id: i32) -> Result<RentalRecord, RentalError> {
        let rental = self
            .in_transaction(|tx| Box::pin(return_steps(tx, book_id)))
            .await
            .inspect_err(|e| {
                if let RentalError::NoOpenRental(_) = e {
                    tracing::error!(book_id, "Book is marked rented but the ledger has no open rental");
                }
            })?;

        tracing::info!(
            rental_id = rental.id,
            book_id,
            user_id = rental.user_id,
            "Book returned"
        );
        Ok(rental)
    }

    /// Open rentals of a user
    pub async fn user_rentals(&self, user_id: i32) -> Result<Vec<RentalRecord>, RentalError> {
        self.in_transaction(|tx| {
            Box::pin(async move {
                tx.get_user(user_id)
                    .await
                    .map_err(RentalError::storage(RentalStep::LoadUser))?
                    .ok_or(RentalError::UserNotFound(user_id))?;
                tx.list_open_rentals_for_user(user_id)
                    .await
                    .map_err(RentalError::storage(RentalStep::ListRentals))
            })
        })
        .await
    }

    /// Run `steps` in a fresh transaction bounded by the configured timeout.
    ///
    /// Commits on success and rolls back on error. When the deadline passes the
    /// pending future is dropped, which drops the transaction and discards it.
    async fn in_transaction<T, F>(&self, steps: F) -> Result<T, RentalError>
    where
        T: Send,
        F: for<'t> FnOnce(
                &'t mut S::Transaction,
            ) -> std::pin::Pin<
                Box<dyn Future<Output = Result<T, RentalError>> + Send + 't>,
            > + Send,
    {
        let unit = async {
            let mut tx = self
                .store
                .begin()
                .await
                .map_err(RentalError::storage(RentalStep::Begin))?;

            match steps(&mut tx).await {
                Ok(value) => {
                    tx.commit()
                        .await
                        .map_err(RentalError::storage(RentalStep::Commit))?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!("Rollback after failed rental step failed: {}", rollback);
                    }
                    Err(e)
                }
            }
        };

        tokio::time::timeout(self.timeout, unit)
            .await
            .map_err(|_| RentalError::Storage {
                step: RentalStep::Deadline,
                source: StorageError::TimedOut(millis(self.timeout)),
            })?
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn rent_steps<Tx: RentalTransaction>(
    tx: &mut Tx,
    book_id: i32,
    user_id: i32,
) -> Result<RentalRecord, RentalError> {
    let book = tx
        .lock_book(book_id)
        .await
        .map_err(RentalError::storage(RentalStep::LoadBook))?
        .ok_or(RentalError::BookNotFound(book_id))?;

    if !book.available {
        return Err(RentalError::BookUnavailable(book_id));
    }

    tx.get_user(user_id)
        .await
        .map_err(RentalError::storage(RentalStep::LoadUser))?
        .ok_or(RentalError::UserNotFound(user_id))?;

    let rental = match tx
        .insert_open_rental(book_id, user_id, Utc::now())
        .await
        .map_err(RentalError::storage(RentalStep::OpenRental))?
    {
        OpenRental::Opened(rental) => rental,
        OpenRental::DuplicateActiveRental => {
            tracing::warn!(book_id, user_id, "Active rental guard rejected a second rental");
            return Err(RentalError::BookUnavailable(book_id));
        }
    };

    tx.update_book_availability(book_id, false)
        .await
        .map_err(RentalError::storage(RentalStep::UpdateAvailability))?
        .ok_or(RentalError::BookNotFound(book_id))?;

    Ok(rental)
}

async fn return_steps<Tx: RentalTransaction>(
    tx: &mut Tx,
    book_id: i32,
) -> Result<RentalRecord, RentalError> {
    let book = tx
        .lock_book(book_id)
        .await
        .map_err(RentalError::storage(RentalStep::LoadBook))?
        .ok_or(RentalError::BookNotFound(book_id))?;

    if book.available {
        return Err(RentalError::BookNotRented(book_id));
    }

    let rental = match tx
        .close_open_rental(book_id, Utc::now())
        .await
        .map_err(RentalError::storage(RentalStep::CloseRental))?
    {
        CloseRental::Closed(rental) => rental,
        CloseRental::NoOpenRental => return Err(RentalError::NoOpenRental(book_id)),
    };

    tx.update_book_availability(book_id, true)
        .await
        .map_err(RentalError::storage(RentalStep::UpdateAvailability))?
        .ok_or(RentalError::BookNotFound(book_id))?;

    Ok(rental)
}
