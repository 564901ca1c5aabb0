//! In-memory rental store.
//!
//! Transactions are serialized: `begin` takes the store lock and works on a
//! copy of the state, which replaces the shared state on commit. Failures and
//! stalls can be injected at any step to exercise rollback and deadlines.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::StorageError,
    models::{Book, RentalRecord, User},
};

use super::store::{
    BookStore, CloseRental, OpenRental, RentalLedger, RentalStore, RentalTransaction, UserStore,
};

/// Step at which an injected failure or stall fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Begin,
    LockBook,
    GetUser,
    InsertOpenRental,
    CloseOpenRental,
    UpdateAvailability,
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub books: BTreeMap<i32, Book>,
    pub users: BTreeMap<i32, User>,
    pub rentals: Vec<RentalRecord>,
    /// Active rental guards: book id to user id
    pub guards: BTreeMap<i32, i32>,
    failure: Option<FailurePoint>,
    stall: Option<FailurePoint>,
}

impl MemoryState {
    pub fn open_rentals_for_book(&self, book_id: i32) -> Vec<&RentalRecord> {
        self.rentals
            .iter()
            .filter(|r| r.book_id == book_id && r.is_open())
            .collect()
    }

    pub fn rentals_for_book(&self, book_id: i32) -> Vec<&RentalRecord> {
        self.rentals.iter().filter(|r| r.book_id == book_id).collect()
    }

    fn next_id<T>(map: &BTreeMap<i32, T>) -> i32 {
        map.keys().next_back().map_or(1, |id| id + 1)
    }
}

#[derive(Clone, Default)]
pub struct MemoryRentalStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available book
    pub async fn add_book(&self, title: &str, author_id: i32) -> Book {
        let mut state = self.state.lock().await;
        let book = Book {
            id: MemoryState::next_id(&state.books),
            title: title.to_string(),
            author_id,
            available: true,
            created_at: Utc::now(),
            author: None,
        };
        state.books.insert(book.id, book.clone());
        book
    }

    pub async fn add_user(&self, name: &str, email: &str) -> User {
        let mut state = self.state.lock().await;
        let user = User {
            id: MemoryState::next_id(&state.users),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            rented_books: Vec::new(),
        };
        state.users.insert(user.id, user.clone());
        user
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Mutate the committed state directly, bypassing transactions
    pub async fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut MemoryState),
    {
        f(&mut *self.state.lock().await);
    }

    /// Make every transaction fail at `point` until cleared with `None`
    pub async fn inject_failure(&self, point: Option<FailurePoint>) {
        self.state.lock().await.failure = point;
    }

    /// Make every transaction hang at `point` until cleared with `None`
    pub async fn inject_stall(&self, point: Option<FailurePoint>) {
        self.state.lock().await.stall = point;
    }
}

pub struct MemoryRentalTransaction {
    shared: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

impl MemoryRentalTransaction {
    async fn checkpoint(&self, point: FailurePoint) -> Result<(), StorageError> {
        checkpoint(&self.work, point).await
    }
}

async fn checkpoint(state: &MemoryState, point: FailurePoint) -> Result<(), StorageError> {
    if state.stall == Some(point) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if state.failure == Some(point) {
        return Err(StorageError::Backend(format!("injected failure at {:?}", point)));
    }
    Ok(())
}

#[async_trait]
impl RentalStore for MemoryRentalStore {
    type Transaction = MemoryRentalTransaction;

    async fn begin(&self) -> Result<MemoryRentalTransaction, StorageError> {
        let shared = self.state.clone().lock_owned().await;
        checkpoint(&shared, FailurePoint::Begin).await?;
        let work = shared.clone();
        Ok(MemoryRentalTransaction { shared, work })
    }
}

#[async_trait]
impl RentalTransaction for MemoryRentalTransaction {
    async fn commit(self) -> Result<(), StorageError> {
        self.checkpoint(FailurePoint::Commit).await?;
        let MemoryRentalTransaction { mut shared, work } = self;
        *shared = work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryRentalTransaction {
    async fn lock_book(&mut self, book_id: i32) -> Result<Option<Book>, StorageError> {
        self.checkpoint(FailurePoint::LockBook).await?;
        Ok(self.work.books.get(&book_id).cloned())
    }

    async fn update_book_availability(
        &mut self,
        book_id: i32,
        available: bool,
    ) -> Result<Option<Book>, StorageError> {
        self.checkpoint(FailurePoint::UpdateAvailability).await?;
        Ok(self.work.books.get_mut(&book_id).map(|book| {
            book.available = available;
            book.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryRentalTransaction {
    async fn get_user(&mut self, user_id: i32) -> Result<Option<User>, StorageError> {
        self.checkpoint(FailurePoint::GetUser).await?;
        Ok(self.work.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl RentalLedger for MemoryRentalTransaction {
    async fn insert_open_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        start: DateTime<Utc>,
    ) -> Result<OpenRental, StorageError> {
        self.checkpoint(FailurePoint::InsertOpenRental).await?;

        if !self.work.open_rentals_for_book(book_id).is_empty() {
            return Ok(OpenRental::DuplicateActiveRental);
        }

        let record = RentalRecord {
            id: self.work.rentals.len() as i32 + 1,
            book_id,
            user_id,
            rental_date: start,
            return_date: None,
            created_at: start,
        };
        self.work.rentals.push(record.clone());

        if self.work.guards.contains_key(&book_id) {
            return Ok(OpenRental::DuplicateActiveRental);
        }
        self.work.guards.insert(book_id, user_id);

        Ok(OpenRental::Opened(record))
    }

    async fn close_open_rental(
        &mut self,
        book_id: i32,
        end: DateTime<Utc>,
    ) -> Result<CloseRental, StorageError> {
        self.checkpoint(FailurePoint::CloseOpenRental).await?;

        if self.work.guards.remove(&book_id).is_none() {
            tracing::warn!("No active rental guard for book {}", book_id);
        }

        let record = self
            .work
            .rentals
            .iter_mut()
            .find(|r| r.book_id == book_id && r.is_open());

        Ok(match record {
            Some(record) => {
                record.return_date = Some(end);
                CloseRental::Closed(record.clone())
            }
            None => CloseRental::NoOpenRental,
        })
    }

    async fn list_open_rentals_for_user(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<RentalRecord>, StorageError> {
        Ok(self
            .work
            .rentals
            .iter()
            .filter(|r| r.user_id == user_id && r.is_open())
            .cloned()
            .collect())
    }
}
