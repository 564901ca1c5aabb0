//! Rental engine behavior against the in-memory store

use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use library_server::{
    error::{RentalError, RentalStep, StorageError},
    repository::memory::{FailurePoint, MemoryRentalStore, MemoryState},
    services::rentals::RentalService,
};

fn service(store: &MemoryRentalStore) -> RentalService<MemoryRentalStore> {
    RentalService::new(store.clone(), Duration::from_secs(5))
}

/// A book is unavailable exactly when it has one open rental and one guard
fn assert_consistent(state: &MemoryState) {
    for book in state.books.values() {
        let open = state.open_rentals_for_book(book.id);
        if book.available {
            assert!(open.is_empty(), "available book {} has open rentals", book.id);
            assert!(!state.guards.contains_key(&book.id));
        } else {
            assert_eq!(open.len(), 1, "rented book {} needs exactly one open rental", book.id);
            assert_eq!(state.guards.get(&book.id), Some(&open[0].user_id));
        }
    }
}

#[tokio::test]
async fn test_rent_then_return_round_trip() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    let rentals = service(&store);

    let opened = assert_ok!(rentals.rent(book.id, user.id).await);
    assert!(opened.is_open());

    let closed = assert_ok!(rentals.return_book(book.id).await);
    assert_eq!(closed.id, opened.id);
    assert!(closed.return_date.is_some());

    let state = store.snapshot().await;
    assert!(state.books[&book.id].available);
    let history = state.rentals_for_book(book.id);
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_open());
    assert_consistent(&state);
}

#[tokio::test]
async fn test_second_rent_is_rejected_and_keeps_first() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let first = store.add_user("Ann", "ann@example.com").await;
    let rentals = service(&store);

    let opened = assert_ok!(rentals.rent(book.id, first.id).await);
    let before = store.snapshot().await;

    let err = assert_err!(rentals.rent(book.id, first.id).await);
    assert!(matches!(err, RentalError::BookUnavailable(id) if id == book.id));

    let after = store.snapshot().await;
    assert_eq!(after.rentals, before.rentals);
    assert_eq!(after.open_rentals_for_book(book.id)[0].id, opened.id);
    assert_consistent(&after);
}

#[tokio::test]
async fn test_return_of_never_rented_book() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;

    let err = assert_err!(service(&store).return_book(book.id).await);
    assert!(matches!(err, RentalError::BookNotRented(id) if id == book.id));
    assert!(store.snapshot().await.rentals.is_empty());
}

#[tokio::test]
async fn test_concurrent_rents_have_one_winner() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let ann = store.add_user("Ann", "ann@example.com").await;
    let bob = store.add_user("Bob", "bob@example.com").await;
    let rentals = service(&store);
    let book_id = book.id;

    let tasks: Vec<_> = [ann.id, bob.id]
        .into_iter()
        .map(|user_id| {
            let rentals = rentals.clone();
            tokio::spawn(async move { rentals.rent(book_id, user_id).await })
        })
        .collect();

    let mut won = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => won += 1,
            Err(RentalError::BookUnavailable(_)) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!((won, rejected), (1, 1));

    let state = store.snapshot().await;
    assert_eq!(state.rentals.len(), 1);
    assert_consistent(&state);
}

#[tokio::test]
async fn test_rent_conflict_return_scenario() {
    let store = MemoryRentalStore::new();
    let b1 = store.add_book("Dune", 1).await;
    let u1 = store.add_user("Ann", "ann@example.com").await;
    let u2 = store.add_user("Bob", "bob@example.com").await;
    let rentals = service(&store);

    assert_ok!(rentals.rent(b1.id, u1.id).await);
    assert!(!store.snapshot().await.books[&b1.id].available);

    let err = assert_err!(rentals.rent(b1.id, u2.id).await);
    assert!(matches!(err, RentalError::BookUnavailable(_)));

    assert_ok!(rentals.return_book(b1.id).await);

    let state = store.snapshot().await;
    assert!(state.books[&b1.id].available);
    let history = state.rentals_for_book(b1.id);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id, u1.id);
    assert!(history[0].return_date.is_some());
}

#[tokio::test]
async fn test_invariant_holds_across_mixed_sequence() {
    let store = MemoryRentalStore::new();
    let mut books = Vec::new();
    for title in ["Dune", "Emma", "Ulysses"] {
        books.push(store.add_book(title, 1).await.id);
    }
    let ann = store.add_user("Ann", "ann@example.com").await.id;
    let bob = store.add_user("Bob", "bob@example.com").await.id;
    let rentals = service(&store);

    let _ = rentals.rent(books[0], ann).await;
    let _ = rentals.rent(books[1], bob).await;
    let _ = rentals.rent(books[0], bob).await;
    let _ = rentals.return_book(books[2]).await;
    let _ = rentals.return_book(books[0]).await;
    let _ = rentals.rent(books[0], bob).await;
    let _ = rentals.rent(books[2], 99).await;
    assert_consistent(&store.snapshot().await);

    let open = assert_ok!(rentals.user_rentals(bob).await);
    assert_eq!(open.len(), 2);
    assert!(assert_ok!(rentals.user_rentals(ann).await).is_empty());
}

#[tokio::test]
async fn test_stale_guard_blocks_rent_without_partial_writes() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    store
        .modify(|s| {
            s.guards.insert(book.id, 42);
        })
        .await;

    let err = assert_err!(service(&store).rent(book.id, user.id).await);
    assert!(matches!(err, RentalError::BookUnavailable(_)));

    let state = store.snapshot().await;
    assert!(state.rentals.is_empty());
    assert!(state.books[&book.id].available);
}

#[tokio::test]
async fn test_rented_book_without_open_rental_is_inconsistent() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    store
        .modify(|s| {
            if let Some(b) = s.books.get_mut(&book.id) {
                b.available = false;
            }
        })
        .await;

    let err = assert_err!(service(&store).return_book(book.id).await);
    assert!(matches!(err, RentalError::NoOpenRental(id) if id == book.id));
    // Nothing is repaired behind the operator's back
    assert!(!store.snapshot().await.books[&book.id].available);
}

#[tokio::test]
async fn test_failure_after_ledger_write_rolls_back() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    store.inject_failure(Some(FailurePoint::UpdateAvailability)).await;

    let err = assert_err!(service(&store).rent(book.id, user.id).await);
    assert!(matches!(
        err,
        RentalError::Storage {
            step: RentalStep::UpdateAvailability,
            source: StorageError::Backend(_),
        }
    ));

    let state = store.snapshot().await;
    assert!(state.rentals.is_empty());
    assert!(state.guards.is_empty());
    assert!(state.books[&book.id].available);
}

#[tokio::test]
async fn test_failed_return_keeps_rental_open() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    let rentals = service(&store);
    assert_ok!(rentals.rent(book.id, user.id).await);

    store.inject_failure(Some(FailurePoint::UpdateAvailability)).await;
    let err = assert_err!(rentals.return_book(book.id).await);
    assert!(matches!(
        err,
        RentalError::Storage {
            step: RentalStep::UpdateAvailability,
            ..
        }
    ));

    let state = store.snapshot().await;
    assert_eq!(state.open_rentals_for_book(book.id).len(), 1);
    assert_consistent(&state);
}

#[tokio::test]
async fn test_failed_ledger_insert_reports_step() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    store.inject_failure(Some(FailurePoint::InsertOpenRental)).await;

    let err = assert_err!(service(&store).rent(book.id, user.id).await);
    assert!(matches!(
        err,
        RentalError::Storage {
            step: RentalStep::OpenRental,
            ..
        }
    ));
    assert_consistent(&store.snapshot().await);
}

#[tokio::test]
async fn test_stalled_transaction_times_out_and_releases_store() {
    let store = MemoryRentalStore::new();
    let book = store.add_book("Dune", 1).await;
    let user = store.add_user("Ann", "ann@example.com").await;
    let rentals = RentalService::new(store.clone(), Duration::from_millis(50));

    store.inject_stall(Some(FailurePoint::UpdateAvailability)).await;
    let err = assert_err!(rentals.rent(book.id, user.id).await);
    assert!(matches!(
        err,
        RentalError::Storage {
            step: RentalStep::Deadline,
            source: StorageError::TimedOut(50),
        }
    ));
    assert!(store.snapshot().await.rentals.is_empty());

    store.inject_stall(None).await;
    assert_ok!(rentals.rent(book.id, user.id).await);
    assert_consistent(&store.snapshot().await);
}
