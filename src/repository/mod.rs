//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod memory;
pub mod rentals;
pub mod store;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::error::AppError;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub users: users::UsersRepository,
    pub rentals: rentals::PgRentalStore,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            rentals: rentals::PgRentalStore::new(pool.clone()),
            pool,
        }
    }

    /// Whether `table` holds at least one row
    pub async fn table_has_rows(&self, table: Table) -> sqlx::Result<bool> {
        let query = format!("SELECT EXISTS (SELECT 1 FROM {} LIMIT 1)", table.name());
        sqlx::query_scalar(&query).fetch_one(&self.pool).await
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> sqlx::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Tables checked before seeding demo data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Authors,
    Books,
    Users,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Authors => "authors",
            Table::Books => "books",
            Table::Users => "users",
        }
    }
}

/// Turn a unique or foreign key violation into a conflict
pub(crate) fn conflict_on_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            AppError::Conflict(message())
        }
        _ => AppError::Database(e),
    }
}
