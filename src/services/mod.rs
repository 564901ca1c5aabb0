//! Business logic services

pub mod authors;
pub mod books;
pub mod rentals;
pub mod seed;
pub mod users;

use crate::{
    config::{RentalsConfig, SeedConfig},
    repository::{rentals::PgRentalStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub authors: authors::AuthorsService,
    pub books: books::BooksService,
    pub users: users::UsersService,
    pub rentals: rentals::RentalService<PgRentalStore>,
    pub seed: seed::SeedService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, rentals_config: &RentalsConfig, seed_config: SeedConfig) -> Self {
        Self {
            authors: authors::AuthorsService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            rentals: rentals::RentalService::new(repository.rentals.clone(), rentals_config.timeout()),
            seed: seed::SeedService::new(repository.clone(), seed_config),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> sqlx::Result<()> {
        self.repository.ping().await
    }
}
