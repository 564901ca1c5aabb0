//! Users service

use std::collections::HashMap;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        rental::RentalRecord,
        user::{CreateUser, User},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;
        self.repository.users.create(&data).await
    }

    /// Get a user with their open rentals
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let mut user = self.repository.users.get_by_id(id).await?;
        user.rented_books = self
            .repository
            .rentals
            .open_rentals_for_user(id)
            .await?;
        Ok(user)
    }

    /// List users with their open rentals
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let mut users = self.repository.users.list().await?;
        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();

        let mut by_user: HashMap<i32, Vec<RentalRecord>> = HashMap::new();
        for rental in self
            .repository
            .rentals
            .open_rentals_for_users(&ids)
            .await?
        {
            by_user.entry(rental.user_id).or_default().push(rental);
        }
        for user in &mut users {
            user.rented_books = by_user.remove(&user.id).unwrap_or_default();
        }

        Ok(users)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await
    }
}
