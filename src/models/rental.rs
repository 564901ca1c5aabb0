//! Rental ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// One rental of a book by a user. `return_date` is absent while the rental is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RentalRecord {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub rental_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RentalRecord {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}
