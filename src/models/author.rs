//! Author model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::Book;

/// Author with the books attached to them
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub biography: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub books: Vec<Book>,
}

/// Author summary embedded in book responses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorShort {
    pub id: i32,
    pub name: String,
}

/// Author ranked by how many times their books were rented
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorWithRentCount {
    pub author: Author,
    pub rent_count: i64,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub biography: Option<String>,
}

/// Query parameters for the top authors ranking
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TopAuthorsQuery {
    /// Number of authors to return (default 10)
    pub limit: Option<i64>,
}
