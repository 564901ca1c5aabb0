//! Data models for the library server

pub mod author;
pub mod book;
pub mod rental;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorShort, AuthorWithRentCount};
pub use book::Book;
pub use rental::RentalRecord;
pub use user::User;
