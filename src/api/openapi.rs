//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, health, rentals, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "0.1.0",
        description = "Book rental REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Authors
        authors::list_authors,
        authors::top_authors,
        authors::get_author,
        authors::get_author_books,
        authors::create_author,
        authors::delete_author,
        // Books
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
        // Rentals
        rentals::rent_book,
        rentals::return_book,
        rentals::get_user_rentals,
    ),
    components(
        schemas(
            // Authors
            crate::models::author::Author,
            crate::models::author::AuthorShort,
            crate::models::author::AuthorWithRentCount,
            crate::models::author::CreateAuthor,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            // Rentals
            crate::models::rental::RentalRecord,
            rentals::RentalResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book catalog"),
        (name = "users", description = "User management"),
        (name = "rentals", description = "Renting and returning books")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_rental_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/rentals/{book_id}/{user_id}"));
        assert!(doc.paths.paths.contains_key("/rentals/{book_id}"));
        assert!(doc.paths.paths.contains_key("/authors/top"));
    }
}
