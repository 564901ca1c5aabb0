//! Book rental endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::rental::RentalRecord};

/// Rent/return response
#[derive(Serialize, ToSchema)]
pub struct RentalResponse {
    pub success: bool,
    /// Status message
    pub message: String,
    /// The opened or closed rental
    pub rental: RentalRecord,
}

/// Rent a book to a user
#[utoipa::path(
    post,
    path = "/rentals/{book_id}/{user_id}",
    tag = "rentals",
    params(
        ("book_id" = i32, Path, description = "Book ID"),
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 201, description = "Book rented", body = RentalResponse),
        (status = 404, description = "Book or user not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is not available", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn rent_book(
    State(state): State<crate::AppState>,
    Path((book_id, user_id)): Path<(i32, i32)>,
) -> AppResult<(StatusCode, Json<RentalResponse>)> {
    let rental = state.services.rentals.rent(book_id, user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(RentalResponse {
            success: true,
            message: "Book has been rented".to_string(),
            rental,
        }),
    ))
}

/// Return a rented book
#[utoipa::path(
    delete,
    path = "/rentals/{book_id}",
    tag = "rentals",
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = RentalResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is not rented", body = crate::error::ErrorResponse),
        (status = 500, description = "Ledger inconsistent or storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<RentalResponse>> {
    let rental = state.services.rentals.return_book(book_id).await?;

    Ok(Json(RentalResponse {
        success: true,
        message: "Book rental completed".to_string(),
        rental,
    }))
}

/// Open rentals of a user
#[utoipa::path(
    get,
    path = "/users/{id}/rentals",
    tag = "rentals",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's open rentals", body = Vec<RentalRecord>),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_rentals(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<RentalRecord>>> {
    let rentals = state.services.rentals.user_rentals(user_id).await?;
    Ok(Json(rentals))
}
