use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Missing required fields: {0}")]
    MissingFields(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("A customer with this email already exists")]
    DuplicateEmail,

    #[error("A subscriber with this phone already exists")]
    DuplicatePhone,

    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("Template parameters unresolved: {}", .0.join(", "))]
    IncompleteParameters(Vec<String>),

    #[error("Messaging provider error: {0}")]
    Provider(String),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("HTTP client error")]
    HttpError(#[from] reqwest::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound | AppError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingFields(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidQuantity
            | AppError::DuplicateEmail
            | AppError::DuplicatePhone
            | AppError::InsufficientStock { .. }
            | AppError::IncompleteParameters(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(_)
            | AppError::OrmError(_)
            | AppError::HttpError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
