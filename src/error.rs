use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// A required field is missing or malformed. Raised before any store call.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("price must be a number: {0:?}")]
    InvalidPrice(String),

    #[error("price must be greater than 0")]
    NonPositivePrice,

    #[error("discount must be a percentage between 0 and 100: {0:?}")]
    InvalidDiscount(String),

    #[error("please add at least one image")]
    NoImage,

    #[error("unknown size {0:?}, sizes run from 35 to 50")]
    UnknownSize(String),

    #[error("quantity too large")]
    QuantityTooLarge,
}

/// A remote write against the entity store failed.
#[derive(Debug, Error)]
#[error("failed to {action}: {source}")]
pub struct PersistenceError {
    pub action: &'static str,
    #[source]
    pub source: StoreError,
}

impl PersistenceError {
    pub fn new(action: &'static str, source: StoreError) -> Self {
        PersistenceError { action, source }
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("deleting {0} requires confirmation")]
    ConfirmationRequired(String),

    #[error("product form is not open")]
    FormNotOpen,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConfirmationRequired(_) | AppError::FormNotOpen => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Persistence(e) = self {
            log::error!("{}", e);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
