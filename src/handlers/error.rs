use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use database::{collection::StoreError, consts::consts::ObjectIdParseError};
use thiserror::Error;

use crate::model::{message::MessageResponse, validation::ValidationError};

/// Every failure a request can end with, the display text is the `message` of the response body
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error decoding person: {0}")]
    Decode(String),

    #[error("Error validating person: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    IdentifierParse(#[from] ObjectIdParseError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Internal Error")]
    Internal,

    #[error("{0}")]
    NotFound(String),

    /// A handler expected a validated body but the validation middleware was not in front of it
    #[error("Internal Error")]
    MissingValidatedBody,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::IdentifierParse(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Decode(_)
            | ApiError::Store(_)
            | ApiError::Internal
            | ApiError::MissingValidatedBody => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(MessageResponse::new(self.to_string()))
    }
}
