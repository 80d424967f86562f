//! Crate-wide error taxonomy.
//!
//! Validation and authorization failures are caught at the boundary and never
//! reach storage; database failures roll the enclosing transaction back and
//! surface as a generic message.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad user input. The message is safe to show next to the form field.
    #[error("{0}")]
    Validation(String),
    /// The acting user may not perform this operation.
    #[error("{0}")]
    Unauthorized(String),
    /// Referenced entity does not exist (or is not visible to the client).
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database failure")]
    Database(#[from] DbErr),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Error::Database(err) = self {
            log::error!("database failure: {}", err);
        }
        let body = match self {
            Error::Database(_) | Error::Internal(_) => {
                "Something went wrong. Please try again later.".to_owned()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}
