//! Error types for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::search::SearchError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Search(err) => match err {
                SearchError::MissingParameters(_) => StatusCode::BAD_REQUEST,
                SearchError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
                SearchError::Forbidden(_) => StatusCode::FORBIDDEN,
                // Backend failures are never the caller's to correct.
                SearchError::Execution {
                    status: Some(code), ..
                } if *code >= 500 => {
                    StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
                SearchError::Execution { .. }
                | SearchError::InvalidTemplate(_)
                | SearchError::Write(_)
                | SearchError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ if status.is_server_error() => {
                tracing::error!(status = status.as_u16(), "Search failed: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "error": message,
        }));
        (status, body).into_response()
    }
}
