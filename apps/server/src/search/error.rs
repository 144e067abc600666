//! Errors raised by the search pipeline.

use std::collections::BTreeSet;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Every placeholder left unresolved, across the query and its options.
    #[error("Your request is missing parameters for the template: {}", join_names(.0))]
    MissingParameters(BTreeSet<String>),

    #[error("Search execution failed: {message}")]
    Execution {
        /// Status reported by the backend, when there was one.
        status: Option<u16>,
        message: String,
    },

    #[error("Search template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid search template: {0}")]
    InvalidTemplate(String),

    #[error("Search template is outside the search path: {0}")]
    Forbidden(String),

    #[error("Failed to write search results: {0}")]
    Write(String),

    #[error("Search configuration error: {0}")]
    Configuration(String),
}

impl SearchError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            status: None,
            message: message.into(),
        }
    }

    pub fn execution_with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Execution {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameters(_) => "missing_parameters",
            Self::Execution { .. } => "execution",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::InvalidTemplate(_) => "invalid_template",
            Self::Forbidden(_) => "forbidden",
            Self::Write(_) => "write",
            Self::Configuration(_) => "configuration",
        }
    }
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_lists_every_name() {
        let err = SearchError::MissingParameters(
            ["kind", "group"].iter().map(|s| s.to_string()).collect(),
        );
        assert_eq!(
            err.to_string(),
            "Your request is missing parameters for the template: group, kind"
        );
    }

    #[test]
    fn execution_keeps_backend_status() {
        let err = SearchError::execution_with_status(503, "backend unavailable");
        assert_eq!(
            err,
            SearchError::Execution {
                status: Some(503),
                message: "backend unavailable".to_string()
            }
        );
        assert_eq!(err.kind(), "execution");
    }
}
