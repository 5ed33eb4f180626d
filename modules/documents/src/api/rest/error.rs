use http::StatusCode;

use super::problem::Problem;
use crate::domain::error::DomainError;

/// Convert domain errors to HTTP problem responses.
///
/// Not-found bodies are constant so that a missing document and someone
/// else's document produce identical responses. Server-side failures share
/// one body; their details only reach the logs.
#[must_use]
pub fn domain_error_to_problem(err: DomainError) -> Problem {
    match err {
        DomainError::NotAuthenticated => Problem::unauthorized(),

        DomainError::NotFound => Problem::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            "Document not found",
        ),

        DomainError::Validation { field, message } => Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation Error",
            format!("{field}: {message}"),
        ),

        DomainError::BindingFailure(e) => {
            tracing::error!(error = %e, "session binding failed");
            Problem::internal()
        }

        DomainError::InconsistentEnforcement => {
            tracing::error!("enforcement layers disagreed");
            Problem::internal()
        }

        DomainError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            Problem::internal()
        }
    }
}

impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(e)
    }
}
