//! Error types shared by the service layer and the HTTP API.

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Rejection of a state-machine transition on a clinical record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{entity} is {status} and can no longer change")]
    Terminal {
        entity: &'static str,
        status: String,
    },
    #[error("cannot {action} a {entity} that is {status}")]
    InvalidState {
        entity: &'static str,
        action: &'static str,
        status: String,
    },
    #[error("appointment time has already passed")]
    AppointmentInPast,
    #[error("appointment time has not been reached yet")]
    AppointmentNotStarted,
    #[error("a cancellation reason is required")]
    MissingReason,
    #[error("prescription has no item at index {0}")]
    UnknownItem(usize),
    #[error("at least one result is required to complete a lab request")]
    NoResults,
    #[error("invalid result row: {0}")]
    InvalidResult(String),
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    Transition(#[from] TransitionError),

    #[error("validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PortalError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code carried in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Transition(_) => "invalid_transition",
            PortalError::Validation(_) => "validation_failed",
            PortalError::BadRequest(_) => "bad_request",
            PortalError::Unauthorized(_) => "unauthorized",
            PortalError::Forbidden(_) => "forbidden",
            PortalError::NotFound { .. } => "not_found",
            PortalError::Conflict(_) => "conflict",
            PortalError::Internal(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, Vec<String>>,
}

fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Transition(_) | PortalError::Validation(_) | PortalError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let fields = match self {
            PortalError::Validation(errors) => field_messages(errors),
            _ => BTreeMap::new(),
        };
        // Internal details stay in the logs
        let message = match self {
            PortalError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code(),
            message,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            PortalError::from(TransitionError::MissingReason).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PortalError::not_found("appointment", "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PortalError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PortalError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn validation_errors_list_fields() {
        let errors = Form { name: String::new() }.validate().unwrap_err();
        let fields = field_messages(&errors);
        assert_eq!(fields["name"], vec!["name is required".to_string()]);
    }
}
