use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrmError {
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl CrmError {
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::AccessDenied(_) => "access_denied",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::StorageFailure(_) => "storage_failure",
        }
    }

    /// Text shown to the caller. Storage details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::StorageFailure(_) => "The operation could not be completed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CrmError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.message(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            CrmError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            CrmError::access_denied("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(CrmError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CrmError::conflict("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CrmError::StorageFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_and_invalid_input_are_distinguishable() {
        let conflict = CrmError::conflict("contact already in origin");
        let invalid = CrmError::invalid("missing contact_id");
        assert_eq!(conflict.status_code(), invalid.status_code());
        assert_ne!(conflict.error_code(), invalid.error_code());
    }

    #[test]
    fn test_storage_failure_message_is_opaque() {
        let err = CrmError::StorageFailure("relation \"contacts\" does not exist".into());
        assert!(!err.message().contains("relation"));
    }
}
