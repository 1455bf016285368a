use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

/// Error body returned by every rejected API request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "code": "quantity_mismatch",
    "message": "Quantity mismatch: breakdown quantities sum to 45 but sales order 7 has quantity 50",
    "timestamp": "2026-10-18T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category
    pub error: String,
    /// Machine-readable rule identifier
    pub code: String,
    /// Human-readable description of the rule that failed
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: cannot move {entity} from '{from}' to '{to}'")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Quantity mismatch: {0}")]
    QuantityMismatch(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        ServiceError::InvalidStateTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        ServiceError::MissingRequiredField(field.into())
    }

    /// Claim races and lost status races are expected under concurrent
    /// operators; the caller should re-fetch and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyClaimed(_) | Self::ConcurrentModification(_)
        )
    }

    /// Stable identifier of the rule that failed.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::QuantityMismatch(_) => "quantity_mismatch",
            Self::MissingRequiredField(_) => "missing_required_field",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::ValidationError(_) => "validation_error",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::DatabaseError(_) => "database_error",
            Self::SerializationError(_) => "serialization_error",
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidStateTransition { .. }
            | Self::MissingRequiredField(_)
            | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::QuantityMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyClaimed(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        } else if self.is_recoverable() {
            info!(code = self.code(), "Request lost a race: {}", self);
        }
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::invalid_transition("purchase order 1", "shipped", "ordered")
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::QuantityMismatch("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::AlreadyClaimed("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rule_failures_name_the_rule() {
        let err = ServiceError::invalid_transition("purchase order 12", "shipped", "ordered");
        assert_eq!(
            err.response_message(),
            "Invalid state transition: cannot move purchase order 12 from 'shipped' to 'ordered'"
        );
        assert_eq!(err.code(), "invalid_state_transition");
    }

    #[test]
    fn internal_errors_hide_details() {
        assert_eq!(
            ServiceError::SerializationError("bad field map".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("pool exhausted".into())).response_message(),
            "Database error"
        );
    }

    #[test]
    fn only_races_are_recoverable() {
        assert!(ServiceError::AlreadyClaimed("x".into()).is_recoverable());
        assert!(ServiceError::ConcurrentModification("x".into()).is_recoverable());
        assert!(!ServiceError::QuantityMismatch("x".into()).is_recoverable());
        assert!(!ServiceError::NotFound("x".into()).is_recoverable());
    }

    #[tokio::test]
    async fn error_response_carries_code() {
        let response = ServiceError::AlreadyClaimed("receiving 4 already inspected".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "already_claimed");
        assert_eq!(payload.error, "Conflict");
    }
}
