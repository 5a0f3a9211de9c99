use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::Serialize;

/// Failure taxonomy shared by every service operation.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "An account with this email already exists.")]
    DuplicateEmail,

    #[display(fmt = "You are already checked in. Check out before checking in again.")]
    AlreadyClockedIn,

    /// Deliberately generic so callers cannot probe for registered emails.
    #[display(fmt = "Invalid credentials.")]
    AuthenticationFailure,

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "Storage error: {}", _0)]
    Storage(String),
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Message safe to hand to the presentation layer.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::DuplicateEmail | ServiceError::AlreadyClockedIn => StatusCode::CONFLICT,
            ServiceError::AuthenticationFailure | ServiceError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ServiceError::Storage(detail) = self {
            tracing::error!(error = %detail, "Responding with storage failure");
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::failure(self.public_message()))
    }
}

/// Errors raised by a persistence backend.
#[derive(Debug, Display)]
pub enum StoreError {
    /// A uniqueness rule (email, single open entry) rejected the write.
    #[display(fmt = "unique constraint violated")]
    Duplicate,

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        // Duplicate is context dependent; services map it before it gets here.
        tracing::error!(error = %e, "Storage operation failed");
        ServiceError::Storage(e.to_string())
    }
}

/// `{success, data|message}` envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_exposed() {
        let err = ServiceError::Storage("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ServiceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServiceError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(ServiceError::AlreadyClockedIn.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::AuthenticationFailure.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("owner only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(ApiResponse::ok(5)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 5}));

        let body = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "message": "nope"}));
    }
}
