//! Error types for Libris server

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Field name -> messages, as surfaced to clients on validation failures
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for e in errs {
                // Struct-level checks report under `__all__`; their code names the field
                let name = if field == "__all__" { e.code.to_string() } else { field.to_string() };
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid ({}).", name, e.code));
                fields.entry(name).or_default().push(message);
            }
        }
        AppError::Validation(fields)
    }
}

/// How a database failure is reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorClass {
    /// Server unreachable, authentication refused, unknown database (503)
    Connection,
    /// Constraint violation, undefined table/column, syntax error (400)
    Query,
    /// Anything else (500)
    Other,
}

/// Classify a PostgreSQL SQLSTATE code
pub fn classify_sqlstate(code: &str) -> DbErrorClass {
    if code.starts_with("08") || code.starts_with("28") || code.starts_with("57P") || code == "3D000" {
        DbErrorClass::Connection
    } else if code.starts_with("23") || code.starts_with("42") {
        DbErrorClass::Query
    } else {
        DbErrorClass::Other
    }
}

pub fn classify_db_error(error: &sqlx::Error) -> DbErrorClass {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => DbErrorClass::Connection,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| classify_sqlstate(&code))
            .unwrap_or(DbErrorClass::Other),
        _ => DbErrorClass::Other,
    }
}

/// Error response body, same envelope as successful responses
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub status: String,
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Authentication(msg) => {
                tracing::debug!("Authentication failure: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::Authorization(msg) => {
                tracing::warn!("Authorization failure: {}", msg);
                (StatusCode::FORBIDDEN, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BusinessRule(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string())
            }
            AppError::Database(e) => match classify_db_error(e) {
                DbErrorClass::Connection => {
                    tracing::error!("Database connection issue: {:?}", e);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Database connection failed".to_string(),
                    )
                }
                DbErrorClass::Query => {
                    tracing::error!("Database query issue: {:?}", e);
                    (
                        StatusCode::BAD_REQUEST,
                        "Database query error occurred".to_string(),
                    )
                }
                DbErrorClass::Other => {
                    tracing::error!("Unhandled database error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database error occurred".to_string(),
                    )
                }
            },
            AppError::Cache(e) => {
                tracing::error!("Redis error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let errors = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            data: None,
            errors,
            status: status.as_u16().to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_sqlstate_classes() {
        assert_eq!(classify_sqlstate("08006"), DbErrorClass::Connection);
        assert_eq!(classify_sqlstate("28P01"), DbErrorClass::Connection);
        assert_eq!(classify_sqlstate("3D000"), DbErrorClass::Connection);
        assert_eq!(classify_sqlstate("23505"), DbErrorClass::Query);
        assert_eq!(classify_sqlstate("23503"), DbErrorClass::Query);
        assert_eq!(classify_sqlstate("42P01"), DbErrorClass::Query);
        assert_eq!(classify_sqlstate("40001"), DbErrorClass::Other);
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unavailable("x".into()), StatusCode::BAD_REQUEST),
            (AppError::BusinessRule("x".into()), StatusCode::BAD_REQUEST),
            (AppError::field("isbn", "taken"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Database(sqlx::Error::PoolTimedOut), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Database(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let (_, message) = AppError::Internal("secret detail".into()).status_and_message();
        assert_eq!(message, "Server error");
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "The name field is required."))]
        name: String,
        #[validate(range(min = 0))]
        count: i32,
    }

    #[test]
    fn test_validation_errors_keep_field_names() {
        let sample = Sample { name: String::new(), count: -1 };
        let err: AppError = sample.validate().unwrap_err().into();

        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields["name"], vec!["The name field is required.".to_string()]);
                assert!(fields["count"][0].contains("count"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
