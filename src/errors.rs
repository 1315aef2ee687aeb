use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in code that uses `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

// Every error body uses the API envelope: {"success": false, "error": "..."}.
impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"success": false, "error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"success": false, "error": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"success": false, "error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"success": false, "error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"success": false, "error": m})),
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"success": false, "error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"success": false, "error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => {
        HttpResponse::InternalServerError().json(json!({"success": false, "error": "Database operation failed"}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"success": false, "error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// True when a sqlx error is a unique-constraint violation, which the
/// number-allocation retry loops treat as "regenerate and try again".
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
