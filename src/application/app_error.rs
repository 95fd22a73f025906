use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unattributable event: {0}")]
    Unattributable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    AuthenticationFailed,
    UnattributableEvent,
    InvalidInput,
    NotFound,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::UnattributableEvent => "UNATTRIBUTABLE_EVENT",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Determines if a webhook processing error should trigger a processor retry.
///
/// Returns `true` for transient failures, meaning we should answer 5xx so the
/// processor redelivers. Returns `false` for conditions that won't change on
/// retry, which are logged and acknowledged.
pub fn is_retryable_error(error: &AppError) -> bool {
    match error {
        // Transient errors - retry may succeed
        AppError::Database(_) => true,
        AppError::Internal(_) => true,

        // Expected conditions - won't change with retry
        AppError::Authentication(_) => false,
        AppError::Unattributable(_) => false,
        AppError::InvalidInput(_) => false,
        AppError::NotFound => false,
    }
}
