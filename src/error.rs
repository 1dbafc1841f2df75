use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error taxonomy. Every user-visible failure maps onto one of
/// these variants so callers can branch on the category while still getting a
/// human-readable detail string.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request input, rejected before any external call is made.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested entity (or its backing file) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An upstream provider (OCR, LLM, TTS, STT) failed.
    #[error("{provider} request failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// A blob store call failed for a reason other than a missing key.
    #[error("blob store error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn provider(provider: &'static str, message: impl ToString) -> Self {
        Self::Provider {
            provider,
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
