//! Core error types for the valuation engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::ParseError as ChronoParseError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::orders::OrderStatus;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
///
/// The first six variants form the stable domain taxonomy. They are terminal,
/// non-retryable validation or state errors: the caller must change the request.
/// Database errors come from the persistence collaborator and are propagated
/// unchanged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Currency mismatch: {left} cannot be combined with {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Invalid portfolio adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Cannot {action} {entity_id} while it is {status}")]
    InvalidOrderState {
        entity_id: String,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Insufficient holding: requested {requested} but only {held} held")]
    InsufficientHolding { held: Decimal, requested: Decimal },

    #[error("Portfolio {portfolio_id} still holds {position_count} position(s)")]
    PortfolioNotEmpty {
        portfolio_id: String,
        position_count: usize,
    },

    #[error("Currency '{0}' is not supported")]
    UnsupportedCurrency(String),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Stable machine-readable code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Error::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Error::InvalidAdjustment(_) => "INVALID_ADJUSTMENT",
            Error::InvalidOrderState { .. } => "INVALID_ORDER_STATE",
            Error::InvalidQuantity(_) => "INVALID_QUANTITY",
            Error::InsufficientHolding { .. } => "INSUFFICIENT_HOLDING",
            Error::PortfolioNotEmpty { .. } => "PORTFOLIO_NOT_EMPTY",
            Error::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Error::Validation(_) => "VALIDATION",
            Error::Database(DatabaseError::NotFound(_)) => "NOT_FOUND",
            Error::Database(_) => "DATABASE",
            Error::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// True for validation and state errors that must not be retried as-is.
    pub fn is_domain_error(&self) -> bool {
        !matches!(self, Error::Database(_) | Error::Unexpected(_))
    }

    pub(crate) fn currency_mismatch(left: impl ToString, right: impl ToString) -> Self {
        Error::CurrencyMismatch {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(message.into()))
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Error::Database(DatabaseError::NotFound(message.into()))
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_domain_codes_are_stable() {
        assert_eq!(
            Error::currency_mismatch("USD", "EUR").code(),
            "CURRENCY_MISMATCH"
        );
        assert_eq!(
            Error::InvalidAdjustment("x".to_string()).code(),
            "INVALID_ADJUSTMENT"
        );
        assert_eq!(
            Error::InvalidOrderState {
                entity_id: "o1".to_string(),
                status: OrderStatus::Active,
                action: "approve",
            }
            .code(),
            "INVALID_ORDER_STATE"
        );
        assert_eq!(
            Error::InvalidQuantity("0".to_string()).code(),
            "INVALID_QUANTITY"
        );
        assert_eq!(
            Error::InsufficientHolding {
                held: dec!(1),
                requested: dec!(2),
            }
            .code(),
            "INSUFFICIENT_HOLDING"
        );
        assert_eq!(
            Error::PortfolioNotEmpty {
                portfolio_id: "p1".to_string(),
                position_count: 3,
            }
            .code(),
            "PORTFOLIO_NOT_EMPTY"
        );
    }

    #[test]
    fn test_database_errors_are_not_domain_errors() {
        assert!(!Error::not_found("order o1").is_domain_error());
        assert_eq!(Error::not_found("order o1").code(), "NOT_FOUND");
        assert!(!Error::Unexpected("boom".to_string()).is_domain_error());
        assert!(Error::InvalidQuantity("0".to_string()).is_domain_error());
    }

    #[test]
    fn test_invalid_order_state_message_names_the_status() {
        let err = Error::InvalidOrderState {
            entity_id: "order-7".to_string(),
            status: OrderStatus::Cancelled,
            action: "approve",
        };
        assert_eq!(err.to_string(), "Cannot approve order-7 while it is CANCELLED");
    }
}
