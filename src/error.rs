//! Crate-wide error type.

use crate::checkpoint::SnapshotError;
use thiserror::Error;

/// Errors raised by allocation, lifecycle, archive and processor operations.
///
/// Every variant is raised before any state is mutated, so a failed call
/// leaves books, cheques and processors exactly as they were.
#[derive(Debug, Error)]
pub enum ChequeError {
    /// Malformed or out-of-range input, or a duplicate identifier.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The operation is not allowed in the current state.
    #[error("Cannot {operation} while in state '{state}': {reason}")]
    StateGuard {
        operation: String,
        state: String,
        reason: String,
    },

    #[error("Cheque book '{book}' has no remaining leaves")]
    Depleted { book: String },

    #[error("Cheque book '{book}' is not active (status: {status})")]
    Inactive { book: String, status: String },

    #[error("Cheque book '{book}' has already issued {issued} cheque(s)")]
    HasIssuedCheques { book: String, issued: u64 },

    #[error("Cheque {serial} has {count} ledger posting(s)")]
    HasPostings { serial: String, count: usize },

    /// A downstream ledger or payment processor failed.
    #[error("Processing failed: {message}")]
    Processing { message: String },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChequeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn guard(
        operation: impl Into<String>,
        state: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StateGuard {
            operation: operation.into(),
            state: state.into(),
            reason: reason.into(),
        }
    }

    /// Collapse accumulated validation messages into a single error.
    pub fn from_violations<I, T>(violations: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        let message = violations
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation { message }
    }
}

pub type Result<T> = std::result::Result<T, ChequeError>;
