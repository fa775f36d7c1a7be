//! Unified error types for the bus pass service.
//!
//! Guard denials and verification failures are ordinary values in their own modules;
//! they only become an [`Error`] when a caller has to abort the request because of them.

use crate::core::payment_guard::DenyReason;
use thiserror::Error;

/// All errors surfaced by the library and the HTTP service.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The underlying store failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, listener socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request field is missing or malformed
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What is wrong with the input
        message: String,
    },

    /// Caller lacks the administrator claim required for the action
    #[error("Permission denied: '{action}' requires an administrator")]
    PermissionDenied {
        /// The attempted action
        action: String,
    },

    /// Academic year string does not have the `YYYY-YYYY` shape
    #[error("Invalid academic year '{input}': {message}")]
    InvalidAcademicYear {
        /// The raw input as received
        input: String,
        /// Why it was rejected
        message: String,
    },

    /// No current academic year has been configured yet
    #[error("No current academic year is set")]
    AcademicYearNotSet,

    /// Amount was negative, non-finite, or inconsistent with a stage's fees
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },

    /// Payment mode and installment type do not form a valid request
    #[error("Invalid payment request: {message}")]
    InvalidPaymentRequest {
        /// Why the request is malformed
        message: String,
    },

    /// The payment-progression guard refused the request
    #[error("Payment denied: {reason}")]
    PaymentDenied {
        /// Specific denial reason
        reason: DenyReason,
    },

    /// A payment record was asked to move to a status it cannot reach
    #[error("Payment {payment_id} cannot move from '{from}' to '{to}'")]
    InvalidPaymentTransition {
        /// The payment id
        payment_id: i64,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Payment record does not exist
    #[error("Payment not found: {payment_id}")]
    PaymentNotFound {
        /// The missing payment id
        payment_id: i64,
    },

    /// Student profile does not exist
    #[error("Student not found: {student_id}")]
    StudentNotFound {
        /// The missing student id
        student_id: String,
    },

    /// A student with this id is already registered
    #[error("Student already registered: {student_id}")]
    StudentExists {
        /// The duplicate student id
        student_id: String,
    },

    /// Stage (fare zone) does not exist
    #[error("Stage not found: {name}")]
    StageNotFound {
        /// The missing stage name
        name: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
