//! # Checkout Error Types
//!
//! Two layers of typed errors:
//! - `PaymentError` for the payment backend and configuration
//! - `CheckoutError` for the checkout workflow itself
//!
//! Neither type ever carries a raw account number.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by payment backends, method sources and configuration
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Payment was declined
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// The provider did not answer in time
    #[error("Payment provider timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// The provider accepted the payment but has not settled it yet
    #[error("Payment {transaction_id} at {provider} is still {status}")]
    PendingConfirmation {
        provider: String,
        transaction_id: String,
        status: String,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::Timeout { .. }
                | PaymentError::RateLimited { .. }
                | PaymentError::ProviderError { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::PaymentDeclined { .. } => 402,
            PaymentError::Timeout { .. } => 504,
            PaymentError::RateLimited { .. } => 429,
            PaymentError::PendingConfirmation { .. } => 409,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }

    /// Convert into a reason that can be shown to the customer.
    ///
    /// Declines keep the provider's wording; everything else is replaced
    /// by a generic message so internal details never reach the screen.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            PaymentError::PaymentDeclined { reason } => {
                FailureReason::new("checkout.error.declined", reason.clone())
            }
            PaymentError::NetworkError(_) | PaymentError::Timeout { .. } => FailureReason::new(
                "checkout.error.unreachable",
                "We couldn't reach the payment service. Please try again.",
            ),
            PaymentError::ProviderError { .. } | PaymentError::RateLimited { .. } => {
                FailureReason::new(
                    "checkout.error.provider_unavailable",
                    "The payment service is unavailable right now. Please try again shortly.",
                )
            }
            PaymentError::PendingConfirmation { .. } => FailureReason::new(
                "checkout.error.pending",
                "Your payment is still being processed. Check your order status before paying again.",
            ),
            PaymentError::InvalidRequest(_) => FailureReason::new(
                "checkout.error.method_unusable",
                "This payment method can't be used for this order.",
            ),
            PaymentError::Configuration(_)
            | PaymentError::Internal(_)
            | PaymentError::Serialization(_) => FailureReason::new(
                "checkout.error.unexpected",
                "Something went wrong while processing your payment.",
            ),
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// A failure the customer can read.
///
/// `key` is an opaque localization key passed through untouched;
/// `message` is the default (English) text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub key: String,
    pub message: String,
}

impl FailureReason {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// How a front end should surface a `CheckoutError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log it; the customer never sees it
    Ignore,
    /// Show a toast-style message
    Toast,
}

/// Errors produced by the checkout workflow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Selected an id that is not in the registry (UI bug)
    #[error("Unknown payment method: {id}")]
    InvalidSelection { id: String },

    /// Tried to pay without choosing a payment method
    #[error("Please choose a payment method")]
    NoMethodSelected,

    /// A payment is already being processed for this session
    #[error("A payment is already in progress")]
    AlreadyInProgress,

    /// The session already completed a payment
    #[error("This checkout has already been paid")]
    AlreadyCompleted,

    /// Nothing to pay for
    #[error("Your cart is empty")]
    EmptyCart,

    /// The backend rejected the payment or could not be reached
    #[error("{0}")]
    PaymentProcessingFailed(FailureReason),
}

impl CheckoutError {
    pub fn disposition(&self) -> Disposition {
        match self {
            CheckoutError::InvalidSelection { .. }
            | CheckoutError::AlreadyInProgress
            | CheckoutError::AlreadyCompleted => Disposition::Ignore,
            CheckoutError::NoMethodSelected
            | CheckoutError::EmptyCart
            | CheckoutError::PaymentProcessingFailed(_) => Disposition::Toast,
        }
    }

    /// Localization key for the message shown to the customer
    pub fn message_key(&self) -> &str {
        match self {
            CheckoutError::InvalidSelection { .. } => "checkout.error.invalid_selection",
            CheckoutError::NoMethodSelected => "checkout.error.no_method_selected",
            CheckoutError::AlreadyInProgress => "checkout.error.in_progress",
            CheckoutError::AlreadyCompleted => "checkout.error.completed",
            CheckoutError::EmptyCart => "checkout.error.empty_cart",
            CheckoutError::PaymentProcessingFailed(reason) => &reason.key,
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::InvalidSelection { .. } => 404,
            CheckoutError::NoMethodSelected | CheckoutError::EmptyCart => 400,
            CheckoutError::AlreadyInProgress | CheckoutError::AlreadyCompleted => 409,
            CheckoutError::PaymentProcessingFailed(_) => 402,
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        CheckoutError::PaymentProcessingFailed(err.failure_reason())
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::NetworkError("timeout".into()).is_retryable());
        assert!(PaymentError::Timeout { secs: 30 }.is_retryable());
        assert!(PaymentError::RateLimited {
            provider: "stripe".into(),
            retry_after_secs: 60
        }
        .is_retryable());
        assert!(!PaymentError::PaymentDeclined {
            reason: "card declined".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_pending_payment_is_not_retryable() {
        let err = PaymentError::PendingConfirmation {
            provider: "stripe".into(),
            transaction_id: "pi_789".into(),
            status: "processing".into(),
        };

        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 409);
        let reason = err.failure_reason();
        assert_eq!(reason.key, "checkout.error.pending");
        assert!(!reason.message.contains("pi_789"));
    }

    #[test]
    fn test_declines_keep_provider_wording() {
        let reason = PaymentError::PaymentDeclined {
            reason: "card declined".into(),
        }
        .failure_reason();

        assert_eq!(reason.message(), "card declined");
        assert_eq!(reason.key, "checkout.error.declined");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let reason = PaymentError::Internal("task 42 panicked at processor.rs:17".into())
            .failure_reason();

        assert!(!reason.message.contains("panicked"));
        assert_eq!(reason.key, "checkout.error.unexpected");

        let reason = PaymentError::NetworkError("connection reset by peer".into()).failure_reason();
        assert!(!reason.message.contains("reset"));
    }

    #[test]
    fn test_checkout_error_disposition() {
        assert_eq!(
            CheckoutError::InvalidSelection { id: "x".into() }.disposition(),
            Disposition::Ignore
        );
        assert_eq!(CheckoutError::AlreadyInProgress.disposition(), Disposition::Ignore);
        assert_eq!(CheckoutError::NoMethodSelected.disposition(), Disposition::Toast);
        assert_eq!(
            CheckoutError::from(PaymentError::PaymentDeclined {
                reason: "card declined".into()
            })
            .disposition(),
            Disposition::Toast
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CheckoutError::NoMethodSelected.status_code(), 400);
        assert_eq!(CheckoutError::AlreadyInProgress.status_code(), 409);
        assert_eq!(PaymentError::Timeout { secs: 5 }.status_code(), 504);
    }
}
