//! # checkout-stripe
//!
//! Stripe payment processor for checkout sessions.
//!
//! `StripeProcessor` charges a payment method through the PaymentIntents
//! API, creating and confirming the intent in a single call. The
//! submission id is sent as the idempotency key, so a repeated call for
//! the same submission never charges twice.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_core::{CheckoutConfig, CheckoutSession, PaymentProcessorSelector};
//! use checkout_stripe::StripeProcessor;
//!
//! // Create processor from environment
//! let stripe = StripeProcessor::from_env()?;
//!
//! let processors = PaymentProcessorSelector::new("stripe")
//!     .with_processor(Arc::new(stripe));
//! let session = CheckoutSession::new(CheckoutConfig::from_env()?, processors);
//! ```

pub mod config;
pub mod processor;

// Re-exports
pub use config::StripeConfig;
pub use processor::StripeProcessor;
