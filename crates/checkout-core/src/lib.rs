//! # checkout-core
//!
//! Checkout view state and payment submission for the storefront.
//!
//! This crate provides:
//! - `CartLoader` for the cart snapshot and its subtotal
//! - `PaymentMethodRegistry` for the payment methods and the selection
//! - `CheckoutStateMachine` for the screen-level checkout state
//! - `CheckoutSession` for the payment submission workflow
//! - `PaymentProcessor` trait for implementing payment backends
//! - `AccountMasker` for masking account numbers before they leave the session
//! - `PaymentError` and `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{CartItem, CheckoutConfig, CheckoutSession, PaymentProcessorSelector};
//!
//! let processors = PaymentProcessorSelector::default()
//!     .with_processor(Arc::new(SimulatedProcessor::new()));
//! let session = CheckoutSession::new(CheckoutConfig::from_env()?, processors);
//!
//! // Load payment methods and the cart
//! session.start(&methods).await?;
//! session.set_cart(vec![CartItem::new(runner, 2)]);
//!
//! // The customer picks a method and pays
//! session.select_method("visa")?;
//! let handle = session.submit_payment(
//!     |receipt| println!("paid {}", receipt.amount.display()),
//!     |err| eprintln!("{}", err),
//! )?;
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod host;
pub mod masking;
pub mod payment_method;
pub mod processor;
pub mod product;
pub mod session;
pub mod state;
pub mod view;

// Re-exports for convenience
pub use cart::{CartItem, CartLoader, CartSummary, OrderTotals};
pub use config::{CheckoutConfig, DeliveryAddress, MaskingConfig};
pub use error::{
    CheckoutError, CheckoutResult, Disposition, FailureReason, PaymentError, PaymentResult,
};
pub use host::{CheckoutHost, LoggingHost, Severity};
pub use masking::{mask_digits, AccountMasker, AccountNumber, InvalidAccountNumber, MaskedAccount};
pub use payment_method::{
    PaymentMethod, PaymentMethodRegistry, PaymentMethodSource, StaticPaymentMethods,
};
pub use processor::{
    BoxedPaymentProcessor, PaymentProcessor, PaymentProcessorSelector, PaymentReceipt,
    PaymentRequest, SimulatedProcessor,
};
pub use product::{Currency, Price, Product, ProductCatalog};
pub use session::{CheckoutSession, SubmissionHandle};
pub use state::{CheckoutState, CheckoutStateMachine};
pub use view::{CartLineView, CheckoutView, PaymentMethodView, TotalsView};
