//! # Payment Processor Trait
//!
//! Strategy trait for the backends that actually charge a payment method.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProcessor (trait)                   │
//! │  ├── process()                                              │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┴─────────────────┐
//!          │                                   │
//!  ┌───────┴────────┐                 ┌────────┴────────┐
//!  │    Stripe      │                 │   Simulated     │
//!  │   Processor    │                 │   Processor     │
//!  └────────────────┘                 └─────────────────┘
//! ```
//!
//! A `PaymentRequest` never contains a raw account number, only the
//! `MaskedAccount` produced for the session.

use crate::cart::OrderTotals;
use crate::error::{PaymentError, PaymentResult};
use crate::masking::MaskedAccount;
use crate::product::Price;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Everything a backend needs to charge the customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Unique per submission; backends use it as an idempotency key
    pub submission_id: Uuid,

    /// Checkout session this submission belongs to
    pub session_id: Uuid,

    /// Selected payment method
    pub method_id: String,

    /// Provider-side token for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_token: Option<String>,

    /// Masked account, when the method has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<MaskedAccount>,

    /// Amounts; `totals.grand_total` is what gets charged
    pub totals: OrderTotals,

    /// Number of units in the cart
    pub item_count: u64,

    pub created_at: DateTime<Utc>,
}

impl PaymentRequest {
    /// The amount to charge
    pub fn amount(&self) -> Price {
        self.totals.grand_total
    }
}

/// Proof of a successful charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub submission_id: Uuid,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// Provider's transaction id
    pub transaction_id: String,

    /// Amount charged
    pub amount: Price,

    pub completed_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn new(
        request: &PaymentRequest,
        provider: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Self {
        Self {
            submission_id: request.submission_id,
            provider: provider.into(),
            transaction_id: transaction_id.into(),
            amount: request.amount(),
            completed_at: Utc::now(),
        }
    }
}

/// A payment-processing backend.
///
/// `process` may suspend for a network round trip; the checkout session
/// runs it off the caller's task and bounds it with a timeout.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charge `request.amount()` to the request's payment method.
    async fn process(&self, request: &PaymentRequest) -> PaymentResult<PaymentReceipt>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;

/// Routes payment methods to processors by provider name
#[derive(Clone)]
pub struct PaymentProcessorSelector {
    processors: HashMap<String, BoxedPaymentProcessor>,
    default_provider: String,
}

impl PaymentProcessorSelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            processors: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a processor
    pub fn register(&mut self, processor: BoxedPaymentProcessor) {
        let name = processor.provider_name().to_string();
        self.processors.insert(name, processor);
    }

    /// Register with builder pattern
    pub fn with_processor(mut self, processor: BoxedPaymentProcessor) -> Self {
        self.register(processor);
        self
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Get the default processor
    pub fn default_processor(&self) -> Option<&BoxedPaymentProcessor> {
        self.processors.get(&self.default_provider)
    }

    /// Get a processor by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentProcessor> {
        self.processors.get(provider)
    }

    /// Get processor or fall back to default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedPaymentProcessor> {
        match provider {
            Some(p) => self.get(p).or_else(|| self.default_processor()),
            None => self.default_processor(),
        }
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.processors.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for PaymentProcessorSelector {
    fn default() -> Self {
        Self::new(SimulatedProcessor::PROVIDER)
    }
}

/// Development backend that never leaves the process.
///
/// Waits `latency`, then declines any amount whose cents match
/// `decline_cents` and approves everything else.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    latency: Duration,
    decline_cents: Option<i64>,
}

impl SimulatedProcessor {
    pub const PROVIDER: &'static str = "simulated";

    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(150),
            decline_cents: Some(13),
        }
    }

    /// Builder: set the simulated network latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Builder: decline amounts whose cents equal `cents`; `None` approves all
    pub fn with_decline_cents(mut self, cents: Option<i64>) -> Self {
        self.decline_cents = cents;
        self
    }
}

impl Default for SimulatedProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedProcessor {
    #[instrument(skip(self, request), fields(submission_id = %request.submission_id))]
    async fn process(&self, request: &PaymentRequest) -> PaymentResult<PaymentReceipt> {
        let amount = request.amount();
        if amount.amount <= 0 {
            return Err(PaymentError::InvalidRequest(
                "Amount must be greater than zero".to_string(),
            ));
        }

        tokio::time::sleep(self.latency).await;

        if self.decline_cents == Some(amount.amount.rem_euclid(100)) {
            info!("Simulated decline for {}", amount.display());
            return Err(PaymentError::PaymentDeclined {
                reason: "card declined".to_string(),
            });
        }

        let transaction_id = format!("sim_{}", Uuid::new_v4().simple());
        info!("Simulated charge {} -> {}", amount.display(), transaction_id);
        Ok(PaymentReceipt::new(request, Self::PROVIDER, transaction_id))
    }

    fn provider_name(&self) -> &'static str {
        Self::PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Currency;

    fn request(grand_total_cents: i64) -> PaymentRequest {
        let shipping = Price::from_cents(1500, Currency::USD);
        PaymentRequest {
            submission_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            method_id: "visa".to_string(),
            processor_token: None,
            account: None,
            totals: OrderTotals::new(
                Price::from_cents(grand_total_cents - 1500, Currency::USD),
                shipping,
            ),
            item_count: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_processor_selector() {
        let selector = PaymentProcessorSelector::new("stripe")
            .with_processor(Arc::new(SimulatedProcessor::new()) as BoxedPaymentProcessor);

        assert_eq!(selector.providers(), vec!["simulated"]);
        assert_eq!(selector.default_provider(), "stripe");
        assert!(selector.default_processor().is_none());
        assert!(selector.get_or_default(Some("simulated")).is_some());
        assert!(selector.get_or_default(Some("paypal")).is_none());
    }

    #[test]
    fn test_selector_falls_back_to_default() {
        let selector = PaymentProcessorSelector::default()
            .with_processor(Arc::new(SimulatedProcessor::new()) as BoxedPaymentProcessor);

        let processor = selector.get_or_default(Some("paypal")).unwrap();
        assert_eq!(processor.provider_name(), "simulated");
        assert!(selector.get_or_default(None).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_processor_approves() {
        let processor = SimulatedProcessor::new();
        let request = request(11500);

        let receipt = processor.process(&request).await.unwrap();
        assert_eq!(receipt.amount, Price::new(115.0, Currency::USD));
        assert_eq!(receipt.submission_id, request.submission_id);
        assert!(receipt.transaction_id.starts_with("sim_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_processor_declines_pattern() {
        let processor = SimulatedProcessor::new();

        let err = processor.process(&request(11513)).await.unwrap_err();
        assert!(matches!(err, PaymentError::PaymentDeclined { .. }));

        let lenient = SimulatedProcessor::new().with_decline_cents(None);
        assert!(lenient.process(&request(11513)).await.is_ok());
    }
}
