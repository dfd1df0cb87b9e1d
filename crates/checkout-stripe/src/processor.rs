//! # Stripe PaymentIntents
//!
//! Charges the selected payment method by creating and confirming a
//! PaymentIntent in one call.

use crate::config::StripeConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkout_core::{PaymentError, PaymentProcessor, PaymentReceipt, PaymentRequest, PaymentResult};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "stripe";

/// Stripe PaymentIntents processor
pub struct StripeProcessor {
    config: StripeConfig,
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe processor
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Form parameters for a create-and-confirm PaymentIntent call
    fn build_form(request: &PaymentRequest, token: &str) -> Vec<(String, String)> {
        let amount = request.amount();
        let mut form_params: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.amount.to_string()),
            ("currency".to_string(), amount.currency.as_str().to_string()),
            ("payment_method".to_string(), token.to_string()),
            ("confirm".to_string(), "true".to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            (
                "automatic_payment_methods[allow_redirects]".to_string(),
                "never".to_string(),
            ),
            (
                "metadata[submission_id]".to_string(),
                request.submission_id.to_string(),
            ),
            (
                "metadata[session_id]".to_string(),
                request.session_id.to_string(),
            ),
            ("metadata[method_id]".to_string(), request.method_id.clone()),
        ];

        if let Some(ref account) = request.account {
            form_params.push((
                "metadata[account_last_digits]".to_string(),
                account.last_digits.clone(),
            ));
            form_params.push((
                "metadata[account_fingerprint]".to_string(),
                account.fingerprint.clone(),
            ));
        }

        form_params
    }

    /// Map a non-2xx Stripe response to a payment error
    fn error_from_response(status: StatusCode, retry_after: Option<u64>, body: &str) -> PaymentError {
        let parsed = serde_json::from_str::<StripeErrorResponse>(body).ok();

        match status {
            StatusCode::PAYMENT_REQUIRED => {
                let reason = parsed
                    .and_then(|r| r.error.message)
                    .unwrap_or_else(|| "card declined".to_string());
                PaymentError::PaymentDeclined { reason }
            }
            StatusCode::TOO_MANY_REQUESTS => PaymentError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after_secs: retry_after.unwrap_or(1),
            },
            _ => {
                let message = match parsed.and_then(|r| r.error.message) {
                    Some(message) => message,
                    None => format!("HTTP {}: {}", status, body),
                };
                PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message,
                }
            }
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    #[instrument(skip(self, request), fields(submission_id = %request.submission_id))]
    async fn process(&self, request: &PaymentRequest) -> PaymentResult<PaymentReceipt> {
        let token = request.processor_token.as_deref().ok_or_else(|| {
            PaymentError::InvalidRequest(format!(
                "Payment method {} has no Stripe token",
                request.method_id
            ))
        })?;

        let amount = request.amount();
        if amount.amount <= 0 {
            return Err(PaymentError::InvalidRequest(
                "Amount must be greater than zero".to_string(),
            ));
        }

        debug!("Creating Stripe PaymentIntent for {}", amount.display());

        let form_params = Self::build_form(request, token);
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", request.submission_id.to_string())
            .form(&form_params)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            let err = Self::error_from_response(status, retry_after, &body);
            match &err {
                PaymentError::PaymentDeclined { .. } => warn!("Stripe declined payment: {}", err),
                _ => error!("Stripe API error: status={}, body={}", status, body),
            }
            return Err(err);
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        match intent.status.as_str() {
            "succeeded" => {}
            // The charge may still settle; a fresh attempt would create a second intent
            "processing" | "requires_capture" => {
                warn!("Stripe PaymentIntent {} is {}", intent.id, intent.status);
                return Err(PaymentError::PendingConfirmation {
                    provider: PROVIDER.to_string(),
                    transaction_id: intent.id,
                    status: intent.status,
                });
            }
            _ => {
                let reason = intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| format!("payment {}", intent.status.replace('_', " ")));
                warn!("Stripe PaymentIntent {} ended as {}", intent.id, intent.status);
                return Err(PaymentError::PaymentDeclined { reason });
            }
        }

        info!("Stripe PaymentIntent succeeded: id={}", intent.id);

        let mut receipt = PaymentReceipt::new(request, PROVIDER, intent.id);
        if let Some(created) = intent.created.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
            receipt.completed_at = created;
        }
        Ok(receipt)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    status: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    last_payment_error: Option<StripeError>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
}
