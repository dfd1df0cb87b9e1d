//! # Checkout Configuration
//!
//! Session settings loaded from environment variables or a TOML document.

use crate::error::PaymentError;
use crate::masking::{AccountMasker, DEFAULT_MASK_CHAR, DEFAULT_VISIBLE_DIGITS};
use crate::product::{Currency, Price};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Flat shipping fee in the smallest currency unit ($15.00)
pub const DEFAULT_SHIPPING_FEE_CENTS: i64 = 1500;

/// Largest flat shipping fee accepted, in the smallest currency unit
pub const MAX_SHIPPING_FEE_CENTS: i64 = 10_000_000;

/// How long a payment backend may take before the submission fails
pub const DEFAULT_PROCESSOR_TIMEOUT_SECS: u64 = 30;

/// Address shown in the delivery summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    /// Street line (e.g., "AlTaif 51, st 5")
    pub address: String,
    /// City line (e.g., "Khartoum, Sudan")
    pub city: String,
}

/// Account masking settings
#[derive(Clone, Serialize, Deserialize)]
pub struct MaskingConfig {
    #[serde(default = "default_visible_digits")]
    pub visible_digits: usize,

    #[serde(default = "default_mask_char")]
    pub mask_char: char,

    /// HMAC key for account fingerprints; random per session when unset
    #[serde(default, skip_serializing)]
    pub key: Option<String>,
}

fn default_visible_digits() -> usize {
    DEFAULT_VISIBLE_DIGITS
}

fn default_mask_char() -> char {
    DEFAULT_MASK_CHAR
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            visible_digits: DEFAULT_VISIBLE_DIGITS,
            mask_char: DEFAULT_MASK_CHAR,
            key: None,
        }
    }
}

impl std::fmt::Debug for MaskingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingConfig")
            .field("visible_digits", &self.visible_digits)
            .field("mask_char", &self.mask_char)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl MaskingConfig {
    /// Build the masker for a session
    pub fn masker(&self) -> AccountMasker {
        let key = self
            .key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        AccountMasker::new(key)
            .with_visible_digits(self.visible_digits)
            .with_mask_char(self.mask_char)
    }
}

/// Checkout session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Currency the session charges in
    #[serde(default)]
    pub currency: Currency,

    /// Flat shipping fee in the smallest currency unit
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee_cents: i64,

    /// Upper bound on one payment backend call
    #[serde(default = "default_processor_timeout")]
    pub processor_timeout_secs: u64,

    #[serde(default)]
    pub masking: MaskingConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<DeliveryAddress>,
}

fn default_shipping_fee() -> i64 {
    DEFAULT_SHIPPING_FEE_CENTS
}

fn default_processor_timeout() -> u64 {
    DEFAULT_PROCESSOR_TIMEOUT_SECS
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            shipping_fee_cents: DEFAULT_SHIPPING_FEE_CENTS,
            processor_timeout_secs: DEFAULT_PROCESSOR_TIMEOUT_SECS,
            masking: MaskingConfig::default(),
            delivery_address: None,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `CHECKOUT_CURRENCY` (ISO code, default `usd`)
    /// - `CHECKOUT_SHIPPING_FEE` (decimal, default `15.00`)
    /// - `CHECKOUT_PROCESSOR_TIMEOUT_SECS` (default `30`)
    /// - `CHECKOUT_MASKING_KEY`
    /// - `CHECKOUT_DELIVERY_ADDRESS` and `CHECKOUT_DELIVERY_CITY`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut config = Self::default();

        if let Ok(code) = env::var("CHECKOUT_CURRENCY") {
            config.currency = Currency::from_code(&code).ok_or_else(|| {
                PaymentError::Configuration(format!("Unsupported CHECKOUT_CURRENCY: {}", code))
            })?;
        }

        if let Ok(fee) = env::var("CHECKOUT_SHIPPING_FEE") {
            config.shipping_fee_cents = parse_shipping_fee(&fee, config.currency)?;
        }

        if let Ok(secs) = env::var("CHECKOUT_PROCESSOR_TIMEOUT_SECS") {
            config.processor_timeout_secs = secs.trim().parse().map_err(|_| {
                PaymentError::Configuration(format!(
                    "Invalid CHECKOUT_PROCESSOR_TIMEOUT_SECS: {}",
                    secs
                ))
            })?;
        }

        config.masking.key = env::var("CHECKOUT_MASKING_KEY").ok();

        if let (Ok(address), Ok(city)) = (
            env::var("CHECKOUT_DELIVERY_ADDRESS"),
            env::var("CHECKOUT_DELIVERY_CITY"),
        ) {
            config.delivery_address = Some(DeliveryAddress { address, city });
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PaymentError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| PaymentError::Configuration(format!("Invalid checkout config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PaymentError> {
        if self.shipping_fee_cents < 0 {
            return Err(PaymentError::Configuration(
                "Shipping fee cannot be negative".to_string(),
            ));
        }
        if self.shipping_fee_cents > MAX_SHIPPING_FEE_CENTS {
            return Err(PaymentError::Configuration(format!(
                "Shipping fee cannot exceed {} minor units",
                MAX_SHIPPING_FEE_CENTS
            )));
        }
        if self.processor_timeout_secs == 0 {
            return Err(PaymentError::Configuration(
                "Processor timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// The flat shipping fee as a price
    pub fn shipping_fee(&self) -> Price {
        Price::from_cents(self.shipping_fee_cents, self.currency)
    }

    pub fn processor_timeout(&self) -> Duration {
        Duration::from_secs(self.processor_timeout_secs)
    }

    /// Builder: set the flat shipping fee
    pub fn with_shipping_fee(mut self, fee: Price) -> Self {
        self.currency = fee.currency;
        self.shipping_fee_cents = fee.amount;
        self
    }

    /// Builder: set the backend timeout
    pub fn with_processor_timeout(mut self, timeout: Duration) -> Self {
        self.processor_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Builder: set the fingerprint key
    pub fn with_masking_key(mut self, key: impl Into<String>) -> Self {
        self.masking.key = Some(key.into());
        self
    }

    /// Builder: set the delivery address shown with the order
    pub fn with_delivery_address(
        mut self,
        address: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        self.delivery_address = Some(DeliveryAddress {
            address: address.into(),
            city: city.into(),
        });
        self
    }
}

/// Parse a decimal shipping fee such as `15.00` into minor units
fn parse_shipping_fee(raw: &str, currency: Currency) -> Result<i64, PaymentError> {
    let invalid = || PaymentError::Configuration(format!("Invalid CHECKOUT_SHIPPING_FEE: {}", raw));

    let amount: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }

    let cents = currency.to_smallest_unit(amount);
    if cents > MAX_SHIPPING_FEE_CENTS {
        return Err(invalid());
    }
    Ok(cents)
}
