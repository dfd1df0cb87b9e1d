//! # Application State
//!
//! Shared state for the Axum application: the checkout session it serves,
//! the product catalog used to resolve carts, and configuration.

use checkout_core::{
    BoxedPaymentProcessor, CheckoutConfig, CheckoutSession, PaymentMethodSource,
    PaymentProcessorSelector, ProductCatalog, SimulatedProcessor, StaticPaymentMethods,
};
use checkout_stripe::StripeProcessor;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Product catalog TOML; searched under `config/` when unset
    pub catalog_path: Option<String>,
    /// Payment methods TOML; searched under `config/` when unset
    pub payment_methods_path: Option<String>,
    /// Checkout settings TOML; `CHECKOUT_*` variables are used when none is found
    pub checkout_config_path: Option<String>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            catalog_path: std::env::var("CATALOG_PATH").ok(),
            payment_methods_path: std::env::var("PAYMENT_METHODS_PATH").ok(),
            checkout_config_path: std::env::var("CHECKOUT_CONFIG_PATH").ok(),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The checkout session served by this process
    pub session: CheckoutSession,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment and the `config/` directory
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let checkout = load_checkout_config(config.checkout_config_path.as_deref())?;
        let catalog = load_product_catalog(config.catalog_path.as_deref())?;
        let methods = load_payment_methods(config.payment_methods_path.as_deref())?;
        let processors = build_processors()?;

        Self::with_parts(config, checkout, catalog, processors, &methods).await
    }

    /// Build state from explicit parts
    pub async fn with_parts(
        config: AppConfig,
        checkout: CheckoutConfig,
        catalog: ProductCatalog,
        processors: PaymentProcessorSelector,
        methods: &dyn PaymentMethodSource,
    ) -> anyhow::Result<Self> {
        let session = CheckoutSession::new(checkout, processors);
        let loaded = session
            .start(methods)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load payment methods: {}", e))?;
        info!("Payment methods loaded: {}", loaded.len());

        Ok(Self {
            session,
            catalog: Arc::new(catalog),
            config,
        })
    }
}

/// Stripe when `STRIPE_SECRET_KEY` is set; the simulated backend is always
/// registered for methods that name it.
fn build_processors() -> anyhow::Result<PaymentProcessorSelector> {
    let simulated: BoxedPaymentProcessor = Arc::new(SimulatedProcessor::new());

    let selector = if std::env::var("STRIPE_SECRET_KEY").is_ok() {
        let stripe = StripeProcessor::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        PaymentProcessorSelector::new("stripe")
            .with_processor(Arc::new(stripe))
            .with_processor(simulated)
    } else {
        warn!("STRIPE_SECRET_KEY not set, payments go to the simulated backend");
        PaymentProcessorSelector::default().with_processor(simulated)
    };

    info!(
        "Payment processors: {} (default: {})",
        describe_providers(&selector),
        selector.default_provider()
    );
    Ok(selector)
}

fn describe_providers(selector: &PaymentProcessorSelector) -> String {
    let mut providers = selector.providers();
    providers.sort_unstable();
    providers.join(", ")
}

/// Read the first TOML file found among the candidates
fn read_config_file(explicit: Option<&str>, file_name: &str) -> anyhow::Result<Option<(String, String)>> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
        return Ok(Some((path.to_string(), content)));
    }

    let candidates = [
        format!("config/{}", file_name),
        format!("../config/{}", file_name),
        format!("../../config/{}", file_name),
    ];
    for path in candidates {
        if let Ok(content) = std::fs::read_to_string(&path) {
            return Ok(Some((path, content)));
        }
    }
    Ok(None)
}

/// Load checkout settings from config file, falling back to the environment
fn load_checkout_config(explicit: Option<&str>) -> anyhow::Result<CheckoutConfig> {
    let config = match read_config_file(explicit, "checkout.toml")? {
        Some((path, content)) => {
            let config = CheckoutConfig::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded checkout settings from {}", path);
            config
        }
        None => CheckoutConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Invalid checkout configuration: {}", e))?,
    };

    match std::env::var("CHECKOUT_MASKING_KEY") {
        Ok(key) => Ok(config.with_masking_key(key)),
        Err(_) => Ok(config),
    }
}

/// Load product catalog from config file
fn load_product_catalog(explicit: Option<&str>) -> anyhow::Result<ProductCatalog> {
    match read_config_file(explicit, "products.toml")? {
        Some((path, content)) => {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.products.len(), path);
            Ok(catalog)
        }
        None => {
            warn!("No product catalog found, using empty catalog");
            Ok(ProductCatalog::new())
        }
    }
}

/// Load payment methods from config file
fn load_payment_methods(explicit: Option<&str>) -> anyhow::Result<StaticPaymentMethods> {
    match read_config_file(explicit, "payment_methods.toml")? {
        Some((path, content)) => {
            let methods = StaticPaymentMethods::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded payment methods from {}", path);
            Ok(methods)
        }
        None => {
            warn!("No payment methods found, checkout cannot take payments");
            Ok(StaticPaymentMethods::new(Vec::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_stripe::StripeConfig;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("CATALOG_PATH");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_describe_providers_is_sorted() {
        let selector = PaymentProcessorSelector::new("stripe")
            .with_processor(Arc::new(SimulatedProcessor::new()))
            .with_processor(Arc::new(
                StripeProcessor::new(StripeConfig::new("sk_test_abc123")).unwrap(),
            ));

        assert_eq!(describe_providers(&selector), "simulated, stripe");
        assert_eq!(selector.default_provider(), "stripe");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "test".to_string(),
            catalog_path: None,
            payment_methods_path: None,
            checkout_config_path: None,
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..config
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load_product_catalog(Some("/nonexistent/products.toml")).is_err());
    }

    #[test]
    fn test_sample_config_files_parse() {
        let catalog = load_product_catalog(Some(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/products.toml"
        )))
        .unwrap();
        assert!(!catalog.products.is_empty());

        let methods = load_payment_methods(Some(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/payment_methods.toml"
        )));
        assert!(methods.is_ok());

        let checkout = load_checkout_config(Some(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../config/checkout.toml"
        )))
        .unwrap();
        assert_eq!(checkout.shipping_fee_cents, 1500);
    }
}
