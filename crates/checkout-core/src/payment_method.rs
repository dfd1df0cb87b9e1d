//! # Payment Methods
//!
//! The registry holds the methods offered for one session and tracks which
//! one the customer picked. Methods are loaded once, from a
//! `PaymentMethodSource`, and never change afterwards.

use crate::error::{CheckoutError, CheckoutResult, PaymentError, PaymentResult};
use crate::masking::AccountNumber;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

/// A way to pay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Unique method identifier (e.g., "visa-4242")
    pub id: String,

    /// Opaque localization key for the title (e.g., "payment.method.card")
    pub title_key: String,

    /// Opaque icon reference
    pub icon: String,

    /// Processor that charges this method; the default one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Provider-side token for the method (e.g., a Stripe `pm_...` id)
    #[serde(default, skip_serializing)]
    pub processor_token: Option<String>,

    /// Account number, if the method has one; serializes masked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountNumber>,
}

impl PaymentMethod {
    pub fn new(id: impl Into<String>, title_key: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title_key: title_key.into(),
            icon: icon.into(),
            provider: None,
            processor_token: None,
            account: None,
        }
    }

    /// Builder: attach an account number
    pub fn with_account(mut self, account: AccountNumber) -> Self {
        self.account = Some(account);
        self
    }

    /// Builder: route this method to a specific processor
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Builder: set the provider-side token
    pub fn with_processor_token(mut self, token: impl Into<String>) -> Self {
        self.processor_token = Some(token.into());
        self
    }
}

/// Where payment methods come from (static catalog, remote service, ...)
#[async_trait]
pub trait PaymentMethodSource: Send + Sync {
    async fn load_methods(&self) -> PaymentResult<Vec<PaymentMethod>>;
}

/// A fixed list of methods, typically from `config/payment_methods.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPaymentMethods {
    #[serde(default)]
    pub methods: Vec<PaymentMethod>,
}

impl StaticPaymentMethods {
    pub fn new(methods: Vec<PaymentMethod>) -> Self {
        Self { methods }
    }

    /// Load methods from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[async_trait]
impl PaymentMethodSource for StaticPaymentMethods {
    async fn load_methods(&self) -> PaymentResult<Vec<PaymentMethod>> {
        Ok(self.methods.clone())
    }
}

/// Methods offered in this session plus the current selection
pub struct PaymentMethodRegistry {
    methods: OnceCell<Vec<PaymentMethod>>,
    selected: watch::Sender<Option<String>>,
}

impl PaymentMethodRegistry {
    pub fn new() -> Self {
        let (selected, _rx) = watch::channel(None);
        Self {
            methods: OnceCell::new(),
            selected,
        }
    }

    /// Populate the registry from `source`.
    ///
    /// Only the first successful call consults the source; later calls
    /// return the methods already loaded.
    pub async fn load_methods(
        &self,
        source: &dyn PaymentMethodSource,
    ) -> PaymentResult<&[PaymentMethod]> {
        let methods = self
            .methods
            .get_or_try_init(|| async {
                let methods = source.load_methods().await?;
                ensure_unique_ids(&methods)?;
                info!("Loaded {} payment methods", methods.len());
                Ok::<_, PaymentError>(methods)
            })
            .await?;
        Ok(methods.as_slice())
    }

    pub fn is_loaded(&self) -> bool {
        self.methods.initialized()
    }

    /// Loaded methods; empty before loading
    pub fn methods(&self) -> &[PaymentMethod] {
        self.methods.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: &str) -> Option<&PaymentMethod> {
        self.methods().iter().find(|m| m.id == id)
    }

    /// Select a method by id.
    ///
    /// Returns `Ok(true)` when the selection changed and `Ok(false)` when
    /// `id` was already selected; only a change notifies subscribers.
    pub fn select_method(&self, id: &str) -> CheckoutResult<bool> {
        if self.get(id).is_none() {
            warn!(method_id = %id, "Ignoring selection of unknown payment method");
            return Err(CheckoutError::InvalidSelection { id: id.to_string() });
        }

        let changed = self.selected.send_if_modified(|current| {
            if current.as_deref() == Some(id) {
                false
            } else {
                *current = Some(id.to_string());
                true
            }
        });

        if changed {
            debug!(method_id = %id, "Payment method selected");
        }
        Ok(changed)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    pub fn selected(&self) -> Option<&PaymentMethod> {
        let id = self.selected_id()?;
        self.get(&id)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.selected.subscribe()
    }
}

impl Default for PaymentMethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_unique_ids(methods: &[PaymentMethod]) -> PaymentResult<()> {
    let mut seen = HashSet::new();
    for method in methods {
        if !seen.insert(method.id.as_str()) {
            return Err(PaymentError::Configuration(format!(
                "Duplicate payment method id: {}",
                method.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn catalog() -> StaticPaymentMethods {
        StaticPaymentMethods::new(vec![
            PaymentMethod::new("visa", "payment.method.card", "ic_visa")
                .with_account(AccountNumber::new("4111111111111111").unwrap()),
            PaymentMethod::new("paypal", "payment.method.paypal", "ic_paypal"),
            PaymentMethod::new("cash", "payment.method.cash", "ic_cash"),
        ])
    }

    struct CountingSource {
        calls: AtomicUsize,
        inner: StaticPaymentMethods,
    }

    #[async_trait]
    impl PaymentMethodSource for CountingSource {
        async fn load_methods(&self) -> PaymentResult<Vec<PaymentMethod>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.load_methods().await
        }
    }

    #[tokio::test]
    async fn test_load_methods_once() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            inner: catalog(),
        };
        let registry = PaymentMethodRegistry::new();
        assert!(!registry.is_loaded());

        assert_eq!(registry.load_methods(&source).await.unwrap().len(), 3);
        assert_eq!(registry.load_methods(&source).await.unwrap().len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_loaded());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let source = StaticPaymentMethods::new(vec![
            PaymentMethod::new("visa", "a", "a"),
            PaymentMethod::new("visa", "b", "b"),
        ]);
        let registry = PaymentMethodRegistry::new();

        let err = registry.load_methods(&source).await.unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_select_before_load_is_invalid() {
        let registry = PaymentMethodRegistry::new();
        assert_eq!(
            registry.select_method("visa"),
            Err(CheckoutError::InvalidSelection { id: "visa".into() })
        );
        assert_eq!(registry.selected_id(), None);
    }

    #[tokio::test]
    async fn test_select_unknown_keeps_selection() {
        let registry = PaymentMethodRegistry::new();
        registry.load_methods(&catalog()).await.unwrap();
        registry.select_method("paypal").unwrap();

        let err = registry.select_method("bitcoin").unwrap_err();
        assert_eq!(err, CheckoutError::InvalidSelection { id: "bitcoin".into() });
        assert_eq!(registry.selected_id().as_deref(), Some("paypal"));
    }

    #[tokio::test]
    async fn test_reselecting_is_a_noop() {
        let registry = PaymentMethodRegistry::new();
        registry.load_methods(&catalog()).await.unwrap();
        let mut rx = registry.subscribe();

        assert_eq!(registry.select_method("visa"), Ok(true));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert_eq!(registry.select_method("visa"), Ok(false));
        assert!(!rx.has_changed().unwrap());

        assert_eq!(registry.select_method("cash"), Ok(true));
        assert_eq!(rx.borrow_and_update().as_deref(), Some("cash"));
        assert_eq!(registry.selected().unwrap().icon, "ic_cash");
    }

    #[test]
    fn test_methods_from_toml() {
        let source = StaticPaymentMethods::from_toml(
            r#"
            [[methods]]
            id = "visa"
            title_key = "payment.method.card"
            icon = "ic_visa"
            provider = "stripe"
            processor_token = "pm_card_visa"
            account = "4242 4242 4242 4242"

            [[methods]]
            id = "cash"
            title_key = "payment.method.cash"
            icon = "ic_cash"
            "#,
        )
        .unwrap();

        assert_eq!(source.methods.len(), 2);
        let visa = &source.methods[0];
        assert_eq!(visa.processor_token.as_deref(), Some("pm_card_visa"));
        assert_eq!(visa.account.as_ref().unwrap().masked(), "**** **** **** 4242");

        let json = serde_json::to_string(visa).unwrap();
        assert!(!json.contains("4242 4242 4242 4242"));
        assert!(!json.contains("pm_card_visa"));
    }
}
