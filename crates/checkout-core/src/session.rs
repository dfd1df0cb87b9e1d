//! # Checkout Session
//!
//! One checkout attempt, from screen entry to success, failure or
//! back-navigation. The session ties together the cart snapshot, the
//! payment-method registry and the state machine, and runs the payment
//! submission workflow.
//!
//! `CheckoutSession` is a cheap handle; clones share the same session.
//!
//! ## Submission
//!
//! `submit_payment` validates synchronously, moves the state machine to
//! `Submitting` and hands the backend call to the tokio runtime. Once
//! started a submission cannot be cancelled: dropping the returned
//! `SubmissionHandle` detaches it, and it always ends in `Succeeded` or
//! `Failed`, firing exactly one of the two callbacks.

use crate::cart::{CartItem, CartLoader, CartSummary, OrderTotals};
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult, Disposition, PaymentError, PaymentResult};
use crate::host::{CheckoutHost, LoggingHost, Severity};
use crate::masking::AccountMasker;
use crate::payment_method::{PaymentMethod, PaymentMethodRegistry, PaymentMethodSource};
use crate::processor::{BoxedPaymentProcessor, PaymentProcessorSelector, PaymentReceipt, PaymentRequest};
use crate::state::{CheckoutState, CheckoutStateMachine};
use crate::view::{CartLineView, CheckoutView, PaymentMethodView, TotalsView};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

struct SessionInner {
    id: Uuid,
    config: CheckoutConfig,
    cart: CartLoader,
    methods: PaymentMethodRegistry,
    state: CheckoutStateMachine,
    processors: PaymentProcessorSelector,
    masker: AccountMasker,
    host: Arc<dyn CheckoutHost>,
}

/// Handle to one checkout session
#[derive(Clone)]
pub struct CheckoutSession {
    inner: Arc<SessionInner>,
}

impl CheckoutSession {
    /// Create a session that reports to a `LoggingHost`
    pub fn new(config: CheckoutConfig, processors: PaymentProcessorSelector) -> Self {
        Self::with_host(config, processors, Arc::new(LoggingHost))
    }

    /// Create a session that reports to `host`
    pub fn with_host(
        config: CheckoutConfig,
        processors: PaymentProcessorSelector,
        host: Arc<dyn CheckoutHost>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, "Checkout session created");

        Self {
            inner: Arc::new(SessionInner {
                id,
                cart: CartLoader::new(config.currency),
                methods: PaymentMethodRegistry::new(),
                state: CheckoutStateMachine::new(),
                masker: config.masking.masker(),
                processors,
                host,
                config,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    // -------------------------------------------------------------------------
    // Payment methods
    // -------------------------------------------------------------------------

    /// Load the payment methods offered in this session
    #[instrument(skip(self, source), fields(session_id = %self.inner.id))]
    pub async fn start(&self, source: &dyn PaymentMethodSource) -> PaymentResult<&[PaymentMethod]> {
        self.inner.methods.load_methods(source).await
    }

    pub fn payment_methods(&self) -> &[PaymentMethod] {
        self.inner.methods.methods()
    }

    /// Select a payment method; see [`PaymentMethodRegistry::select_method`]
    pub fn select_method(&self, id: &str) -> CheckoutResult<bool> {
        self.inner.methods.select_method(id)
    }

    pub fn selected_method(&self) -> Option<&PaymentMethod> {
        self.inner.methods.selected()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<String>> {
        self.inner.methods.subscribe()
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// Replace the cart snapshot
    pub fn set_cart(&self, items: Vec<CartItem>) -> CartSummary {
        self.inner.cart.set_cart(items)
    }

    pub fn cart(&self) -> CartSummary {
        self.inner.cart.summary()
    }

    pub fn subscribe_cart(&self) -> watch::Receiver<CartSummary> {
        self.inner.cart.subscribe()
    }

    /// Subtotal of the current snapshot plus the flat shipping fee
    pub fn order_totals(&self) -> OrderTotals {
        OrderTotals::new(self.inner.cart.subtotal(), self.inner.config.shipping_fee())
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    pub fn state(&self) -> CheckoutState {
        self.inner.state.current()
    }

    /// True while a payment is in flight; front ends block interaction
    pub fn is_busy(&self) -> bool {
        self.inner.state.is_busy()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state.subscribe()
    }

    /// Return a finished session to `Idle` (e.g., the screen is revisited)
    pub fn reset(&self) -> CheckoutResult<()> {
        self.inner.state.reset()
    }

    /// Ask the host to leave the checkout. Refused while a payment is in flight.
    pub fn request_back(&self) -> CheckoutResult<()> {
        if self.is_busy() {
            debug!("Back navigation blocked while submitting");
            return Err(CheckoutError::AlreadyInProgress);
        }
        self.inner.host.on_back_requested();
        Ok(())
    }

    /// Snapshot of everything a front end renders
    pub fn view(&self) -> CheckoutView {
        let cart = self.inner.cart.summary();
        let state = self.state();
        let selected_id = self.inner.methods.selected_id();

        CheckoutView {
            session_id: self.inner.id,
            busy: state.is_busy(),
            state,
            items: cart.items.iter().map(CartLineView::from).collect(),
            item_count: cart.item_count,
            totals: TotalsView::from(self.order_totals()),
            payment_methods: self
                .inner
                .methods
                .methods()
                .iter()
                .map(|m| PaymentMethodView::new(m, selected_id.as_deref(), &self.inner.masker))
                .collect(),
            selected_method_id: selected_id,
            delivery_address: self.inner.config.delivery_address.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Start charging the selected payment method for the current cart.
    ///
    /// Synchronous rejections:
    /// - no method selected: `on_failure(NoMethodSelected)`, state untouched
    /// - already submitting / already paid: no callback at all
    /// - empty cart: `on_failure(EmptyCart)`, state untouched
    ///
    /// Otherwise the state becomes `Submitting` before this returns and the
    /// backend call continues in the background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime once the checks pass, since
    /// the submission is spawned onto the current runtime.
    pub fn submit_payment<S, F>(&self, on_success: S, on_failure: F) -> CheckoutResult<SubmissionHandle>
    where
        S: FnOnce(&PaymentReceipt) + Send + 'static,
        F: FnOnce(&CheckoutError) + Send + 'static,
    {
        let inner = &self.inner;

        let Some(method) = inner.methods.selected().cloned() else {
            let err = CheckoutError::NoMethodSelected;
            info!(session_id = %inner.id, "Payment attempted without a payment method");
            on_failure(&err);
            return Err(err);
        };

        match inner.state.current() {
            CheckoutState::Submitting => return Err(CheckoutError::AlreadyInProgress),
            CheckoutState::Succeeded => return Err(CheckoutError::AlreadyCompleted),
            CheckoutState::Idle | CheckoutState::Failed(_) => {}
        }

        let cart = inner.cart.summary();
        if cart.is_empty() {
            let err = CheckoutError::EmptyCart;
            info!(session_id = %inner.id, "Payment attempted with an empty cart");
            on_failure(&err);
            return Err(err);
        }

        inner.state.begin_submission()?;

        let request = PaymentRequest {
            submission_id: Uuid::new_v4(),
            session_id: inner.id,
            method_id: method.id.clone(),
            processor_token: method.processor_token.clone(),
            account: method.account.as_ref().map(|a| inner.masker.mask(a)),
            totals: OrderTotals::new(cart.subtotal, inner.config.shipping_fee()),
            item_count: cart.item_count,
            created_at: Utc::now(),
        };
        let processor = inner
            .processors
            .get_or_default(method.provider.as_deref())
            .cloned();

        let submission_id = request.submission_id;
        let span = info_span!(
            "payment_submission",
            session_id = %inner.id,
            submission_id = %submission_id,
            method_id = %method.id,
        );
        span.in_scope(|| {
            info!(
                "Submitting payment: {} ({} + {} shipping)",
                request.totals.grand_total.display(),
                request.totals.subtotal.display(),
                request.totals.shipping.display()
            )
        });

        let session = self.clone();
        let task = tokio::spawn(
            async move {
                session
                    .finish_submission(processor, request, on_success, on_failure)
                    .await
            }
            .instrument(span),
        );

        Ok(SubmissionHandle {
            submission_id,
            task,
        })
    }

    /// Submit and report the outcome to the host: success navigates,
    /// failures become error toasts.
    ///
    /// # Panics
    ///
    /// Same as [`submit_payment`](Self::submit_payment): needs a Tokio runtime.
    pub fn pay(&self) -> CheckoutResult<SubmissionHandle> {
        let success_host = Arc::clone(&self.inner.host);
        let failure_host = Arc::clone(&self.inner.host);

        self.submit_payment(
            move |_| success_host.on_checkout_success(),
            move |err| {
                if err.disposition() == Disposition::Toast {
                    failure_host.on_toast_requested(&err.to_string(), Severity::Error);
                }
            },
        )
    }

    async fn finish_submission<S, F>(
        self,
        processor: Option<BoxedPaymentProcessor>,
        request: PaymentRequest,
        on_success: S,
        on_failure: F,
    ) -> CheckoutResult<PaymentReceipt>
    where
        S: FnOnce(&PaymentReceipt) + Send + 'static,
        F: FnOnce(&CheckoutError) + Send + 'static,
    {
        let outcome = match processor {
            Some(processor) => {
                call_processor(processor, request, self.inner.config.processor_timeout()).await
            }
            None => Err(PaymentError::Configuration(format!(
                "No payment processor registered for method {}",
                request.method_id
            ))),
        };

        match outcome {
            Ok(receipt) => {
                if !self.inner.state.succeed() {
                    warn!("Submission finished outside the submitting state");
                }
                info!(
                    "Payment succeeded: {} via {} ({})",
                    receipt.amount.display(),
                    receipt.provider,
                    receipt.transaction_id
                );
                on_success(&receipt);
                Ok(receipt)
            }
            Err(err) => {
                if matches!(err, PaymentError::PaymentDeclined { .. }) {
                    warn!("Payment failed: {}", err);
                } else {
                    error!("Payment failed: {}", err);
                }
                let reason = err.failure_reason();
                if !self.inner.state.fail(reason.clone()) {
                    warn!("Submission finished outside the submitting state");
                }
                let err = CheckoutError::PaymentProcessingFailed(reason);
                on_failure(&err);
                Err(err)
            }
        }
    }
}

/// Run the backend call on its own task so a panic or a hang cannot
/// leave the session stuck in `Submitting`.
async fn call_processor(
    processor: BoxedPaymentProcessor,
    request: PaymentRequest,
    timeout: Duration,
) -> PaymentResult<PaymentReceipt> {
    let provider = processor.provider_name();
    let mut task = tokio::spawn(async move { processor.process(&request).await });

    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(PaymentError::Internal(format!(
            "{} processor task failed: {}",
            provider, join_err
        ))),
        Err(_) => {
            task.abort();
            Err(PaymentError::Timeout {
                secs: timeout.as_secs(),
            })
        }
    }
}

/// A submission running in the background
#[derive(Debug)]
pub struct SubmissionHandle {
    submission_id: Uuid,
    task: JoinHandle<CheckoutResult<PaymentReceipt>>,
}

impl SubmissionHandle {
    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    /// Wait for the submission to finish
    pub async fn wait(self) -> CheckoutResult<PaymentReceipt> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(PaymentError::Internal(format!(
                "submission task failed: {}",
                join_err
            ))
            .into()),
        }
    }
}
