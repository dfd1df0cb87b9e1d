//! # Host Notifications
//!
//! The host (navigation layer, UI shell, HTTP front end) receives one-way
//! notifications from the session. The session never asks it for state.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// How prominent a toast should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Notifications a checkout session sends to its host
#[allow(unused_variables)]
pub trait CheckoutHost: Send + Sync {
    /// The customer asked to leave the checkout screen
    fn on_back_requested(&self) {}

    /// The payment succeeded; the host usually navigates away
    fn on_checkout_success(&self) {}

    /// Show a short message to the customer
    fn on_toast_requested(&self, message: &str, severity: Severity) {}
}

/// Host that only records notifications in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

impl CheckoutHost for LoggingHost {
    fn on_back_requested(&self) {
        info!("Host: back requested");
    }

    fn on_checkout_success(&self) {
        info!("Host: checkout succeeded");
    }

    fn on_toast_requested(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("Host toast: {}", message),
            Severity::Warning => warn!("Host toast: {}", message),
            Severity::Error => error!("Host toast: {}", message),
        }
    }
}
