//! # Checkout View
//!
//! Serializable snapshot of a session, shaped for rendering. Amounts are
//! carried both as prices and as display strings; accounts only ever
//! appear masked.

use crate::cart::{CartItem, OrderTotals};
use crate::config::DeliveryAddress;
use crate::masking::AccountMasker;
use crate::payment_method::PaymentMethod;
use crate::product::Price;
use crate::state::CheckoutState;
use serde::Serialize;
use uuid::Uuid;

/// Everything a checkout screen shows
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub session_id: Uuid,
    pub state: CheckoutState,
    /// True while a payment is in flight; interaction should be blocked
    pub busy: bool,
    pub items: Vec<CartLineView>,
    pub item_count: u64,
    pub totals: TotalsView,
    pub payment_methods: Vec<PaymentMethodView>,
    pub selected_method_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<DeliveryAddress>,
}

/// One cart line
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.product.as_ref().map(|p| p.name.clone()),
            image_url: item.image_url().map(str::to_string),
            quantity: item.quantity,
            unit_price: item.product.as_ref().map(|p| p.price.display()),
            line_total: item.total().map(|t| t.display()),
        }
    }
}

/// Order totals with display strings
#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub subtotal: Price,
    pub shipping: Price,
    pub grand_total: Price,
    pub subtotal_display: String,
    pub shipping_display: String,
    pub grand_total_display: String,
}

impl From<OrderTotals> for TotalsView {
    fn from(totals: OrderTotals) -> Self {
        Self {
            subtotal_display: totals.subtotal.display(),
            shipping_display: totals.shipping.display(),
            grand_total_display: totals.grand_total.display(),
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            grand_total: totals.grand_total,
        }
    }
}

/// One selectable payment method
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodView {
    pub id: String,
    pub title_key: String,
    pub icon: String,
    /// Masked account (e.g., "**** **** **** 1111")
    pub account: Option<String>,
    pub selected: bool,
}

impl PaymentMethodView {
    pub fn new(method: &PaymentMethod, selected_id: Option<&str>, masker: &AccountMasker) -> Self {
        Self {
            id: method.id.clone(),
            title_key: method.title_key.clone(),
            icon: method.icon.clone(),
            account: method.account.as_ref().map(|a| masker.mask(a).display),
            selected: selected_id == Some(method.id.as_str()),
        }
    }
}
