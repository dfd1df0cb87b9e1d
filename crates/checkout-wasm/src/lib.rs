//! # checkout-wasm
//!
//! WebAssembly bindings for checkout front ends.
//!
//! Browser code gets the same totals, price formatting and account masking
//! as the server, so what the customer sees matches what is charged.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { calculate_grand_total, format_price, mask_account_number } from 'checkout-wasm';
//!
//! await init();
//!
//! const items = [{ product_id: 'air-runner', name: 'Air Runner', price_cents: 5000, quantity: 2 }];
//!
//! console.log('Total:', format_price(calculate_grand_total(items, 1500)));  // $115.00
//! console.log(mask_account_number('4242 4242 4242 4242'));                 // **** **** **** 4242
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use checkout_core::config::DEFAULT_SHIPPING_FEE_CENTS;
use checkout_core::{
    AccountNumber, CartItem, CartSummary, Currency, InvalidAccountNumber, OrderTotals, Price,
    Product,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Cart item for WASM interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[wasm_bindgen]
pub struct WasmCartItem {
    product_id: String,
    name: String,
    price_cents: i64,
    quantity: u32,
}

#[wasm_bindgen]
impl WasmCartItem {
    #[wasm_bindgen(constructor)]
    pub fn new(product_id: String, name: String, price_cents: i64, quantity: u32) -> Self {
        Self {
            product_id,
            name,
            price_cents,
            quantity,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn product_id(&self) -> String {
        self.product_id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    #[wasm_bindgen(getter)]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Calculate line item total in cents
    #[wasm_bindgen]
    pub fn total_cents(&self) -> i64 {
        self.to_cart_item()
            .total()
            .map(|p| p.amount)
            .unwrap_or_default()
    }

    /// Format total for display
    #[wasm_bindgen]
    pub fn format_total(&self) -> String {
        format_price(self.total_cents())
    }
}

impl WasmCartItem {
    fn to_cart_item(&self) -> CartItem {
        let price = Price::from_cents(self.price_cents, Currency::USD);
        CartItem::new(
            Product::new(self.product_id.clone(), self.name.clone(), price),
            self.quantity,
        )
    }
}

fn parse_items(items: JsValue) -> Result<Vec<WasmCartItem>, JsValue> {
    serde_wasm_bindgen::from_value(items)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart items: {}", e)))
}

fn totals(items: &[WasmCartItem], shipping_cents: i64) -> OrderTotals {
    let summary = CartSummary::compute(
        items.iter().map(WasmCartItem::to_cart_item).collect(),
        Currency::USD,
    );
    OrderTotals::new(summary.subtotal, Price::from_cents(shipping_cents, Currency::USD))
}

fn mask(raw: &str) -> Result<String, InvalidAccountNumber> {
    AccountNumber::new(raw).map(|account| account.masked())
}

/// Subtotal in cents for a list of cart items
#[wasm_bindgen]
pub fn calculate_subtotal(items: JsValue) -> Result<i64, JsValue> {
    let items = parse_items(items)?;
    Ok(totals(&items, 0).subtotal.amount)
}

/// Subtotal plus shipping in cents
#[wasm_bindgen]
pub fn calculate_grand_total(items: JsValue, shipping_cents: i64) -> Result<i64, JsValue> {
    let items = parse_items(items)?;
    Ok(totals(&items, shipping_cents).grand_total.amount)
}

/// Default flat shipping fee in cents
#[wasm_bindgen]
pub fn default_shipping_cents() -> i64 {
    DEFAULT_SHIPPING_FEE_CENTS
}

/// Format a price in cents to display string
#[wasm_bindgen]
pub fn format_price(cents: i64) -> String {
    Price::from_cents(cents, Currency::USD).display()
}

/// Mask an account number, keeping the last four digits
#[wasm_bindgen]
pub fn mask_account_number(raw: &str) -> Result<String, JsValue> {
    mask(raw).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
