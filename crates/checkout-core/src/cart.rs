//! # Cart Snapshot
//!
//! The caller owns the cart; the session only keeps the latest snapshot
//! together with the subtotal derived from it.

use crate::product::{Currency, Price, Product};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A line in the caller's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product ID
    pub product_id: String,

    /// Resolved product, if the caller has it loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,

    /// Quantity
    pub quantity: u32,
}

impl CartItem {
    /// Create a line item from a product
    pub fn new(product: Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            product: Some(product),
            quantity,
        }
    }

    /// A line whose product has not been loaded yet
    pub fn unresolved(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            product: None,
            quantity,
        }
    }

    /// Line total; unresolved products contribute nothing
    pub fn total(&self) -> Option<Price> {
        self.product.as_ref().map(|p| p.price.times(self.quantity))
    }

    pub fn image_url(&self) -> Option<&str> {
        self.product.as_ref().and_then(|p| p.image_url.as_deref())
    }
}

/// One cart snapshot and the subtotal computed from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub subtotal: Price,
    pub item_count: u64,
}

impl CartSummary {
    /// Compute the summary for a snapshot, in the given currency
    pub fn compute(items: Vec<CartItem>, currency: Currency) -> Self {
        let mut subtotal = Price::zero(currency);
        for item in &items {
            if let Some(total) = item.total() {
                if total.currency != currency {
                    warn!(
                        product_id = %item.product_id,
                        "Cart item priced in {} but session uses {}",
                        total.currency,
                        currency
                    );
                }
                subtotal = subtotal.plus(total);
            }
        }

        Self {
            item_count: items
                .iter()
                .fold(0u64, |count, i| count.saturating_add(u64::from(i.quantity))),
            items,
            subtotal,
        }
    }

    pub fn empty(currency: Currency) -> Self {
        Self::compute(Vec::new(), currency)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Subtotal, shipping and the amount actually charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub grand_total: Price,
}

impl OrderTotals {
    pub fn new(subtotal: Price, shipping: Price) -> Self {
        Self {
            subtotal,
            shipping,
            grand_total: subtotal.plus(shipping),
        }
    }
}

/// Holds the current cart snapshot and publishes every replacement
pub struct CartLoader {
    currency: Currency,
    tx: watch::Sender<CartSummary>,
}

impl CartLoader {
    pub fn new(currency: Currency) -> Self {
        let (tx, _rx) = watch::channel(CartSummary::empty(currency));
        Self { currency, tx }
    }

    /// Replace the snapshot and recompute the subtotal.
    ///
    /// Readers see either the old summary or the new one, never a mix.
    pub fn set_cart(&self, items: Vec<CartItem>) -> CartSummary {
        let summary = CartSummary::compute(items, self.currency);
        debug!(
            items = summary.item_count,
            subtotal = %summary.subtotal.display(),
            "Cart snapshot replaced"
        );
        self.tx.send_replace(summary.clone());
        summary
    }

    pub fn summary(&self) -> CartSummary {
        self.tx.borrow().clone()
    }

    pub fn subtotal(&self) -> Price {
        self.tx.borrow().subtotal
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoe(id: &str, dollars: f64) -> Product {
        Product::new(id, id, Price::new(dollars, Currency::USD))
    }

    #[test]
    fn test_subtotal_is_price_times_quantity() {
        let loader = CartLoader::new(Currency::USD);
        let summary = loader.set_cart(vec![
            CartItem::new(shoe("runner", 50.0), 2),
            CartItem::new(shoe("sandal", 19.99), 1),
        ]);

        assert_eq!(summary.subtotal, Price::new(119.99, Currency::USD));
        assert_eq!(summary.item_count, 3);
        assert_eq!(loader.subtotal(), summary.subtotal);
    }

    #[test]
    fn test_empty_cart_has_zero_subtotal() {
        let loader = CartLoader::new(Currency::USD);
        loader.set_cart(vec![CartItem::new(shoe("runner", 50.0), 1)]);
        let summary = loader.set_cart(Vec::new());

        assert!(summary.is_empty());
        assert_eq!(summary.subtotal, Price::zero(Currency::USD));
    }

    #[test]
    fn test_unresolved_products_contribute_nothing() {
        let loader = CartLoader::new(Currency::USD);
        let summary = loader.set_cart(vec![
            CartItem::new(shoe("runner", 50.0), 1),
            CartItem::unresolved("still-loading", 3),
        ]);

        assert_eq!(summary.subtotal, Price::new(50.0, Currency::USD));
        assert_eq!(summary.item_count, 4);
    }

    #[test]
    fn test_later_snapshot_replaces_earlier_one() {
        let loader = CartLoader::new(Currency::USD);
        loader.set_cart(vec![CartItem::new(shoe("runner", 50.0), 2)]);
        loader.set_cart(vec![CartItem::new(shoe("boot", 80.0), 1)]);

        let summary = loader.summary();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].product_id, "boot");
        assert_eq!(summary.subtotal, Price::new(80.0, Currency::USD));
    }

    #[test]
    fn test_grand_total_adds_flat_shipping() {
        let loader = CartLoader::new(Currency::USD);
        loader.set_cart(vec![CartItem::new(shoe("runner", 50.0), 2)]);

        let totals = OrderTotals::new(loader.subtotal(), Price::new(15.0, Currency::USD));
        assert_eq!(totals.grand_total, Price::new(115.0, Currency::USD));
    }

    #[test]
    fn test_huge_quantities_do_not_overflow() {
        let loader = CartLoader::new(Currency::USD);
        let summary = loader.set_cart(vec![
            CartItem::new(shoe("runner", 50.0), 3_000_000_000),
            CartItem::new(shoe("runner", 50.0), 3_000_000_000),
        ]);

        assert_eq!(summary.item_count, 6_000_000_000);
        assert_eq!(summary.subtotal.amount, 2 * 5000 * 3_000_000_000);

        let pricey = Product::new("yacht", "Yacht", Price::from_cents(i64::MAX, Currency::USD));
        let summary = loader.set_cart(vec![
            CartItem::new(pricey.clone(), 2),
            CartItem::new(pricey, 1),
        ]);
        assert_eq!(summary.subtotal.amount, i64::MAX);
        assert_eq!(
            OrderTotals::new(summary.subtotal, Price::new(15.0, Currency::USD))
                .grand_total
                .amount,
            i64::MAX
        );
    }

    #[test]
    fn test_each_set_cart_publishes_once() {
        let loader = CartLoader::new(Currency::USD);
        let mut rx = loader.subscribe();
        assert!(!rx.has_changed().unwrap());

        loader.set_cart(vec![CartItem::new(shoe("runner", 50.0), 2)]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().subtotal.amount, 10000);
        assert!(!rx.has_changed().unwrap());

        loader.set_cart(vec![CartItem::new(shoe("runner", 50.0), 3)]);
        assert_eq!(rx.borrow_and_update().subtotal.amount, 15000);
    }
}
