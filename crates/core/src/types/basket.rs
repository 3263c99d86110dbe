//! Basket line items shared by the cart and the quote list.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::ProductSnapshot;

/// A product sitting in the cart or quote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    pub product: ProductSnapshot,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl BasketItem {
    /// Line total.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
