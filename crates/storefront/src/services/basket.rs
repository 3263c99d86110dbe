//! Cart and quote list baskets backed by local storage.

use rust_decimal::Decimal;
use tracing::debug;

use voltparts_core::{BasketItem, ProductId};

use crate::storage::{CART_ITEMS_KEY, LocalStorage, QUOTE_ITEMS_KEY, StorageError};

/// Which basket a [`BasketService`] manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketKind {
    Cart,
    Quote,
}

impl BasketKind {
    /// Storage key holding the basket.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Cart => CART_ITEMS_KEY,
            Self::Quote => QUOTE_ITEMS_KEY,
        }
    }
}

/// A basket of items persisted under one storage key.
#[derive(Clone)]
pub struct BasketService {
    storage: LocalStorage,
    kind: BasketKind,
}

impl BasketService {
    #[must_use]
    pub const fn new(storage: LocalStorage, kind: BasketKind) -> Self {
        Self { storage, kind }
    }

    #[must_use]
    pub const fn kind(&self) -> BasketKind {
        self.kind
    }

    #[must_use]
    pub fn items(&self) -> Vec<BasketItem> {
        self.storage
            .get_json(self.kind.storage_key())
            .unwrap_or_default()
    }

    /// Add an item, merging quantities with an existing line for the same
    /// product. The latest unit price wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket cannot be saved.
    pub fn add_item(&self, item: BasketItem) -> Result<Vec<BasketItem>, StorageError> {
        if item.quantity == 0 {
            return Ok(self.items());
        }
        let mut items = self.items();
        match items
            .iter_mut()
            .find(|existing| existing.product.product_id == item.product.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                existing.unit_price = item.unit_price;
            }
            None => items.push(item),
        }
        self.save(items)
    }

    /// Set the quantity of a line. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket cannot be saved.
    pub fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<BasketItem>, StorageError> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        let mut items = self.items();
        if let Some(line) = items
            .iter_mut()
            .find(|line| &line.product.product_id == product_id)
        {
            line.quantity = quantity;
        }
        self.save(items)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the basket cannot be saved.
    pub fn remove_item(&self, product_id: &ProductId) -> Result<Vec<BasketItem>, StorageError> {
        let mut items = self.items();
        items.retain(|line| &line.product.product_id != product_id);
        self.save(items)
    }

    /// Empty the basket.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage key cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        debug!(basket = ?self.kind, "Clearing basket");
        self.storage.remove_item(self.kind.storage_key())
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items().iter().map(BasketItem::subtotal).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Total number of units.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items()
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity))
    }

    fn save(&self, items: Vec<BasketItem>) -> Result<Vec<BasketItem>, StorageError> {
        self.storage.set_json(self.kind.storage_key(), &items)?;
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use voltparts_core::ProductSnapshot;

    use super::*;

    fn item(id: &str, price: i64, quantity: u32) -> BasketItem {
        BasketItem {
            product: ProductSnapshot {
                product_id: ProductId::new(id),
                name: id.to_uppercase(),
                sku: None,
                brand: None,
                image_url: None,
            },
            unit_price: Decimal::from(price),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_by_product() {
        let cart = BasketService::new(LocalStorage::in_memory(), BasketKind::Cart);
        cart.add_item(item("arduino-uno", 650, 1)).unwrap();
        cart.add_item(item("arduino-uno", 600, 2)).unwrap();
        cart.add_item(item("hc-sr04", 120, 5)).unwrap();

        let items = cart.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_price, Decimal::from(600));
        assert_eq!(cart.count(), 8);
        assert_eq!(cart.subtotal(), Decimal::from(2400));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let cart = BasketService::new(LocalStorage::in_memory(), BasketKind::Cart);
        cart.add_item(item("arduino-uno", 650, 1)).unwrap();
        cart.update_quantity(&ProductId::new("arduino-uno"), 4).unwrap();
        assert_eq!(cart.count(), 4);

        cart.update_quantity(&ProductId::new("arduino-uno"), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_count_saturates_on_huge_quantities() {
        let cart = BasketService::new(LocalStorage::in_memory(), BasketKind::Cart);
        cart.add_item(item("arduino-uno", 650, 1)).unwrap();
        cart.add_item(item("hc-sr04", 120, 1)).unwrap();
        cart.update_quantity(&ProductId::new("arduino-uno"), u32::MAX).unwrap();
        cart.update_quantity(&ProductId::new("hc-sr04"), u32::MAX).unwrap();
        assert_eq!(cart.count(), u32::MAX);
    }

    #[test]
    fn test_cart_and_quote_are_separate() {
        let storage = LocalStorage::in_memory();
        let cart = BasketService::new(storage.clone(), BasketKind::Cart);
        let quote = BasketService::new(storage.clone(), BasketKind::Quote);

        quote.add_item(item("stepper-nema17", 900, 10)).unwrap();
        assert!(cart.is_empty());
        assert_eq!(quote.count(), 10);
        assert!(storage.get_item("quoteItems").is_some());

        quote.clear().unwrap();
        assert!(quote.is_empty());
        assert!(storage.get_item("quoteItems").is_none());
    }
}
