//! Cart and quote list commands.

use std::io::Write;

use clap::Subcommand;
use rust_decimal::Decimal;
use voltparts_core::{BasketItem, ProductId, ProductSnapshot};
use voltparts_storefront::{AppError, Storefront};

use super::{CliError, money, out};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketTarget {
    Cart,
    Quote,
}

#[derive(Subcommand)]
pub enum BasketAction {
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price in rupees
        #[arg(long)]
        price: Decimal,

        /// Quantity
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Brand
        #[arg(long)]
        brand: Option<String>,

        /// SKU
        #[arg(long)]
        sku: Option<String>,
    },
    /// Show the contents
    Show,
    /// Change the quantity of a product (0 removes it)
    Set {
        /// Product ID
        product_id: String,

        /// New quantity
        quantity: u32,
    },
    /// Remove a product
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Remove everything
    Clear,
}

pub fn run(
    storefront: &Storefront,
    target: BasketTarget,
    action: BasketAction,
) -> Result<(), CliError> {
    let basket = match target {
        BasketTarget::Cart => storefront.cart(),
        BasketTarget::Quote => storefront.quote(),
    };
    let label = match target {
        BasketTarget::Cart => "cart",
        BasketTarget::Quote => "quote list",
    };

    match action {
        BasketAction::Add {
            product_id,
            name,
            price,
            quantity,
            brand,
            sku,
        } => {
            if price.is_sign_negative() {
                return Err(AppError::BadRequest("price cannot be negative".to_string()).into());
            }
            if quantity == 0 {
                return Err(AppError::BadRequest("quantity must be at least 1".to_string()).into());
            }
            let item = BasketItem {
                product: ProductSnapshot {
                    product_id: ProductId::new(product_id),
                    name,
                    sku,
                    brand,
                    image_url: None,
                },
                unit_price: price,
                quantity,
            };
            if target == BasketTarget::Cart {
                storefront.analytics().add_to_cart(&item);
            }
            let name = item.product.name.clone();
            basket.add_item(item)?;
            writeln!(out(), "Added {quantity} x {name} to your {label}")?;
        }
        BasketAction::Show => {
            let items = basket.items();
            let mut out = out();
            if items.is_empty() {
                writeln!(out, "Your {label} is empty")?;
                return Ok(());
            }
            for item in &items {
                writeln!(
                    out,
                    "{:<20} {:<40} {:>3} x {:>10} = {:>12}",
                    item.product.product_id,
                    item.product.name,
                    item.quantity,
                    money(item.unit_price),
                    money(item.subtotal())
                )?;
            }
            writeln!(
                out,
                "{} units, subtotal {}",
                basket.count(),
                money(basket.subtotal())
            )?;
        }
        BasketAction::Set {
            product_id,
            quantity,
        } => {
            basket.update_quantity(&ProductId::new(product_id), quantity)?;
            writeln!(out(), "Your {label} now has {} units", basket.count())?;
        }
        BasketAction::Remove { product_id } => {
            basket.remove_item(&ProductId::new(product_id))?;
            writeln!(out(), "Your {label} now has {} units", basket.count())?;
        }
        BasketAction::Clear => {
            basket.clear()?;
            writeln!(out(), "Your {label} is empty")?;
        }
    }
    Ok(())
}
