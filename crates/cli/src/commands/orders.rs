//! Order history, details, tracking and cancellation.
//!
//! # Usage
//!
//! ```bash
//! vp-cli orders list --limit 10 --page 2
//! vp-cli orders show 1042
//! vp-cli orders track 1042
//! vp-cli orders cancel 1042 --reason "ordered twice"
//! ```

use std::io::Write;

use clap::Subcommand;
use voltparts_core::OrderId;
use voltparts_storefront::{AppError, Storefront};

use super::{CliError, money, order_line, out};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List your orders, newest first
    List {
        /// Orders per page
        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show one order
    Show {
        /// Order ID
        id: String,
    },
    /// Show the tracking timeline of an order
    Track {
        /// Order ID
        id: String,
    },
    /// Cancel an order that has not shipped yet
    Cancel {
        /// Order ID
        id: String,

        /// Why the order is cancelled
        #[arg(short, long)]
        reason: Option<String>,
    },
}

pub async fn run(storefront: &Storefront, action: OrdersAction) -> Result<(), CliError> {
    match action {
        OrdersAction::List { limit, page } => list(storefront, limit, page).await,
        OrdersAction::Show { id } => show(storefront, &OrderId::new(id)).await,
        OrdersAction::Track { id } => track(storefront, &OrderId::new(id)).await,
        OrdersAction::Cancel { id, reason } => cancel(storefront, &OrderId::new(id), reason).await,
    }
}

async fn list(storefront: &Storefront, limit: u32, page: u32) -> Result<(), CliError> {
    let user = storefront.auth().current_user();
    let page = storefront
        .orders()
        .get_user_orders(user.as_ref().map(|u| &u.id), limit, page)
        .await;

    let mut out = out();
    if page.items.is_empty() {
        writeln!(out, "No orders yet")?;
        return Ok(());
    }
    for order in &page.items {
        writeln!(out, "{}", order_line(order))?;
    }
    writeln!(
        out,
        "Page {} of {} ({} orders)",
        page.pagination.page,
        page.pagination.total_pages().max(1),
        page.pagination.total
    )?;
    Ok(())
}

async fn show(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    let order = storefront
        .orders()
        .get_order(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    let mut out = out();
    writeln!(out, "Order {} ({})", order.order_number, order.kind.as_str())?;
    writeln!(out, "Status:  {}", order.status.label())?;
    writeln!(
        out,
        "Payment: {} ({})",
        order.payment_method.label(),
        order.payment_status.as_str()
    )?;
    writeln!(
        out,
        "Placed:  {}",
        order.created_at.format("%d %b %Y %H:%M")
    )?;
    writeln!(out, "Deliver to {}", order.delivery_address.full_name)?;
    writeln!(out, "  {}", order.delivery_address.one_line())?;
    writeln!(out)?;
    for item in &order.items {
        writeln!(
            out,
            "  {:>3} x {:<40} {:>12}",
            item.quantity,
            item.product.name,
            money(item.subtotal)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "  Subtotal {:>12}", money(order.pricing.subtotal))?;
    writeln!(out, "  Shipping {:>12}", money(order.pricing.shipping))?;
    writeln!(out, "  GST      {:>12}", money(order.pricing.tax))?;
    if !order.pricing.discount.is_zero() {
        writeln!(out, "  Discount {:>12}", money(-order.pricing.discount))?;
    }
    writeln!(out, "  Total    {:>12}", money(order.pricing.total))?;
    if let Some(reason) = &order.cancellation_reason {
        writeln!(out, "Cancelled: {reason}")?;
    }
    Ok(())
}

async fn track(storefront: &Storefront, id: &OrderId) -> Result<(), CliError> {
    let tracking = storefront
        .orders()
        .get_order_tracking(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;

    let mut out = out();
    writeln!(out, "Status: {}", tracking.status.label())?;
    if let Some(number) = &tracking.tracking_number {
        writeln!(out, "Tracking number: {number}")?;
    }
    for event in &tracking.events {
        let location = event
            .location
            .as_deref()
            .map(|l| format!(" ({l})"))
            .unwrap_or_default();
        writeln!(
            out,
            "  {}  {:<17} {}{location}",
            event.timestamp.format("%d %b %H:%M"),
            event.status.label(),
            event.description
        )?;
    }
    Ok(())
}

async fn cancel(
    storefront: &Storefront,
    id: &OrderId,
    reason: Option<String>,
) -> Result<(), CliError> {
    let order = storefront.orders().cancel_order(id, reason).await?;
    writeln!(out(), "Order {} cancelled", order.order_number)?;
    Ok(())
}
