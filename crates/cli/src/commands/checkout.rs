//! Cart checkout and quote submission.

use std::io::Write;

use clap::Args;
use voltparts_core::PaymentMethod;
use voltparts_storefront::Storefront;
use voltparts_storefront::error::add_breadcrumb;
use voltparts_storefront::services::{CheckoutError, CheckoutForm, CheckoutOutcome};

use super::{CliError, money, out};

/// Contact and delivery details. Name, email and phone default to the
/// signed-in customer.
#[derive(Args)]
pub struct AddressArgs {
    /// Full name
    #[arg(long)]
    name: Option<String>,

    /// Email for the confirmation
    #[arg(long)]
    email: Option<String>,

    /// 10-digit mobile number
    #[arg(long)]
    phone: Option<String>,

    /// Address line 1
    #[arg(long)]
    line1: String,

    /// Address line 2
    #[arg(long)]
    line2: Option<String>,

    /// Landmark
    #[arg(long)]
    landmark: Option<String>,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    /// 6-digit PIN code
    #[arg(long)]
    pincode: String,

    /// Payment method (cod, upi, card, net_banking)
    #[arg(long, default_value = "cod")]
    payment: PaymentMethod,

    /// Delivery notes
    #[arg(long)]
    notes: Option<String>,

    /// Save the address to your address book
    #[arg(long)]
    save_address: bool,
}

impl AddressArgs {
    fn into_form(self, storefront: &Storefront) -> CheckoutForm {
        let base = storefront
            .auth()
            .current_user()
            .map(|user| CheckoutForm::for_user(&user))
            .unwrap_or_default();
        CheckoutForm {
            full_name: self.name.unwrap_or(base.full_name),
            email: self.email.unwrap_or(base.email),
            phone: self.phone.unwrap_or(base.phone),
            line1: self.line1,
            line2: self.line2,
            landmark: self.landmark,
            city: self.city,
            state: self.state,
            pincode: self.pincode,
            payment_method: self.payment,
            notes: self.notes,
            save_address: self.save_address,
        }
    }
}

pub async fn place_order(storefront: &Storefront, args: AddressArgs) -> Result<(), CliError> {
    add_breadcrumb("checkout", "place order", None);
    let form = args.into_form(storefront);
    let outcome = storefront
        .checkout()
        .place_order(&form)
        .await
        .map_err(report_fields)?;
    print_outcome(&outcome, "Order placed")
}

pub async fn submit_quote(storefront: &Storefront, args: AddressArgs) -> Result<(), CliError> {
    add_breadcrumb("checkout", "submit quote", None);
    let form = args.into_form(storefront);
    let mut checkout = storefront.checkout().quote_checkout();
    checkout.review(form).map_err(report_fields)?;

    {
        let mut out = out();
        writeln!(out, "Requesting a quote for:")?;
        for item in checkout.items() {
            writeln!(
                out,
                "  {:>3} x {:<40} {:>12}",
                item.quantity,
                item.product.name,
                money(item.subtotal())
            )?;
        }
    }

    let outcome = checkout.submit().await?;
    print_outcome(&outcome, "Quote request submitted")
}

/// List the failing fields before handing the error back.
fn report_fields(err: CheckoutError) -> CheckoutError {
    if let CheckoutError::Validation(fields) = &err {
        let mut stderr = std::io::stderr().lock();
        for (field, message) in fields.fields() {
            let _ = writeln!(stderr, "  {field}: {message}");
        }
    }
    err
}

fn print_outcome(outcome: &CheckoutOutcome, heading: &str) -> Result<(), CliError> {
    let order = &outcome.order;
    let mut out = out();
    writeln!(out, "{heading}: {}", order.order_number)?;
    writeln!(out, "Total: {}", money(order.pricing.total))?;
    writeln!(out, "{}", outcome.notification.message)?;
    writeln!(out, "Details: vp-cli orders show {}", order.id)?;
    Ok(())
}
