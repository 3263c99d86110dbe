//! Order confirmation notifications.
//!
//! Messages are rendered from askama templates and handed to the backend,
//! which owns the WhatsApp and email integrations:
//!
//! - `POST /whatsapp/send` with `{ phone, message }`
//! - `POST /email/send-order-confirmation` with `{ to, subject, html, ... }`
//!
//! Channels run concurrently and fail independently. A failing channel is
//! reported in the result and never turns into an error for the caller.

use std::sync::Arc;

use askama::Template;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::Serialize;
use tracing::{info, instrument, warn};

use voltparts_core::{Order, Price, User};

use crate::api::ApiClient;
use crate::api::wire::{OrderEmailBody, WhatsAppBody};
use crate::config::NotificationConfig;

/// Which channels to use for one confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationSettings {
    pub whatsapp: bool,
    pub email: bool,
}

impl From<&NotificationConfig> for NotificationSettings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            whatsapp: config.whatsapp,
            email: config.email,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    WhatsApp,
    Email,
}

impl NotificationChannel {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WhatsApp => "WhatsApp",
            Self::Email => "email",
        }
    }
}

/// Result of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: NotificationChannel,
    pub success: bool,
    pub message: String,
}

/// Merged result of all channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    /// At least one channel delivered.
    pub success: bool,
    pub message: String,
    pub channels: Vec<ChannelOutcome>,
}

impl NotificationResult {
    fn failed(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            channels: Vec::new(),
        }
    }

    fn merge(channels: Vec<ChannelOutcome>) -> Self {
        let delivered: Vec<&str> = channels
            .iter()
            .filter(|c| c.success)
            .map(|c| c.channel.label())
            .collect();
        let message = if delivered.is_empty() {
            "Order confirmation could not be sent".to_string()
        } else {
            format!("Order confirmation sent via {}", delivered.join(" and "))
        };
        Self {
            success: !delivered.is_empty(),
            message,
            channels,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

struct LineView {
    name: String,
    quantity: u32,
    subtotal: String,
}

/// Values shared by the WhatsApp and email templates.
struct ConfirmationSummary {
    store_name: String,
    customer_name: String,
    order_number: String,
    placed_on: String,
    lines: Vec<LineView>,
    subtotal: String,
    shipping: String,
    tax: String,
    discount: String,
    has_discount: bool,
    total: String,
    payment_method: &'static str,
    address: String,
    support_phone: String,
}

impl ConfirmationSummary {
    fn new(order: &Order, user: Option<&User>, config: &NotificationConfig) -> Self {
        let money = |amount| Price::inr(amount).display();
        let customer_name = Some(order.customer.name.as_str())
            .filter(|n| !n.is_empty())
            .or_else(|| user.map(|u| u.name.as_str()))
            .unwrap_or("Customer")
            .to_string();

        Self {
            store_name: config.store_name.clone(),
            customer_name,
            order_number: order.order_number.clone(),
            placed_on: order.created_at.format("%d %b %Y").to_string(),
            lines: order
                .items
                .iter()
                .map(|item| LineView {
                    name: item.product.name.clone(),
                    quantity: item.quantity,
                    subtotal: money(item.subtotal),
                })
                .collect(),
            subtotal: money(order.pricing.subtotal),
            shipping: if order.pricing.shipping.is_zero() {
                "FREE".to_string()
            } else {
                money(order.pricing.shipping)
            },
            tax: money(order.pricing.tax),
            discount: money(order.pricing.discount),
            has_discount: !order.pricing.discount.is_zero(),
            total: money(order.pricing.total),
            payment_method: order.payment_method.label(),
            address: order.delivery_address.one_line(),
            support_phone: config.support_phone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "order_confirmation.txt")]
struct WhatsAppTemplate<'a> {
    summary: &'a ConfirmationSummary,
}

#[derive(Template)]
#[template(path = "order_confirmation.html")]
struct EmailTemplate<'a> {
    summary: &'a ConfirmationSummary,
}

// =============================================================================
// Service
// =============================================================================

/// Sends order confirmations over WhatsApp and email.
#[derive(Clone)]
pub struct OrderNotificationService {
    inner: Arc<NotificationServiceInner>,
}

struct NotificationServiceInner {
    api: ApiClient,
    config: NotificationConfig,
}

impl OrderNotificationService {
    #[must_use]
    pub fn new(api: ApiClient, config: NotificationConfig) -> Self {
        Self {
            inner: Arc::new(NotificationServiceInner { api, config }),
        }
    }

    /// Channels enabled by configuration.
    #[must_use]
    pub fn default_settings(&self) -> NotificationSettings {
        NotificationSettings::from(&self.inner.config)
    }

    /// Send the confirmation for `order`.
    ///
    /// Contact details come from the order, falling back to `user`. A
    /// selected channel without contact details is skipped, so zero, one or
    /// two requests are made.
    #[instrument(skip_all, fields(order_id = %order.id, whatsapp = settings.whatsapp, email = settings.email))]
    pub async fn send_order_confirmation(
        &self,
        order: &Order,
        user: Option<&User>,
        settings: NotificationSettings,
    ) -> NotificationResult {
        if !settings.whatsapp && !settings.email {
            return NotificationResult::failed("No notification channel selected");
        }

        let summary = ConfirmationSummary::new(order, user, &self.inner.config);
        let mut sends: Vec<BoxFuture<'_, ChannelOutcome>> = Vec::with_capacity(2);

        if settings.whatsapp {
            match contact_phone(order, user) {
                Some(phone) => sends.push(self.send_whatsapp(phone, &summary).boxed()),
                None => warn!("No phone number for WhatsApp confirmation, skipping"),
            }
        }
        if settings.email {
            match contact_email(order, user) {
                Some(to) => sends.push(self.send_email(to, order, &summary).boxed()),
                None => warn!("No email address for email confirmation, skipping"),
            }
        }

        if sends.is_empty() {
            return NotificationResult::failed("No contact details for the selected channels");
        }

        let result = NotificationResult::merge(join_all(sends).await);
        info!(success = result.success, message = %result.message, "Order confirmation processed");
        result
    }

    async fn send_whatsapp(&self, phone: String, summary: &ConfirmationSummary) -> ChannelOutcome {
        let channel = NotificationChannel::WhatsApp;
        let message = match (WhatsAppTemplate { summary }).render() {
            Ok(message) => message,
            Err(e) => return render_failure(channel, &e),
        };
        let phone = whatsapp_number(&phone);

        let sent = self
            .inner
            .api
            .post::<_, serde_json::Value>(
                "whatsapp/send",
                &WhatsAppBody {
                    phone: &phone,
                    message: &message,
                },
            )
            .await;
        outcome(channel, sent.map(|r| r.message))
    }

    async fn send_email(
        &self,
        to: String,
        order: &Order,
        summary: &ConfirmationSummary,
    ) -> ChannelOutcome {
        let channel = NotificationChannel::Email;
        let html = match (EmailTemplate { summary }).render() {
            Ok(html) => html,
            Err(e) => return render_failure(channel, &e),
        };
        let subject = email_subject(order, &self.inner.config);

        let sent = self
            .inner
            .api
            .post::<_, serde_json::Value>(
                "email/send-order-confirmation",
                &OrderEmailBody {
                    to: &to,
                    subject: &subject,
                    html: &html,
                    order_id: &order.id,
                    order_number: &order.order_number,
                },
            )
            .await;
        outcome(channel, sent.map(|r| r.message))
    }
}

fn outcome(
    channel: NotificationChannel,
    sent: Result<Option<String>, crate::api::ApiError>,
) -> ChannelOutcome {
    match sent {
        Ok(message) => ChannelOutcome {
            channel,
            success: true,
            message: message.unwrap_or_else(|| format!("Sent via {}", channel.label())),
        },
        Err(e) => {
            warn!(channel = channel.label(), error = %e, "Notification channel failed");
            ChannelOutcome {
                channel,
                success: false,
                message: format!("Failed to send via {}", channel.label()),
            }
        }
    }
}

fn render_failure(channel: NotificationChannel, error: &askama::Error) -> ChannelOutcome {
    warn!(channel = channel.label(), error = %error, "Failed to render notification");
    ChannelOutcome {
        channel,
        success: false,
        message: "Could not compose message".to_string(),
    }
}

fn contact_phone(order: &Order, user: Option<&User>) -> Option<String> {
    order
        .customer
        .phone
        .clone()
        .or_else(|| user.and_then(|u| u.phone.clone()))
        .filter(|p| p.chars().any(|c| c.is_ascii_digit()))
}

fn contact_email(order: &Order, user: Option<&User>) -> Option<String> {
    order
        .customer
        .email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .or_else(|| user.map(|u| u.email.as_str().to_string()))
}

/// Digits only, with the India country code added to bare 10-digit numbers.
fn whatsapp_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match (digits.len(), digits.strip_prefix('0')) {
        (10, _) => format!("91{digits}"),
        (11, Some(local)) => format!("91{local}"),
        _ => digits,
    }
}

fn email_subject(order: &Order, config: &NotificationConfig) -> String {
    format!(
        "Order Confirmed - {} | {}",
        order.order_number, config.store_name
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use voltparts_core::{
        CustomerSnapshot, DeliveryAddress, Email, OrderId, OrderItem, OrderKind, OrderStatus,
        PaymentMethod, PaymentStatus, Pricing, ProductSnapshot, UserRole,
    };

    use super::*;

    fn order() -> Order {
        let at = Utc.with_ymd_and_hms(2026, 1, 18, 10, 30, 0).unwrap();
        Order {
            id: OrderId::new("1042"),
            order_number: "VP-20260118-1042".to_string(),
            user_id: None,
            kind: OrderKind::Purchase,
            items: vec![OrderItem::new(
                ProductSnapshot {
                    product_id: "esp32".into(),
                    name: "ESP32 DevKit V1".to_string(),
                    sku: None,
                    brand: None,
                    image_url: None,
                },
                8,
                Decimal::from(750),
            )],
            customer: CustomerSnapshot {
                name: "Anita <Rao>".to_string(),
                email: None,
                phone: Some("98765 43210".to_string()),
            },
            delivery_address: DeliveryAddress {
                full_name: "Anita Rao".to_string(),
                phone: "9876543210".to_string(),
                line1: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pincode: "560001".to_string(),
                ..DeliveryAddress::default()
            },
            pricing: Pricing::for_subtotal(Decimal::from(6000), Decimal::ZERO),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: at,
            updated_at: at,
            cancelled_at: None,
            cancellation_reason: None,
            delivered_at: None,
            estimated_delivery: None,
            tracking_number: None,
            tracking_events: Vec::new(),
        }
    }

    fn config() -> NotificationConfig {
        NotificationConfig {
            support_phone: Some("+91 80 4000 1234".to_string()),
            ..NotificationConfig::default()
        }
    }

    #[test]
    fn test_whatsapp_message_content() {
        let summary = ConfirmationSummary::new(&order(), None, &config());
        let message = WhatsAppTemplate { summary: &summary }.render().unwrap();

        assert!(message.contains("*Voltparts*"));
        assert!(message.contains("VP-20260118-1042"));
        assert!(message.contains("ESP32 DevKit V1 x 8: ₹6000.00"));
        assert!(message.contains("Shipping: FREE"));
        assert!(message.contains("*Total: ₹7080.00*"));
        assert!(message.contains("Cash on Delivery"));
        assert!(message.contains("+91 80 4000 1234"));
        assert!(!message.contains("Discount"));
        // Plain text is not escaped.
        assert!(message.contains("Anita <Rao>"));
    }

    #[test]
    fn test_email_html_is_escaped() {
        let summary = ConfirmationSummary::new(&order(), None, &config());
        let html = EmailTemplate { summary: &summary }.render().unwrap();
        assert!(html.contains("Anita &#60;Rao&#62;") || html.contains("Anita &lt;Rao&gt;"));
        assert!(html.contains("₹1080.00"));
        assert_eq!(
            email_subject(&order(), &config()),
            "Order Confirmed - VP-20260118-1042 | Voltparts"
        );
    }

    #[test]
    fn test_contact_fallback_to_user() {
        let mut order = order();
        order.customer.phone = None;
        let user = User {
            id: "7".into(),
            name: "Anita Rao".to_string(),
            email: Email::parse("anita@example.in").unwrap(),
            phone: Some("9123456780".to_string()),
            role: UserRole::Customer,
            created_at: None,
        };
        assert_eq!(contact_phone(&order, Some(&user)).as_deref(), Some("9123456780"));
        assert_eq!(contact_email(&order, Some(&user)).as_deref(), Some("anita@example.in"));
        assert_eq!(contact_phone(&order, None), None);
    }

    #[test]
    fn test_whatsapp_number_normalization() {
        assert_eq!(whatsapp_number("98765 43210"), "919876543210");
        assert_eq!(whatsapp_number("09876543210"), "919876543210");
        assert_eq!(whatsapp_number("+91-98765-43210"), "919876543210");
    }

    #[test]
    fn test_merge_succeeds_if_any_channel_does() {
        let result = NotificationResult::merge(vec![
            ChannelOutcome {
                channel: NotificationChannel::WhatsApp,
                success: false,
                message: String::new(),
            },
            ChannelOutcome {
                channel: NotificationChannel::Email,
                success: true,
                message: String::new(),
            },
        ]);
        assert!(result.success);
        assert_eq!(result.message, "Order confirmation sent via email");
        assert_eq!(result.channels.len(), 2);
    }
}
