//! Integration tests for WhatsApp and email order confirmations.

use voltparts_core::Order;
use voltparts_integration_tests::fixtures::{item, order_request};
use voltparts_integration_tests::{Failures, MockBackend};
use voltparts_storefront::Storefront;
use voltparts_storefront::services::{NotificationChannel, NotificationSettings};

const BOTH: NotificationSettings = NotificationSettings {
    whatsapp: true,
    email: true,
};

async fn setup() -> (MockBackend, Storefront, Order) {
    let backend = MockBackend::start().await.expect("Failed to start mock backend");
    let storefront = backend.storefront().expect("storefront");
    let order = storefront
        .orders()
        .create_order(order_request(
            None,
            vec![item("rpi-5-8gb", "Raspberry Pi 5 (8GB)", 7999, 1)],
        ))
        .await
        .expect("order created");
    (backend, storefront, order)
}

#[tokio::test]
async fn test_confirmation_on_both_channels() {
    let (backend, storefront, order) = setup().await;

    let result = storefront
        .notifications()
        .send_order_confirmation(&order, None, BOTH)
        .await;

    assert!(result.success);
    assert_eq!(result.message, "Order confirmation sent via WhatsApp and email");
    assert_eq!(result.channels.len(), 2);
    assert!(result.channels.iter().all(|c| c.success));

    let whatsapp = backend.whatsapp_messages();
    assert_eq!(whatsapp.len(), 1);
    assert_eq!(whatsapp[0]["phone"], "919876543210");
    let text = whatsapp[0]["message"].as_str().unwrap_or_default();
    assert!(text.contains(&order.order_number));
    assert!(text.contains("Raspberry Pi 5 (8GB) x 1"));

    let emails = backend.emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0]["to"], "anita@example.in");
    assert_eq!(
        emails[0]["subject"],
        format!("Order Confirmed - {} | Voltparts", order.order_number)
    );
    assert_eq!(emails[0]["order_number"], order.order_number.as_str());
    assert!(
        emails[0]["html"]
            .as_str()
            .unwrap_or_default()
            .contains("Hi Anita Rao")
    );
}

#[tokio::test]
async fn test_no_channel_makes_no_request() {
    let (backend, storefront, order) = setup().await;
    let before = backend.total_hits();

    let result = storefront
        .notifications()
        .send_order_confirmation(
            &order,
            None,
            NotificationSettings {
                whatsapp: false,
                email: false,
            },
        )
        .await;

    assert!(!result.success);
    assert!(result.channels.is_empty());
    assert_eq!(backend.total_hits(), before);
}

#[tokio::test]
async fn test_one_failed_channel_still_succeeds() {
    let (backend, storefront, order) = setup().await;
    backend.set_failures(Failures {
        whatsapp: true,
        ..Failures::default()
    });

    let result = storefront
        .notifications()
        .send_order_confirmation(&order, None, BOTH)
        .await;

    assert!(result.success);
    assert_eq!(result.message, "Order confirmation sent via email");
    let whatsapp = result
        .channels
        .iter()
        .find(|c| c.channel == NotificationChannel::WhatsApp)
        .expect("whatsapp outcome");
    assert!(!whatsapp.success);
    assert_eq!(backend.hits("whatsapp/send"), 1);
    assert_eq!(backend.emails().len(), 1);
}

#[tokio::test]
async fn test_all_channels_failing() {
    let (backend, storefront, order) = setup().await;
    backend.set_failures(Failures {
        whatsapp: true,
        email: true,
        ..Failures::default()
    });

    let result = storefront
        .notifications()
        .send_order_confirmation(&order, None, BOTH)
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "Order confirmation could not be sent");
    assert_eq!(result.channels.len(), 2);
}

#[tokio::test]
async fn test_channel_without_contact_is_skipped() {
    let backend = MockBackend::start().await.expect("Failed to start mock backend");
    let storefront = backend.storefront().expect("storefront");

    let mut request = order_request(None, vec![item("rpi-5-8gb", "Raspberry Pi 5 (8GB)", 7999, 1)]);
    request.customer.phone = None;
    request.delivery_address.phone = String::new();
    let order = storefront
        .orders()
        .create_order(request)
        .await
        .expect("order created");
    assert!(order.customer.phone.is_none());

    let whatsapp_only = NotificationSettings {
        whatsapp: true,
        email: false,
    };
    let result = storefront
        .notifications()
        .send_order_confirmation(&order, None, whatsapp_only)
        .await;
    assert!(!result.success);
    assert_eq!(backend.hits("whatsapp/send"), 0);

    let result = storefront
        .notifications()
        .send_order_confirmation(&order, None, BOTH)
        .await;
    assert!(result.success);
    assert_eq!(result.channels.len(), 1);
    assert_eq!(result.channels[0].channel, NotificationChannel::Email);
    assert_eq!(backend.hits("whatsapp/send"), 0);
}
