//! Delivery addresses.

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// A postal delivery address (India).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    /// Recipient name.
    pub full_name: String,
    /// Recipient phone.
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    /// Six-digit PIN code.
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

impl DeliveryAddress {
    /// Single-line rendering used in notifications and CLI output.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        parts.extend(self.line2.as_deref().filter(|s| !s.is_empty()));
        parts.extend(self.landmark.as_deref().filter(|s| !s.is_empty()));
        parts.push(&self.city);
        parts.push(&self.state);
        format!("{} - {}", parts.join(", "), self.pincode)
    }
}

/// An address saved to the customer's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: AddressId,
    pub address: DeliveryAddress,
    pub is_default: bool,
}
