//! Saved delivery addresses.

use tracing::{debug, instrument};

use voltparts_core::{DeliveryAddress, SavedAddress};

use crate::api::conversions::{address_row, convert_saved_address};
use crate::api::wire::{SaveAddressBody, SavedAddressRow};
use crate::api::{ApiClient, ApiError};

/// Address book of the signed-in customer.
#[derive(Clone)]
pub struct AddressService {
    api: ApiClient,
}

impl AddressService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// List saved addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
        let rows: Vec<SavedAddressRow> = self
            .api
            .get("orders/addresses", &[])
            .await?
            .data
            .unwrap_or_default();

        let mut addresses: Vec<SavedAddress> =
            rows.into_iter().map(convert_saved_address).collect();
        addresses.sort_by_key(|a| !a.is_default);
        debug!(count = addresses.len(), "Loaded saved addresses");
        Ok(addresses)
    }

    /// Save an address to the address book.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self, address), fields(city = %address.city))]
    pub async fn save_address(
        &self,
        address: &DeliveryAddress,
        make_default: bool,
    ) -> Result<SavedAddress, ApiError> {
        let row: SavedAddressRow = self
            .api
            .post(
                "orders/addresses",
                &SaveAddressBody {
                    address: address_row(address),
                    is_default: make_default,
                },
            )
            .await?
            .into_data("saved address")?;
        Ok(convert_saved_address(row))
    }
}
