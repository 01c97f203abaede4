//! The backend seam used by the cart service.

use async_trait::async_trait;
use baxoq_core::{ChannelSlug, CheckoutId, LineId, ProductId, Quantity, VariantId};

use crate::saleor::{CartError, Checkout};

/// Remote checkout operations.
///
/// Every operation is a single request. On success the full updated snapshot
/// is returned; the backend computes all totals.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Create an empty checkout in a channel.
    ///
    /// # Errors
    ///
    /// Field errors reported by the backend surface as a remote error.
    async fn create(&self, channel: &ChannelSlug) -> Result<Checkout, CartError>;

    /// Fetch a checkout by ID.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] when the backend has no such checkout.
    async fn fetch(&self, checkout_id: &CheckoutId) -> Result<Checkout, CartError>;

    /// Add a variant to a checkout.
    ///
    /// # Errors
    ///
    /// Field errors (e.g. insufficient stock) surface as
    /// [`CartError::Validation`] with the messages joined by `"; "`.
    async fn add_line(
        &self,
        checkout_id: &CheckoutId,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError>;

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Same as [`CartGateway::add_line`].
    async fn update_line_quantity(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError>;

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Same as [`CartGateway::add_line`].
    async fn remove_line(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
    ) -> Result<Checkout, CartError>;

    /// Resolve the first purchasable variant of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the product does not exist or has
    /// no variants in the channel.
    async fn first_variant(
        &self,
        product_id: &ProductId,
        channel: &ChannelSlug,
    ) -> Result<VariantId, CartError>;
}
