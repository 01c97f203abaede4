//! Cart display data shared by the page, dropdown and JSON endpoints.

use baxoq_core::{ChannelSlug, CheckoutId};
use serde::Serialize;
use url::Url;

use crate::saleor::{Checkout, CheckoutLine};

/// Shown when the cart has no lines.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty";

/// Label of the empty-cart action that leads back to the catalog.
pub const CONTINUE_SHOPPING: &str = "Continue Shopping";

/// Cart item display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: String,
    pub product_name: String,
    pub product_slug: String,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub line_total: String,
    pub thumbnail: Option<ImageView>,
}

/// Image display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    pub url: String,
    pub alt: Option<String>,
}

/// What to show instead of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyState {
    pub message: &'static str,
    pub action_label: &'static str,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub checkout_id: Option<String>,
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u64,
    pub empty_state: Option<EmptyState>,
}

impl EmptyState {
    const CART: Self = Self {
        message: EMPTY_CART_MESSAGE,
        action_label: CONTINUE_SHOPPING,
    };
}

impl CartView {
    /// A cart with nothing in it (or no cart at all).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            checkout_id: None,
            items: Vec::new(),
            total: "0.00".to_string(),
            item_count: 0,
            empty_state: Some(EmptyState::CART),
        }
    }

    /// View for an optional snapshot.
    #[must_use]
    pub fn from_checkout(checkout: Option<&Checkout>) -> Self {
        checkout.map_or_else(Self::empty, Self::from)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Checkout> for CartView {
    fn from(checkout: &Checkout) -> Self {
        Self {
            checkout_id: Some(checkout.id.to_string()),
            items: checkout.lines.iter().map(CartItemView::from).collect(),
            total: checkout.total.to_string(),
            item_count: checkout.total_quantity(),
            empty_state: checkout.is_empty().then_some(EmptyState::CART),
        }
    }
}

impl From<&CheckoutLine> for CartItemView {
    fn from(line: &CheckoutLine) -> Self {
        Self {
            id: line.id.to_string(),
            product_name: line.variant.product.name.clone(),
            product_slug: line.variant.product.slug.clone(),
            variant_name: Some(line.variant.name.clone()).filter(|name| !name.is_empty()),
            quantity: line.quantity.get(),
            line_total: line.total.to_string(),
            thumbnail: line.variant.product.thumbnail.as_ref().map(|t| ImageView {
                url: t.url.clone(),
                alt: t.alt.clone(),
            }),
        }
    }
}

/// Hosted checkout page for a checkout.
#[must_use]
pub fn hosted_checkout_url(base: &Url, channel: &ChannelSlug, checkout_id: &CheckoutId) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("checkout", checkout_id.as_str())
        .append_pair("channel", channel.as_str());
    url
}
