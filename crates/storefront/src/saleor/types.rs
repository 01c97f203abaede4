//! Checkout domain types.
//!
//! Converted from Saleor GraphQL responses. These are the snapshots cached
//! locally and rendered by cart surfaces.

use baxoq_core::{CheckoutId, LineId, Money, ProductId, Quantity, VariantId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Checkout
// =============================================================================

/// A checkout (cart) snapshot as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Checkout identifier, persisted client side per channel.
    pub id: CheckoutId,
    /// Lines in backend order.
    pub lines: Vec<CheckoutLine>,
    /// Gross total, computed by the backend.
    pub total: Money,
}

impl Checkout {
    /// Sum of line quantities (the badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Whether the checkout has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: &LineId) -> Option<&CheckoutLine> {
        self.lines.iter().find(|line| &line.id == id)
    }
}

/// A single line in a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub id: LineId,
    pub quantity: Quantity,
    pub variant: Variant,
    /// Gross line total, computed by the backend.
    pub total: Money,
}

/// The purchasable variant referenced by a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub name: String,
    pub product: Product,
}

/// Product summary shown next to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub thumbnail: Option<Thumbnail>,
}

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub alt: Option<String>,
}

/// A field-level error reported by a checkout mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFieldError {
    pub field: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
}

impl CheckoutFieldError {
    /// Whether the error refers to the checkout itself not existing.
    #[must_use]
    pub fn is_checkout_not_found(&self) -> bool {
        self.code.as_deref() == Some("NOT_FOUND")
            && matches!(
                self.field.as_deref(),
                None | Some("id" | "checkoutId" | "token")
            )
    }

    /// Message shown to the shopper, falling back to the error code.
    #[must_use]
    pub fn display_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}
