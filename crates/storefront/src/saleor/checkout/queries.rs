//! GraphQL documents and wire types for checkout operations.
//!
//! Every checkout-returning operation selects the same `CheckoutFields`
//! fragment so that all responses convert into one snapshot shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! checkout_fields_fragment {
    () => {
        r"
fragment CheckoutFields on Checkout {
  id
  totalPrice { gross { amount currency } }
  lines {
    id
    quantity
    totalPrice { gross { amount currency } }
    variant {
      id
      name
      product {
        id
        name
        slug
        thumbnail { url alt }
      }
    }
  }
}"
    };
}

macro_rules! checkout_errors_selection {
    () => {
        "errors { field message code }"
    };
}

pub const CHECKOUT_CREATE: &str = concat!(
    "mutation CheckoutCreate($channel: String!) {\n",
    "  checkoutCreate(input: { channel: $channel, lines: [] }) {\n",
    "    checkout { ...CheckoutFields }\n    ",
    checkout_errors_selection!(),
    "\n  }\n}\n",
    checkout_fields_fragment!(),
);

pub const CHECKOUT_FIND: &str = concat!(
    "query CheckoutFind($id: ID!) {\n",
    "  checkout(id: $id) { ...CheckoutFields }\n}\n",
    checkout_fields_fragment!(),
);

pub const CHECKOUT_LINES_ADD: &str = concat!(
    "mutation CheckoutLinesAdd($id: ID!, $variantId: ID!, $quantity: Int!) {\n",
    "  checkoutLinesAdd(id: $id, lines: [{ quantity: $quantity, variantId: $variantId }]) {\n",
    "    checkout { ...CheckoutFields }\n    ",
    checkout_errors_selection!(),
    "\n  }\n}\n",
    checkout_fields_fragment!(),
);

pub const CHECKOUT_LINES_UPDATE: &str = concat!(
    "mutation CheckoutLinesUpdate($id: ID!, $lineId: ID!, $quantity: Int!) {\n",
    "  checkoutLinesUpdate(id: $id, lines: [{ lineId: $lineId, quantity: $quantity }]) {\n",
    "    checkout { ...CheckoutFields }\n    ",
    checkout_errors_selection!(),
    "\n  }\n}\n",
    checkout_fields_fragment!(),
);

pub const CHECKOUT_LINES_DELETE: &str = concat!(
    "mutation CheckoutLinesDelete($id: ID!, $lineId: ID!) {\n",
    "  checkoutLinesDelete(id: $id, linesIds: [$lineId]) {\n",
    "    checkout { ...CheckoutFields }\n    ",
    checkout_errors_selection!(),
    "\n  }\n}\n",
    checkout_fields_fragment!(),
);

pub const PRODUCT_VARIANTS: &str = "query ProductVariants($id: ID!, $channel: String!) {
  product(id: $id, channel: $channel) {
    variants { id name }
  }
}
";

pub const PING: &str = "query Ping { shop { name } }\n";

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateVariables<'a> {
    pub channel: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FindVariables<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesAddVariables<'a> {
    pub id: &'a str,
    pub variant_id: &'a str,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesUpdateVariables<'a> {
    pub id: &'a str,
    pub line_id: &'a str,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinesDeleteVariables<'a> {
    pub id: &'a str,
    pub line_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProductVariantsVariables<'a> {
    pub id: &'a str,
    pub channel: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NoVariables {}

// =============================================================================
// Response data
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCreateData {
    pub checkout_create: Option<CheckoutMutationPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutFindData {
    pub checkout: Option<CheckoutFields>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinesAddData {
    pub checkout_lines_add: Option<CheckoutMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinesUpdateData {
    pub checkout_lines_update: Option<CheckoutMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLinesDeleteData {
    pub checkout_lines_delete: Option<CheckoutMutationPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ProductVariantsData {
    pub product: Option<ProductVariantsFields>,
}

#[derive(Debug, Deserialize)]
pub struct PingData {}

#[derive(Debug, Deserialize)]
pub struct CheckoutMutationPayload {
    pub checkout: Option<CheckoutFields>,
    #[serde(default)]
    pub errors: Vec<CheckoutErrorFields>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutErrorFields {
    pub field: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFields {
    pub id: String,
    pub total_price: TaxedMoneyFields,
    #[serde(default)]
    pub lines: Vec<CheckoutLineFields>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineFields {
    pub id: String,
    pub quantity: i64,
    pub total_price: TaxedMoneyFields,
    pub variant: VariantFields,
}

#[derive(Debug, Deserialize)]
pub struct VariantFields {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub product: ProductFields,
}

#[derive(Debug, Deserialize)]
pub struct ProductFields {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub thumbnail: Option<ThumbnailFields>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailFields {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaxedMoneyFields {
    pub gross: MoneyFields,
}

#[derive(Debug, Deserialize)]
pub struct MoneyFields {
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductVariantsFields {
    pub variants: Option<Vec<ProductVariantFields>>,
}

#[derive(Debug, Deserialize)]
pub struct ProductVariantFields {
    pub id: String,
}

/// Mutation response data that wraps a checkout payload.
pub trait MutationData {
    fn into_payload(self) -> Option<CheckoutMutationPayload>;
}

impl MutationData for CheckoutCreateData {
    fn into_payload(self) -> Option<CheckoutMutationPayload> {
        self.checkout_create
    }
}

impl MutationData for CheckoutLinesAddData {
    fn into_payload(self) -> Option<CheckoutMutationPayload> {
        self.checkout_lines_add
    }
}

impl MutationData for CheckoutLinesUpdateData {
    fn into_payload(self) -> Option<CheckoutMutationPayload> {
        self.checkout_lines_update
    }
}

impl MutationData for CheckoutLinesDeleteData {
    fn into_payload(self) -> Option<CheckoutMutationPayload> {
        self.checkout_lines_delete
    }
}
