//! Wire-to-domain conversions.
//!
//! A response that is missing identifiers or carries a zero quantity is
//! rejected rather than converted, so a malformed payload never reaches the
//! cache as a successful snapshot.

use baxoq_core::{CheckoutId, LineId, Money, ProductId, Quantity, VariantId};

use crate::saleor::CartError;
use crate::saleor::types::{
    Checkout, CheckoutFieldError, CheckoutLine, Product, Thumbnail, Variant,
};

use super::queries::{
    CheckoutErrorFields, CheckoutFields, CheckoutLineFields, MoneyFields, ThumbnailFields,
};

fn malformed(what: &str) -> CartError {
    CartError::remote(format!("Malformed checkout response: {what}"))
}

fn convert_money(money: MoneyFields) -> Money {
    Money::new(money.amount, money.currency.to_ascii_uppercase())
}

fn convert_thumbnail(thumbnail: ThumbnailFields) -> Thumbnail {
    Thumbnail {
        url: thumbnail.url,
        alt: thumbnail.alt.filter(|alt| !alt.is_empty()),
    }
}

fn convert_line(line: CheckoutLineFields) -> Result<CheckoutLine, CartError> {
    let quantity =
        Quantity::try_from(line.quantity).map_err(|e| malformed(&format!("line quantity: {e}")))?;

    Ok(CheckoutLine {
        id: LineId::parse(line.id).map_err(|e| malformed(&e.to_string()))?,
        quantity,
        variant: Variant {
            id: VariantId::parse(line.variant.id).map_err(|e| malformed(&e.to_string()))?,
            name: line.variant.name,
            product: Product {
                id: ProductId::parse(line.variant.product.id)
                    .map_err(|e| malformed(&e.to_string()))?,
                name: line.variant.product.name,
                slug: line.variant.product.slug,
                thumbnail: line.variant.product.thumbnail.map(convert_thumbnail),
            },
        },
        total: convert_money(line.total_price.gross),
    })
}

pub fn convert_checkout(checkout: CheckoutFields) -> Result<Checkout, CartError> {
    Ok(Checkout {
        id: CheckoutId::parse(checkout.id).map_err(|e| malformed(&e.to_string()))?,
        lines: checkout
            .lines
            .into_iter()
            .map(convert_line)
            .collect::<Result<_, _>>()?,
        total: convert_money(checkout.total_price.gross),
    })
}

pub fn convert_field_error(error: CheckoutErrorFields) -> CheckoutFieldError {
    CheckoutFieldError {
        field: error.field,
        message: error.message,
        code: error.code,
    }
}

/// Join field error messages the way they are shown to shoppers.
pub fn join_messages(errors: &[CheckoutFieldError]) -> String {
    errors
        .iter()
        .map(CheckoutFieldError::display_message)
        .collect::<Vec<_>>()
        .join("; ")
}
