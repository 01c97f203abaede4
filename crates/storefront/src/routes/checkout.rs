//! Checkout API handlers.
//!
//! Every handler returns the backend's snapshot after the operation; the
//! cart service has already written it to the cache and published
//! `cart:updated` by the time the response is built.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use baxoq_core::{CheckoutId, LineId, ProductId, Quantity, VariantId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{CartContext, cart_updated_trigger, resolve_channel};
use crate::cart::{CartKey, CheckoutIdStore};
use crate::error::{AppError, Result};
use crate::saleor::Checkout;
use crate::state::AppState;

/// `{success, checkout}` response body.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub checkout: Checkout,
}

impl CheckoutResponse {
    const fn ok(checkout: Checkout) -> Self {
        Self {
            success: true,
            checkout,
        }
    }
}

/// Create checkout request body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRequest {
    pub channel: Option<String>,
}

/// Add line request body for the lazy endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    pub checkout_id: Option<String>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub channel: Option<String>,
}

/// Add line request body for a known checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineToRequest {
    pub variant_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Update line request body.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: u32,
}

/// Optional `?channel=` on endpoints addressed by checkout ID.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelQuery {
    pub channel: Option<String>,
}

const fn default_quantity() -> u32 {
    1
}

/// Create a new checkout and remember it in the channel's cookie.
#[instrument(skip(state, jar))]
pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CreateRequest>,
) -> Result<impl IntoResponse> {
    let channel = resolve_channel(&state, body.channel.as_deref())?;
    let ctx = CartContext::new(&state, jar);

    let checkout = ctx.service.create(&ctx.cookies, &channel).await?;

    Ok((
        ctx.into_jar(),
        cart_updated_trigger(),
        Json(CheckoutResponse::ok(checkout)),
    ))
}

/// Add a product or variant, creating the checkout when none exists.
///
/// When only `productId` is given, its first variant is added. A supplied
/// `checkoutId` becomes the channel's current checkout; if it has expired a
/// new one replaces it.
#[instrument(skip(state, jar))]
pub async fn add_line(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<AddLineRequest>,
) -> Result<impl IntoResponse> {
    let channel = resolve_channel(&state, body.channel.as_deref())?;
    let quantity = Quantity::new(body.quantity)?;
    let ctx = CartContext::new(&state, jar);

    let variant_id = match (body.variant_id.as_deref(), body.product_id.as_deref()) {
        (Some(variant_id), _) => VariantId::parse(variant_id)?,
        (None, Some(product_id)) => {
            let product_id = ProductId::parse(product_id)?;
            ctx.service
                .gateway()
                .first_variant(&product_id, &channel)
                .await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either productId or variantId is required".to_string(),
            ));
        }
    };

    if let Some(checkout_id) = body.checkout_id.as_deref() {
        let checkout_id = CheckoutId::parse(checkout_id)?;
        ctx.cookies.set(&channel, &checkout_id);
    }

    let checkout = ctx
        .service
        .add_line(&ctx.cookies, &channel, &variant_id, quantity)
        .await?;

    Ok((
        ctx.into_jar(),
        cart_updated_trigger(),
        Json(CheckoutResponse::ok(checkout)),
    ))
}

/// Add a variant to a specific checkout.
#[instrument(skip(state, jar))]
pub async fn add_line_to(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(checkout_id): Path<String>,
    Query(query): Query<ChannelQuery>,
    Json(body): Json<AddLineToRequest>,
) -> Result<Response> {
    let key = cart_key(&state, &checkout_id, query.channel.as_deref())?;
    let variant_id = VariantId::parse(&body.variant_id)?;
    let quantity = Quantity::new(body.quantity)?;
    let ctx = CartContext::new(&state, jar);

    match ctx.service.add_line_to(&key, &variant_id, quantity).await {
        Ok(checkout) => Ok((cart_updated_trigger(), Json(checkout)).into_response()),
        Err(err) => Ok(ctx.reject(&key, err)),
    }
}

/// Set the quantity of a line.
#[instrument(skip(state, jar))]
pub async fn update_line(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((checkout_id, line_id)): Path<(String, String)>,
    Query(query): Query<ChannelQuery>,
    Json(body): Json<UpdateLineRequest>,
) -> Result<Response> {
    let key = cart_key(&state, &checkout_id, query.channel.as_deref())?;
    let line_id = LineId::parse(line_id)?;
    let quantity = Quantity::new(body.quantity)?;
    let ctx = CartContext::new(&state, jar);

    match ctx.service.update_line_quantity(&key, &line_id, quantity).await {
        Ok(checkout) => Ok((cart_updated_trigger(), Json(checkout)).into_response()),
        Err(err) => Ok(ctx.reject(&key, err)),
    }
}

/// Remove a line.
#[instrument(skip(state, jar))]
pub async fn remove_line(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((checkout_id, line_id)): Path<(String, String)>,
    Query(query): Query<ChannelQuery>,
) -> Result<Response> {
    let key = cart_key(&state, &checkout_id, query.channel.as_deref())?;
    let line_id = LineId::parse(line_id)?;
    let ctx = CartContext::new(&state, jar);

    match ctx.service.remove_line(&key, &line_id).await {
        Ok(checkout) => Ok((cart_updated_trigger(), Json(checkout)).into_response()),
        Err(err) => Ok(ctx.reject(&key, err)),
    }
}

fn cart_key(state: &AppState, checkout_id: &str, channel: Option<&str>) -> Result<CartKey> {
    let channel = resolve_channel(state, channel)?;
    let checkout_id = CheckoutId::parse(checkout_id)?;
    Ok(CartKey::new(channel, checkout_id))
}
