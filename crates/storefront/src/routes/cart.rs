//! Cart route handlers.
//!
//! Reads go through the shared cart cache. Checkout IDs live in the
//! `checkoutId-<channel>` cookies.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::extract::CookieJar;
use baxoq_core::{ChannelSlug, CheckoutId};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, instrument, warn};

use super::{CartContext, resolve_channel};
use crate::cart::view::hosted_checkout_url;
use crate::cart::{CART_UPDATED, CartEvent, CartService, CartView, CheckoutCookies, LoadMode};
use crate::error::Result;
use crate::state::AppState;

/// Cart count badge response.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Cart view for a channel.
///
/// Serves the cached snapshot when there is one; a stale snapshot is
/// refreshed in the background for the next read.
#[instrument(skip(state, jar))]
pub async fn show(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse> {
    let channel = resolve_channel(&state, Some(&channel))?;
    let ctx = CartContext::new(&state, jar);

    let load = ctx
        .service
        .load(&ctx.cookies, &channel, LoadMode::Cached)
        .await?;
    if load.stale
        && let Some(key) = load.key
    {
        // Detached: the refresh outlives the request
        drop(ctx.service.spawn_refresh(key));
    }

    let view = CartView::from_checkout(load.checkout.as_ref());
    Ok((ctx.into_jar(), Json(view)))
}

/// Cart count badge. Failures show an empty badge.
#[instrument(skip(state, jar))]
pub async fn count(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse> {
    let channel = resolve_channel(&state, Some(&channel))?;
    let ctx = CartContext::new(&state, jar);

    let count = match ctx.service.load(&ctx.cookies, &channel, LoadMode::Cached).await {
        Ok(load) => load.checkout.map_or(0, |checkout| checkout.total_quantity()),
        Err(e) => {
            warn!("Failed to load cart count: {e}");
            0
        }
    };

    Ok((ctx.into_jar(), Json(CartCount { count })))
}

/// Stream `cart:updated` events for the caller's checkout.
///
/// Only events for the checkout stored in the channel cookie at connect time
/// are forwarded. Clients reconnect after a new checkout replaces it.
#[instrument(skip(state, jar))]
pub async fn events(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(channel): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let channel = resolve_channel(&state, Some(&channel))?;
    let cookies = CheckoutCookies::new(jar, state.cookie_policy());
    let checkout_id = CartService::key_for(&cookies, &channel).map(|key| key.checkout_id);

    debug!(checkout_id = ?checkout_id, "Cart event stream connected");

    let stream = BroadcastStream::new(state.cart().events().subscribe());
    let filtered = stream.filter_map(move |result| {
        let channel = channel.clone();
        let checkout_id = checkout_id.clone();
        async move {
            match result {
                Ok(event) if is_for(&event, &channel, checkout_id.as_ref()) => {
                    Some(Ok(to_sse_event(&event)))
                }
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cart event stream lagged");
                    None
                }
            }
        }
    });

    Ok(Sse::new(filtered).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Redirect to the hosted checkout, or back to the cart when there is
/// nothing to pay for.
#[instrument(skip(state, jar))]
pub async fn checkout(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(channel): Path<String>,
) -> Result<Response> {
    let channel = resolve_channel(&state, Some(&channel))?;
    let cart_page = format!("/{channel}/cart");
    let ctx = CartContext::new(&state, jar);

    let checkout = match ctx.service.load(&ctx.cookies, &channel, LoadMode::Force).await {
        Ok(load) => load.checkout.filter(|checkout| !checkout.is_empty()),
        Err(e) => {
            tracing::error!("Failed to get cart for checkout: {e}");
            None
        }
    };

    let target = checkout.map_or(cart_page, |checkout| {
        hosted_checkout_url(&state.config().checkout_url, &channel, &checkout.id).to_string()
    });
    Ok((ctx.into_jar(), Redirect::to(&target)).into_response())
}

fn is_for(event: &CartEvent, channel: &ChannelSlug, checkout_id: Option<&CheckoutId>) -> bool {
    &event.channel == channel && checkout_id.is_some_and(|id| &event.checkout_id == id)
}

fn to_sse_event(event: &CartEvent) -> Event {
    Event::default()
        .event(CART_UPDATED)
        .json_data(event)
        .unwrap_or_else(|_| Event::default().event(CART_UPDATED))
}
