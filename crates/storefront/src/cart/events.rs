//! Cart change notifications.
//!
//! Every successful cart mutation publishes a [`CartEvent`] after the cache
//! has been written. Subscribed surfaces re-fetch on each event.

use std::future::Future;

use baxoq_core::{ChannelSlug, CheckoutId, ProductId};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Event name used on the wire (SSE event type and `HX-Trigger` header).
pub const CART_UPDATED: &str = "cart:updated";

const CHANNEL_CAPACITY: usize = 64;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CartEventKind {
    LineAdded,
    LineUpdated,
    LineRemoved,
    /// A new checkout replaced the previous one (created or recovered).
    Replaced,
}

/// Payload of a `cart:updated` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEvent {
    pub channel: ChannelSlug,
    pub checkout_id: CheckoutId,
    pub kind: CartEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}

impl CartEvent {
    #[must_use]
    pub const fn new(channel: ChannelSlug, checkout_id: CheckoutId, kind: CartEventKind) -> Self {
        Self {
            channel,
            checkout_id,
            kind,
            product_id: None,
            product_name: None,
        }
    }

    /// Attach the product that was added.
    #[must_use]
    pub fn with_product(mut self, product_id: ProductId, product_name: String) -> Self {
        self.product_id = Some(product_id);
        self.product_name = Some(product_name);
        self
    }
}

/// Notification bus shared by the service and all surfaces.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartEvent>,
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl CartEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Returns the number of subscribers reached. Having none is fine.
    pub fn publish(&self, event: CartEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => {
                debug!(subscribers = count, "Published {CART_UPDATED}");
                count
            }
            Err(_) => 0,
        }
    }

    /// A raw receiver, for streaming consumers such as SSE.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.sender.subscribe()
    }

    /// Run `handler` for every event until the subscription is dropped.
    ///
    /// Events are handled one at a time in publish order.
    pub fn listen<F, Fut>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(CartEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => handler(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cart event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }
}

/// Handle to a [`CartEvents::listen`] task. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
