//! Cart operations shared by every surface and HTTP handler.
//!
//! Each mutation takes a sequence number, calls the gateway once, writes the
//! returned snapshot through to the cache and then publishes a
//! [`CartEvent`]. Nothing is applied optimistically.

use std::sync::Arc;

use baxoq_core::{ChannelSlug, LineId, Quantity, VariantId};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use super::cache::{CartKey, LocalCartCache};
use super::events::{CartEvent, CartEventKind, CartEvents};
use super::gateway::CartGateway;
use super::session::CheckoutIdStore;
use crate::saleor::{CartError, Checkout};

/// Whether a read may be answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Serve a cached snapshot when one exists (stale ones included).
    Cached,
    /// Always ask the backend.
    Force,
}

/// Result of [`CartService::load`].
#[derive(Debug, Clone)]
pub struct CartLoad {
    /// Cart the snapshot belongs to, if a checkout ID is stored.
    pub key: Option<CartKey>,
    /// `None` when the shopper has no cart (or it expired).
    pub checkout: Option<Checkout>,
    /// The snapshot came from the cache and is older than the TTL.
    pub stale: bool,
}

impl CartLoad {
    const fn empty() -> Self {
        Self {
            key: None,
            checkout: None,
            stale: false,
        }
    }
}

/// Cart operations over a gateway, the shared cache and the event bus.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct CartService {
    gateway: Arc<dyn CartGateway>,
    cache: LocalCartCache,
    events: CartEvents,
}

impl CartService {
    #[must_use]
    pub fn new(gateway: Arc<dyn CartGateway>, cache: LocalCartCache, events: CartEvents) -> Self {
        Self {
            gateway,
            cache,
            events,
        }
    }

    /// The same cache and bus over a different gateway (e.g. one carrying a
    /// shopper's access token).
    #[must_use]
    pub fn with_gateway(&self, gateway: Arc<dyn CartGateway>) -> Self {
        Self {
            gateway,
            cache: self.cache.clone(),
            events: self.events.clone(),
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &LocalCartCache {
        &self.cache
    }

    #[must_use]
    pub const fn events(&self) -> &CartEvents {
        &self.events
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn CartGateway {
        self.gateway.as_ref()
    }

    /// The cache key for a channel's stored checkout, if any.
    #[must_use]
    pub fn key_for(store: &dyn CheckoutIdStore, channel: &ChannelSlug) -> Option<CartKey> {
        store
            .get(channel)
            .map(|checkout_id| CartKey::new(channel.clone(), checkout_id))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read the shopper's cart.
    ///
    /// A missing checkout is not an error: the stored ID is cleared and the
    /// load reports no cart. Stale cache entries are returned with
    /// `stale = true`; the caller decides whether to refresh in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns remote and authentication errors from the backend. The cached
    /// entry is dropped so a failed read never leaves stale data looking
    /// authoritative.
    #[instrument(skip(self, store), fields(channel = %channel))]
    pub async fn load(
        &self,
        store: &dyn CheckoutIdStore,
        channel: &ChannelSlug,
        mode: LoadMode,
    ) -> Result<CartLoad, CartError> {
        let Some(key) = Self::key_for(store, channel) else {
            return Ok(CartLoad::empty());
        };

        if mode == LoadMode::Cached
            && let Some(entry) = self.cache.read(&key).await
        {
            let stale = !entry.is_fresh(self.cache.ttl());
            debug!(stale, "Cart cache hit");
            return Ok(CartLoad {
                key: Some(key),
                checkout: Some(entry.checkout),
                stale,
            });
        }

        match self.fetch(&key).await {
            Ok(checkout) => Ok(CartLoad {
                key: Some(key),
                checkout: Some(checkout),
                stale: false,
            }),
            Err(err) if err.is_not_found() => {
                info!(checkout_id = %key.checkout_id, "Stored checkout no longer exists");
                self.forget(store, &key).await;
                Ok(CartLoad::empty())
            }
            Err(err) => {
                self.cache.invalidate(&key).await;
                Err(err)
            }
        }
    }

    /// Fetch a cart from the backend and write it to the cache.
    ///
    /// If a later request has already been cached, that snapshot is returned
    /// instead of the fetched one.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged. A missing checkout also drops the
    /// cache entry.
    pub async fn fetch(&self, key: &CartKey) -> Result<Checkout, CartError> {
        let sequence = self.cache.next_sequence();
        let checkout = match self.gateway.fetch(&key.checkout_id).await {
            Ok(checkout) => checkout,
            Err(err) => return Err(self.discard_missing(key, err).await),
        };
        if self.cache.write(key.clone(), checkout.clone(), sequence).await {
            Ok(checkout)
        } else {
            Ok(self.latest(key, checkout).await)
        }
    }

    /// The newest snapshot known for a cart: the cached one, or `fallback`
    /// when nothing is cached.
    pub async fn latest(&self, key: &CartKey, fallback: Checkout) -> Checkout {
        self.cache
            .read(key)
            .await
            .map_or(fallback, |entry| entry.checkout)
    }

    /// Refresh a cart in the background, e.g. after serving a stale snapshot.
    ///
    /// Failures are logged; a missing checkout drops the cache entry.
    #[must_use = "dropping the handle does not cancel the refresh"]
    pub fn spawn_refresh(&self, key: CartKey) -> AbortHandle {
        let service = self.clone();
        tokio::spawn(async move {
            match service.fetch(&key).await {
                Ok(_) => debug!(checkout_id = %key.checkout_id, "Background cart refresh done"),
                Err(err) if err.is_not_found() => {
                    debug!(checkout_id = %key.checkout_id, "Refreshed cart no longer exists");
                }
                Err(err) => warn!(error = %err, "Background cart refresh failed"),
            }
        })
        .abort_handle()
    }

    /// Forget a cart: clear the stored ID and drop its cache entry.
    pub async fn forget(&self, store: &dyn CheckoutIdStore, key: &CartKey) {
        store.clear(&key.channel);
        self.cache.invalidate(key).await;
    }

    // =========================================================================
    // Cart lifecycle
    // =========================================================================

    /// Create a new empty cart and make it the channel's current cart.
    ///
    /// Publishes [`CartEventKind::Replaced`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to create a checkout.
    #[instrument(skip(self, store), fields(channel = %channel))]
    pub async fn create(
        &self,
        store: &dyn CheckoutIdStore,
        channel: &ChannelSlug,
    ) -> Result<Checkout, CartError> {
        let (key, checkout, sequence) = self.start_checkout(store, channel).await?;
        let event = CartEvent::new(key.channel.clone(), key.checkout_id.clone(), CartEventKind::Replaced);
        Ok(self.commit(key, checkout, sequence, event).await)
    }

    /// Return the channel's current cart, creating one if none is stored or
    /// the stored one no longer exists.
    ///
    /// # Errors
    ///
    /// Returns remote errors from the fetch or the create.
    #[instrument(skip(self, store), fields(channel = %channel))]
    pub async fn find_or_create(
        &self,
        store: &dyn CheckoutIdStore,
        channel: &ChannelSlug,
    ) -> Result<Checkout, CartError> {
        if let Some(key) = Self::key_for(store, channel) {
            match self.fetch(&key).await {
                Ok(checkout) => return Ok(checkout),
                Err(err) if err.is_not_found() => {
                    info!(checkout_id = %key.checkout_id, "Replacing expired checkout");
                    self.forget(store, &key).await;
                }
                Err(err) => return Err(err),
            }
        }

        let (key, checkout, sequence) = self.start_checkout(store, channel).await?;
        self.cache.write(key, checkout.clone(), sequence).await;
        Ok(checkout)
    }

    async fn start_checkout(
        &self,
        store: &dyn CheckoutIdStore,
        channel: &ChannelSlug,
    ) -> Result<(CartKey, Checkout, u64), CartError> {
        let sequence = self.cache.next_sequence();
        let checkout = self.gateway.create(channel).await?;
        store.set(channel, &checkout.id);
        info!(checkout_id = %checkout.id, "Created checkout");
        Ok((
            CartKey::new(channel.clone(), checkout.id.clone()),
            checkout,
            sequence,
        ))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a variant to the channel's cart, creating the cart if needed.
    ///
    /// If the stored checkout has expired it is replaced once and the add is
    /// retried on the new cart.
    ///
    /// # Errors
    ///
    /// Returns validation errors verbatim from the backend, or remote errors.
    #[instrument(skip(self, store), fields(channel = %channel, variant_id = %variant_id))]
    pub async fn add_line(
        &self,
        store: &dyn CheckoutIdStore,
        channel: &ChannelSlug,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        if let Some(key) = Self::key_for(store, channel) {
            match self.add_line_to(&key, variant_id, quantity).await {
                Err(err) if err.is_not_found() => {
                    warn!(checkout_id = %key.checkout_id, "Checkout expired during add, replacing");
                    self.forget(store, &key).await;
                }
                other => return other,
            }
        }

        let (key, checkout, sequence) = self.start_checkout(store, channel).await?;
        self.cache.write(key.clone(), checkout, sequence).await;
        self.add_line_to(&key, variant_id, quantity).await
    }

    /// Add a variant to a specific cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the cart does not exist.
    pub async fn add_line_to(
        &self,
        key: &CartKey,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        let sequence = self.cache.next_sequence();
        let checkout = match self
            .gateway
            .add_line(&key.checkout_id, variant_id, quantity)
            .await
        {
            Ok(checkout) => checkout,
            Err(err) => return Err(self.discard_missing(key, err).await),
        };

        let mut event = CartEvent::new(key.channel.clone(), checkout.id.clone(), CartEventKind::LineAdded);
        if let Some(line) = checkout.lines.iter().find(|l| &l.variant.id == variant_id) {
            event = event.with_product(
                line.variant.product.id.clone(),
                line.variant.product.name.clone(),
            );
        }

        Ok(self.commit(key.clone(), checkout, sequence, event).await)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns validation errors verbatim from the backend, or remote errors.
    #[instrument(skip(self), fields(checkout_id = %key.checkout_id, line_id = %line_id, quantity = %quantity))]
    pub async fn update_line_quantity(
        &self,
        key: &CartKey,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        let sequence = self.cache.next_sequence();
        let checkout = match self
            .gateway
            .update_line_quantity(&key.checkout_id, line_id, quantity)
            .await
        {
            Ok(checkout) => checkout,
            Err(err) => return Err(self.discard_missing(key, err).await),
        };

        let mut event = CartEvent::new(key.channel.clone(), checkout.id.clone(), CartEventKind::LineUpdated);
        if let Some(line) = checkout.line(line_id) {
            event = event.with_product(
                line.variant.product.id.clone(),
                line.variant.product.name.clone(),
            );
        }

        Ok(self.commit(key.clone(), checkout, sequence, event).await)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns validation errors verbatim from the backend, or remote errors.
    #[instrument(skip(self), fields(checkout_id = %key.checkout_id, line_id = %line_id))]
    pub async fn remove_line(&self, key: &CartKey, line_id: &LineId) -> Result<Checkout, CartError> {
        let sequence = self.cache.next_sequence();
        let checkout = match self.gateway.remove_line(&key.checkout_id, line_id).await {
            Ok(checkout) => checkout,
            Err(err) => return Err(self.discard_missing(key, err).await),
        };

        let event = CartEvent::new(key.channel.clone(), checkout.id.clone(), CartEventKind::LineRemoved);
        Ok(self.commit(key.clone(), checkout, sequence, event).await)
    }

    /// Write through to the cache, then notify.
    ///
    /// A snapshot that lost to a later request is returned to the caller but
    /// neither cached nor published.
    async fn commit(
        &self,
        key: CartKey,
        checkout: Checkout,
        sequence: u64,
        event: CartEvent,
    ) -> Checkout {
        if self.cache.write(key, checkout.clone(), sequence).await {
            self.events.publish(event);
        } else {
            debug!(checkout_id = %checkout.id, sequence, "Late response not published");
        }
        checkout
    }

    /// Drop the cache entry of a cart the backend no longer has.
    async fn discard_missing(&self, key: &CartKey, err: CartError) -> CartError {
        if err.is_not_found() {
            info!(checkout_id = %key.checkout_id, "Checkout no longer exists");
            self.cache.invalidate(key).await;
        }
        err
    }
}
