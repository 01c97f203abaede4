//! Cart view surfaces: the cart page, the header dropdown and the
//! add-to-cart control.
//!
//! A surface owns a small state machine (`Idle -> Loading -> Ready | Error`)
//! plus the set of lines with a request in flight and a transient notice.
//! All cart state comes from [`CartService`]; a surface never edits a
//! snapshot itself.
//!
//! Surfaces are cheap to clone; clones share state, so a renderer can read
//! [`CartSurface::snapshot`] while a mutation is awaiting the backend.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use baxoq_core::{ChannelSlug, LineId, Quantity, VariantId};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::cache::CartKey;
use super::events::{CartEvent, Subscription};
use super::service::{CartService, LoadMode};
use super::session::CheckoutIdStore;
use super::view::CartView;
use crate::saleor::{CartError, Checkout};

pub const ADDED_TO_CART: &str = "Item added to cart successfully!";
pub const CART_UPDATED: &str = "Cart updated successfully";
pub const ITEM_REMOVED: &str = "Item removed from cart";

const LOAD_FAILED: &str = "Failed to load cart";
const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update cart";
const REMOVE_FAILED: &str = "Failed to remove item";
const CART_EXPIRED: &str = "Your cart has expired";
const SIGN_IN_AGAIN: &str = "Please sign in again";

const SUCCESS_NOTICE_TTL: Duration = Duration::from_secs(3);
const ERROR_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Which UI element a surface backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Page,
    Dropdown,
    AddToCart,
}

/// Load state of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceState {
    Idle,
    Loading,
    /// `None` means the shopper has no cart.
    Ready(Option<Checkout>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message that dismisses itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_string(),
            expires_at: Instant::now() + SUCCESS_NOTICE_TTL,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoticeLevel::Error,
            message,
            expires_at: Instant::now() + ERROR_NOTICE_TTL,
        }
    }

    fn is_active(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Everything a renderer needs.
#[derive(Debug, Clone)]
pub struct SurfaceModel {
    pub state: SurfaceState,
    pub mutating: HashSet<LineId>,
    pub adding: bool,
    /// Name of the product most recently added (dropdown badge).
    pub last_added: Option<String>,
    notice: Option<Notice>,
}

impl SurfaceModel {
    /// The current notice, if it has not expired.
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| n.is_active())
    }

    /// The snapshot to render, if ready.
    #[must_use]
    pub const fn checkout(&self) -> Option<&Checkout> {
        match &self.state {
            SurfaceState::Ready(checkout) => checkout.as_ref(),
            _ => None,
        }
    }

    /// Display data. Anything but a ready cart renders as empty.
    #[must_use]
    pub fn view(&self) -> CartView {
        CartView::from_checkout(self.checkout())
    }
}

/// One cart surface bound to a channel.
#[derive(Clone)]
pub struct CartSurface {
    kind: SurfaceKind,
    channel: ChannelSlug,
    service: CartService,
    store: Arc<dyn CheckoutIdStore>,
    model: Arc<Mutex<SurfaceModel>>,
    background: Arc<Mutex<Option<AbortHandle>>>,
}

impl CartSurface {
    #[must_use]
    pub fn new(
        kind: SurfaceKind,
        channel: ChannelSlug,
        service: CartService,
        store: Arc<dyn CheckoutIdStore>,
    ) -> Self {
        Self {
            kind,
            channel,
            service,
            store,
            model: Arc::new(Mutex::new(SurfaceModel {
                state: SurfaceState::Idle,
                mutating: HashSet::new(),
                adding: false,
                last_added: None,
                notice: None,
            })),
            background: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SurfaceKind {
        self.kind
    }

    #[must_use]
    pub const fn channel(&self) -> &ChannelSlug {
        &self.channel
    }

    /// A copy of the current model.
    #[must_use]
    pub fn snapshot(&self) -> SurfaceModel {
        self.model.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.snapshot().state
    }

    #[must_use]
    pub fn view(&self) -> CartView {
        self.snapshot().view()
    }

    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        self.snapshot().notice().cloned()
    }

    #[must_use]
    pub fn is_line_mutating(&self, line_id: &LineId) -> bool {
        self.snapshot().mutating.contains(line_id)
    }

    fn update<R>(&self, f: impl FnOnce(&mut SurfaceModel) -> R) -> R {
        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut model)
    }

    fn key(&self) -> Option<CartKey> {
        CartService::key_for(self.store.as_ref(), &self.channel)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the cart, using the cache when possible.
    pub async fn mount(&self) {
        self.refresh(false).await;
    }

    /// Reload the cart. `force` bypasses the cache.
    pub async fn refresh(&self, force: bool) {
        self.update(|m| {
            if matches!(m.state, SurfaceState::Idle | SurfaceState::Error(_)) {
                m.state = SurfaceState::Loading;
            }
        });

        let mode = if force { LoadMode::Force } else { LoadMode::Cached };
        match self.service.load(self.store.as_ref(), &self.channel, mode).await {
            Ok(load) => {
                self.update(|m| m.state = SurfaceState::Ready(load.checkout));
                if load.stale
                    && let Some(key) = load.key
                {
                    self.refresh_in_background(key);
                }
            }
            Err(err) => {
                warn!(error = %err, kind = ?self.kind, "Failed to load cart");
                self.update(|m| m.state = SurfaceState::Error(LOAD_FAILED.to_string()));
            }
        }
    }

    /// React to a cart notification by re-fetching, whatever the state.
    pub async fn on_event(&self, event: &CartEvent) {
        if event.channel != self.channel {
            return;
        }
        debug!(kind = ?self.kind, event = ?event.kind, "Cart notification");
        if self.kind == SurfaceKind::Dropdown
            && let Some(name) = &event.product_name
        {
            self.update(|m| m.last_added = Some(name.clone()));
        }
        self.refresh(true).await;
    }

    /// Subscribe this surface to the service's notifications.
    #[must_use]
    pub fn listen(&self) -> Subscription {
        let surface = self.clone();
        self.service.events().listen(move |event| {
            let surface = surface.clone();
            async move { surface.on_event(&event).await }
        })
    }

    /// Cancel any background refresh. The surface can be mounted again.
    pub fn unmount(&self) {
        let handle = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn refresh_in_background(&self, key: CartKey) {
        let service = self.service.clone();
        let store = Arc::clone(&self.store);
        let model = Arc::clone(&self.model);

        let handle = tokio::spawn(async move {
            let state = match service.fetch(&key).await {
                Ok(checkout) => SurfaceState::Ready(Some(checkout)),
                Err(err) if err.is_not_found() => {
                    service.forget(store.as_ref(), &key).await;
                    SurfaceState::Ready(None)
                }
                Err(err) => {
                    warn!(error = %err, "Background cart refresh failed");
                    return;
                }
            };
            model.lock().unwrap_or_else(PoisonError::into_inner).state = state;
        })
        .abort_handle();

        let previous = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set a line's quantity.
    pub async fn set_quantity(&self, line_id: &LineId, quantity: Quantity) {
        let Some(key) = self.key() else {
            return;
        };

        self.update(|m| m.mutating.insert(line_id.clone()));
        let result = self
            .service
            .update_line_quantity(&key, line_id, quantity)
            .await;
        self.update(|m| m.mutating.remove(line_id));

        self.finish(&key, result, CART_UPDATED, UPDATE_FAILED).await;
    }

    /// One more of a line.
    pub async fn increment(&self, line_id: &LineId) {
        if let Some(quantity) = self.line_quantity(line_id) {
            self.set_quantity(line_id, quantity.increment()).await;
        }
    }

    /// One less of a line. At quantity 1 nothing is sent.
    pub async fn decrement(&self, line_id: &LineId) {
        match self.line_quantity(line_id) {
            Some(quantity) if quantity > Quantity::ONE => {
                self.set_quantity(line_id, quantity.decrement()).await;
            }
            _ => debug!(line_id = %line_id, "Decrement at minimum ignored"),
        }
    }

    /// Remove a line.
    pub async fn remove(&self, line_id: &LineId) {
        let Some(key) = self.key() else {
            return;
        };

        self.update(|m| m.mutating.insert(line_id.clone()));
        let result = self.service.remove_line(&key, line_id).await;
        self.update(|m| m.mutating.remove(line_id));

        self.finish(&key, result, ITEM_REMOVED, REMOVE_FAILED).await;
    }

    /// Add a variant, creating the cart if the shopper has none.
    pub async fn add_to_cart(&self, variant_id: &VariantId, quantity: Quantity) {
        self.update(|m| m.adding = true);
        let result = self
            .service
            .add_line(self.store.as_ref(), &self.channel, variant_id, quantity)
            .await;
        self.update(|m| m.adding = false);

        match result {
            Ok(checkout) => {
                let checkout = match self.key() {
                    Some(key) => self.service.latest(&key, checkout).await,
                    None => checkout,
                };
                self.update(|m| {
                    m.state = SurfaceState::Ready(Some(checkout));
                    m.notice = Some(Notice::success(ADDED_TO_CART));
                });
            }
            Err(err) => {
                warn!(error = %err, variant_id = %variant_id, "Add to cart failed");
                self.update(|m| m.notice = Some(Notice::error(error_message(&err, ADD_FAILED))));
            }
        }
    }

    fn line_quantity(&self, line_id: &LineId) -> Option<Quantity> {
        self.snapshot()
            .checkout()
            .and_then(|checkout| checkout.line(line_id))
            .map(|line| line.quantity)
    }

    async fn finish(
        &self,
        key: &CartKey,
        result: Result<Checkout, CartError>,
        success: &str,
        failure: &str,
    ) {
        match result {
            Ok(checkout) => {
                // A response that lost to a later request is not rendered
                let checkout = self.service.latest(key, checkout).await;
                self.update(|m| {
                    m.state = SurfaceState::Ready(Some(checkout));
                    m.notice = Some(Notice::success(success));
                });
            }
            Err(err) if err.is_not_found() => {
                self.service.forget(self.store.as_ref(), key).await;
                self.update(|m| {
                    m.state = SurfaceState::Ready(None);
                    m.notice = Some(Notice::error(CART_EXPIRED.to_string()));
                });
            }
            Err(err) => {
                warn!(error = %err, kind = ?self.kind, "Cart mutation failed");
                self.update(|m| m.notice = Some(Notice::error(error_message(&err, failure))));
            }
        }
    }
}

/// Text shown to the shopper for a failed operation.
fn error_message(err: &CartError, fallback: &str) -> String {
    match err {
        CartError::Validation(message) => message.clone(),
        CartError::Unauthenticated(_) => SIGN_IN_AGAIN.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{CartEvents, CartGateway, LocalCartCache, MemoryCheckoutIds};
    use crate::testing::InMemoryGateway;

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        service: CartService,
        store: Arc<MemoryCheckoutIds>,
    }

    impl Fixture {
        fn new() -> Self {
            let gateway = Arc::new(InMemoryGateway::new());
            let service = CartService::new(
                Arc::clone(&gateway) as Arc<dyn CartGateway>,
                LocalCartCache::new(Duration::from_secs(30)),
                CartEvents::new(),
            );
            Self {
                gateway,
                service,
                store: Arc::new(MemoryCheckoutIds::new()),
            }
        }

        fn surface(&self, kind: SurfaceKind) -> CartSurface {
            CartSurface::new(
                kind,
                ChannelSlug::parse("default-channel").unwrap(),
                self.service.clone(),
                Arc::clone(&self.store) as Arc<dyn CheckoutIdStore>,
            )
        }
    }

    fn variant() -> VariantId {
        VariantId::parse("v1").unwrap()
    }

    #[tokio::test]
    async fn test_mount_without_cart_is_ready_empty() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        assert_eq!(page.state(), SurfaceState::Idle);

        page.mount().await;
        assert_eq!(page.state(), SurfaceState::Ready(None));
        assert!(page.view().is_empty());
    }

    #[tokio::test]
    async fn test_mount_failure_shows_error() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        fx.gateway.fail_next(CartError::remote("boom"));

        page.refresh(true).await;
        assert_eq!(page.state(), SurfaceState::Error(LOAD_FAILED.to_string()));
        assert!(page.view().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_notice_expires() {
        let fx = Fixture::new();
        let button = fx.surface(SurfaceKind::AddToCart);

        button.add_to_cart(&variant(), Quantity::ONE).await;
        let notice = button.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, ADDED_TO_CART);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(button.notice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_is_shown_verbatim() {
        let fx = Fixture::new();
        let button = fx.surface(SurfaceKind::AddToCart);
        fx.gateway.add_variant(
            &variant(),
            &baxoq_core::ProductId::parse("p1").unwrap(),
            "Linen Tee",
            rust_decimal::Decimal::TEN,
            Some(1),
        );

        button.add_to_cart(&variant(), Quantity::new(2).unwrap()).await;
        let notice = button.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(
            notice.message,
            "Could not add items Linen Tee. Only 1 remaining in stock."
        );

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(button.notice().is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(button.notice().is_none());
    }

    #[tokio::test]
    async fn test_decrement_at_one_sends_nothing() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        let line = page.snapshot().checkout().unwrap().lines[0].id.clone();
        let before = fx.gateway.mutation_count();

        page.decrement(&line).await;
        assert_eq!(fx.gateway.mutation_count(), before);
        assert_eq!(page.snapshot().checkout().unwrap().total_quantity(), 1);
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        let line = page.snapshot().checkout().unwrap().lines[0].id.clone();

        page.increment(&line).await;
        page.increment(&line).await;
        assert_eq!(page.snapshot().checkout().unwrap().total_quantity(), 3);

        page.decrement(&line).await;
        assert_eq!(page.snapshot().checkout().unwrap().total_quantity(), 2);
        assert_eq!(page.notice().unwrap().message, CART_UPDATED);
    }

    #[tokio::test]
    async fn test_line_mutating_while_in_flight() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        let line = page.snapshot().checkout().unwrap().lines[0].id.clone();

        let gate = fx.gateway.hold_mutations();
        let task = {
            let page = page.clone();
            let line = line.clone();
            tokio::spawn(async move { page.increment(&line).await })
        };

        while !page.is_line_mutating(&line) {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        task.await.unwrap();

        assert!(!page.is_line_mutating(&line));
        assert_eq!(page.snapshot().checkout().unwrap().total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_ready_state() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        let before = page.state();
        let line = page.snapshot().checkout().unwrap().lines[0].id.clone();

        fx.gateway.fail_next(CartError::remote("backend down"));
        page.increment(&line).await;

        assert_eq!(page.state(), before);
        assert_eq!(page.notice().unwrap().message, UPDATE_FAILED);
        assert!(!page.is_line_mutating(&line));
    }

    #[tokio::test]
    async fn test_remove_last_line_empties_cart() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;
        let line = page.snapshot().checkout().unwrap().lines[0].id.clone();

        page.remove(&line).await;
        let view = page.view();
        assert!(view.is_empty());
        assert_eq!(view.total, "0.00 USD");
        assert!(view.empty_state.is_some());
    }

    #[tokio::test]
    async fn test_dropdown_tracks_last_added() {
        let fx = Fixture::new();
        let dropdown = fx.surface(SurfaceKind::Dropdown);
        let button = fx.surface(SurfaceKind::AddToCart);
        let mut rx = fx.service.events().subscribe();

        button.add_to_cart(&variant(), Quantity::ONE).await;
        let event = rx.recv().await.unwrap();
        dropdown.on_event(&event).await;

        let model = dropdown.snapshot();
        assert_eq!(model.last_added.as_deref(), Some("Product v1"));
        assert_eq!(model.checkout().unwrap().total_quantity(), 1);
    }

    #[tokio::test]
    async fn test_other_channel_events_ignored() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        let event = CartEvent::new(
            ChannelSlug::parse("other").unwrap(),
            baxoq_core::CheckoutId::parse("c9").unwrap(),
            crate::cart::CartEventKind::LineAdded,
        );

        page.on_event(&event).await;
        assert_eq!(page.state(), SurfaceState::Idle);
        assert_eq!(fx.gateway.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_background_refresh() {
        let fx = Fixture::new();
        let page = fx.surface(SurfaceKind::Page);
        page.add_to_cart(&variant(), Quantity::ONE).await;

        tokio::time::advance(Duration::from_secs(31)).await;
        page.mount().await;
        assert!(page.background.lock().unwrap().is_some());

        page.unmount();
        assert!(page.background.lock().unwrap().is_none());
    }
}
