//! Cart state kept consistent across the cache, the notification bus and
//! every surface, over the in-memory backend.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use baxoq_core::Quantity;
use baxoq_storefront::cart::{
    CartKey, CartService, CartSurface, CheckoutIdStore, LoadMode, MemoryCheckoutIds, SurfaceKind,
    SurfaceState,
};
use baxoq_storefront::testing::InMemoryGateway;
use rust_decimal::Decimal;

use common::{channel, product, service, variant};

struct Shop {
    gateway: Arc<InMemoryGateway>,
    service: CartService,
    store: Arc<MemoryCheckoutIds>,
}

impl Shop {
    fn new() -> Self {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.add_variant(
            &variant("v1"),
            &product("p1"),
            "Linen Tee",
            Decimal::new(1999, 2),
            None,
        );
        let service = service(&gateway);
        Self {
            gateway,
            service,
            store: Arc::new(MemoryCheckoutIds::new()),
        }
    }

    fn surface(&self, kind: SurfaceKind, slug: &str) -> CartSurface {
        CartSurface::new(
            kind,
            channel(slug),
            self.service.clone(),
            Arc::clone(&self.store) as Arc<dyn CheckoutIdStore>,
        )
    }

    /// Put `quantity` of v1 in a new cart and return its key and line.
    async fn cart_with_line(&self, quantity: u32) -> (CartKey, baxoq_core::LineId) {
        let checkout = self
            .service
            .add_line(
                self.store.as_ref(),
                &channel("default-channel"),
                &variant("v1"),
                Quantity::new(quantity).unwrap(),
            )
            .await
            .unwrap();
        let key = CartService::key_for(self.store.as_ref(), &channel("default-channel")).unwrap();
        (key, checkout.lines[0].id.clone())
    }

    async fn cached_quantity(&self, key: &CartKey) -> u32 {
        let entry = self.service.cache().read(key).await.unwrap();
        entry.checkout.lines[0].quantity.get()
    }
}

/// Let listener tasks drain their queues.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ============================================================================
// Service and cache
// ============================================================================

#[tokio::test]
async fn test_add_to_fresh_cart() {
    let shop = Shop::new();

    let checkout = shop
        .service
        .add_line(
            shop.store.as_ref(),
            &channel("default-channel"),
            &variant("v1"),
            Quantity::new(2).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(shop.gateway.create_count(), 1);
    assert_eq!(checkout.lines.len(), 1);
    assert_eq!(checkout.lines[0].quantity.get(), 2);
    assert_eq!(checkout.total, checkout.lines[0].total);
    assert_eq!(checkout.total.amount, Decimal::new(3998, 2));
    assert_eq!(
        shop.store.get(&channel("default-channel")),
        Some(checkout.id.clone())
    );
}

#[tokio::test]
async fn test_update_then_fetch_reflects_quantity() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;

    shop.service
        .update_line_quantity(&key, &line_id, Quantity::new(4).unwrap())
        .await
        .unwrap();
    let fetched = shop.service.fetch(&key).await.unwrap();

    assert_eq!(fetched.line(&line_id).unwrap().quantity.get(), 4);
    assert_eq!(shop.cached_quantity(&key).await, 4);
}

#[tokio::test]
async fn test_sequential_updates_cache_last() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;

    for quantity in [3, 5] {
        shop.service
            .update_line_quantity(&key, &line_id, Quantity::new(quantity).unwrap())
            .await
            .unwrap();
    }

    assert_eq!(shop.cached_quantity(&key).await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_responses_keep_latest() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;
    shop.gateway.delay_quantity(3, Duration::from_millis(100));

    let slow = {
        let service = shop.service.clone();
        let key = key.clone();
        let line_id = line_id.clone();
        tokio::spawn(async move {
            service
                .update_line_quantity(&key, &line_id, Quantity::new(3).unwrap())
                .await
        })
    };
    // Let the first update reach the backend before issuing the second
    tokio::time::sleep(Duration::from_millis(1)).await;

    let fast = shop
        .service
        .update_line_quantity(&key, &line_id, Quantity::new(5).unwrap())
        .await
        .unwrap();
    let late = slow.await.unwrap().unwrap();

    assert_eq!(fast.lines[0].quantity.get(), 5);
    // The caller still sees its own response
    assert_eq!(late.lines[0].quantity.get(), 3);
    assert_eq!(shop.cached_quantity(&key).await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_surface_shows_latest_after_out_of_order_responses() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;
    shop.gateway.delay_quantity(3, Duration::from_millis(100));
    let mut events = shop.service.events().subscribe();

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    page.mount().await;

    let slow = {
        let page = page.clone();
        let line_id = line_id.clone();
        tokio::spawn(async move { page.set_quantity(&line_id, Quantity::new(3).unwrap()).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    page.set_quantity(&line_id, Quantity::new(5).unwrap()).await;
    slow.await.unwrap();

    assert_eq!(shop.cached_quantity(&key).await, 5);
    assert_eq!(page.view().items[0].quantity, 5);

    let mut published = 0;
    while events.try_recv().is_ok() {
        published += 1;
    }
    assert_eq!(published, 1);
}

#[tokio::test]
async fn test_expired_cart_replaced_on_add() {
    let shop = Shop::new();
    let (old_key, _) = shop.cart_with_line(1).await;
    shop.gateway.expire(&old_key.checkout_id);

    let checkout = shop
        .service
        .add_line(
            shop.store.as_ref(),
            &channel("default-channel"),
            &variant("v1"),
            Quantity::ONE,
        )
        .await
        .unwrap();

    assert_ne!(checkout.id, old_key.checkout_id);
    assert_eq!(shop.gateway.create_count(), 2);
    assert_eq!(
        shop.store.get(&channel("default-channel")),
        Some(checkout.id)
    );
    assert!(shop.service.cache().read(&old_key).await.is_none());
}

#[tokio::test]
async fn test_load_forgets_expired_cart() {
    let shop = Shop::new();
    let (key, _) = shop.cart_with_line(1).await;
    shop.gateway.expire(&key.checkout_id);

    let load = shop
        .service
        .load(shop.store.as_ref(), &channel("default-channel"), LoadMode::Force)
        .await
        .unwrap();

    assert!(load.checkout.is_none());
    assert_eq!(shop.store.get(&channel("default-channel")), None);
}

#[tokio::test]
async fn test_channels_keep_separate_carts() {
    let shop = Shop::new();
    shop.cart_with_line(1).await;

    let other = shop
        .service
        .add_line(
            shop.store.as_ref(),
            &channel("channel-pln"),
            &variant("v1"),
            Quantity::ONE,
        )
        .await
        .unwrap();

    let default_id = shop.store.get(&channel("default-channel")).unwrap();
    assert_ne!(other.id, default_id);
    assert_eq!(shop.gateway.create_count(), 2);
}

// ============================================================================
// Surfaces
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_each_surface_refetches_once_per_publish() {
    let shop = Shop::new();
    shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    let dropdown = shop.surface(SurfaceKind::Dropdown, "default-channel");
    let elsewhere = shop.surface(SurfaceKind::Page, "channel-pln");
    let button = shop.surface(SurfaceKind::AddToCart, "default-channel");
    page.mount().await;
    dropdown.mount().await;

    let _page_sub = page.listen();
    let _dropdown_sub = dropdown.listen();
    let _elsewhere_sub = elsewhere.listen();
    settle().await;

    let before = shop.gateway.fetch_count();
    button.add_to_cart(&variant("v1"), Quantity::new(2).unwrap()).await;
    settle().await;

    assert_eq!(shop.gateway.fetch_count() - before, 2);
    assert_eq!(page.view().items[0].quantity, 3);
    assert_eq!(dropdown.view().items[0].quantity, 3);
    assert_eq!(
        dropdown.snapshot().last_added.as_deref(),
        Some("Linen Tee")
    );
    assert!(page.snapshot().last_added.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_subscription_stops_refetching() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    page.mount().await;
    let subscription = page.listen();
    subscription.unsubscribe();
    settle().await;

    let before = shop.gateway.fetch_count();
    shop.service
        .update_line_quantity(&key, &line_id, Quantity::new(2).unwrap())
        .await
        .unwrap();
    settle().await;

    assert_eq!(shop.gateway.fetch_count(), before);
}

#[tokio::test(start_paused = true)]
async fn test_update_on_one_surface_reaches_the_other() {
    let shop = Shop::new();
    let (_, line_id) = shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    let dropdown = shop.surface(SurfaceKind::Dropdown, "default-channel");
    page.mount().await;
    dropdown.mount().await;
    let _sub = dropdown.listen();

    page.increment(&line_id).await;
    settle().await;

    assert_eq!(page.view().items[0].quantity, 2);
    assert_eq!(dropdown.view().items[0].quantity, 2);
    assert_eq!(dropdown.view().item_count, 2);
}

#[tokio::test]
async fn test_remove_only_line_empties_view() {
    let shop = Shop::new();
    let (_, line_id) = shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    page.mount().await;
    page.remove(&line_id).await;

    let view = page.view();
    assert!(view.items.is_empty());
    assert_eq!(view.item_count, 0);
    assert_eq!(view.total, "0.00 USD");
    assert_eq!(view.empty_state.unwrap().action_label, "Continue Shopping");
}

#[tokio::test]
async fn test_decrement_at_one_sends_nothing() {
    let shop = Shop::new();
    let (_, line_id) = shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    page.mount().await;
    let before = shop.gateway.mutation_count();
    page.decrement(&line_id).await;

    assert_eq!(shop.gateway.mutation_count(), before);
    assert_eq!(page.view().items[0].quantity, 1);
}

#[tokio::test]
async fn test_expired_cart_during_update_is_recovered() {
    let shop = Shop::new();
    let (key, line_id) = shop.cart_with_line(1).await;

    let page = shop.surface(SurfaceKind::Page, "default-channel");
    page.mount().await;
    shop.gateway.expire(&key.checkout_id);

    page.set_quantity(&line_id, Quantity::new(2).unwrap()).await;

    assert_eq!(page.state(), SurfaceState::Ready(None));
    assert_eq!(page.notice().unwrap().message, "Your cart has expired");
    assert_eq!(shop.store.get(&channel("default-channel")), None);

    // The next add starts a new cart
    page.add_to_cart(&variant("v1"), Quantity::ONE).await;
    let new_id = shop.store.get(&channel("default-channel")).unwrap();
    assert_ne!(new_id, key.checkout_id);
    assert_eq!(page.view().item_count, 1);
}
