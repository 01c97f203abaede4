//! Cart commands.
//!
//! Each command drives the same cart surfaces the storefront uses, so the
//! CLI sees exactly the notices and validation messages a shopper would.

use std::io::Write;
use std::sync::Arc;

use baxoq_core::{ChannelSlug, LineId, ProductId, Quantity, VariantId};
use baxoq_storefront::cart::{
    CartService, CartSurface, CartView, CheckoutIdStore, LoadMode, NoticeLevel, SurfaceKind,
    SurfaceState, hosted_checkout_url,
};
use url::Url;

use super::CliError;

/// What to add: a specific variant, or a product's first variant.
#[derive(Debug, Clone)]
pub enum Item {
    Variant(VariantId),
    Product(ProductId),
}

/// One shopper's cart on one channel.
pub struct Shopper {
    service: CartService,
    store: Arc<dyn CheckoutIdStore>,
    channel: ChannelSlug,
}

impl Shopper {
    #[must_use]
    pub fn new(service: CartService, store: Arc<dyn CheckoutIdStore>, channel: ChannelSlug) -> Self {
        Self {
            service,
            store,
            channel,
        }
    }

    fn surface(&self, kind: SurfaceKind) -> CartSurface {
        CartSurface::new(
            kind,
            self.channel.clone(),
            self.service.clone(),
            Arc::clone(&self.store),
        )
    }

    /// Print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be loaded.
    pub async fn show(&self, out: &mut impl Write) -> Result<(), CliError> {
        let page = self.surface(SurfaceKind::Page);
        page.refresh(true).await;

        let model = page.snapshot();
        if let SurfaceState::Error(message) = &model.state {
            return Err(CliError::Failed(message.clone()));
        }
        render(&model.view(), out)?;
        Ok(())
    }

    /// Start a new, empty cart. The previous one is forgotten.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create a checkout.
    pub async fn create(&self, out: &mut impl Write) -> Result<(), CliError> {
        let checkout = self.service.create(self.store.as_ref(), &self.channel).await?;
        writeln!(out, "Created checkout {}", checkout.id)?;
        Ok(())
    }

    /// Add an item, creating the cart if there is none.
    ///
    /// # Errors
    ///
    /// Returns the shopper-facing message when the add fails.
    pub async fn add(&self, item: Item, quantity: Quantity, out: &mut impl Write) -> Result<(), CliError> {
        let variant_id = match item {
            Item::Variant(variant_id) => variant_id,
            Item::Product(product_id) => {
                self.service
                    .gateway()
                    .first_variant(&product_id, &self.channel)
                    .await?
            }
        };

        let button = self.surface(SurfaceKind::AddToCart);
        button.add_to_cart(&variant_id, quantity).await;
        finish(&button, out)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such line or the update fails.
    pub async fn set(&self, line_id: &LineId, quantity: Quantity, out: &mut impl Write) -> Result<(), CliError> {
        let page = self.page_with_line(line_id).await?;
        page.set_quantity(line_id, quantity).await;
        finish(&page, out)
    }

    /// One more of a line.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such line or the update fails.
    pub async fn increment(&self, line_id: &LineId, out: &mut impl Write) -> Result<(), CliError> {
        let page = self.page_with_line(line_id).await?;
        page.increment(line_id).await;
        finish(&page, out)
    }

    /// One less of a line. A line at quantity 1 is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such line or the update fails.
    pub async fn decrement(&self, line_id: &LineId, out: &mut impl Write) -> Result<(), CliError> {
        let page = self.page_with_line(line_id).await?;
        let at_minimum = page
            .snapshot()
            .checkout()
            .and_then(|checkout| checkout.line(line_id))
            .is_some_and(|line| line.quantity == Quantity::ONE);

        page.decrement(line_id).await;
        if at_minimum {
            writeln!(out, "Quantity is already 1; use `remove` to delete the line")?;
        }
        finish(&page, out)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such line or the removal fails.
    pub async fn remove(&self, line_id: &LineId, out: &mut impl Write) -> Result<(), CliError> {
        let page = self.page_with_line(line_id).await?;
        page.remove(line_id).await;
        finish(&page, out)
    }

    /// Print the hosted checkout URL for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no cart or it is empty.
    pub async fn checkout_url(&self, base: &Url, out: &mut impl Write) -> Result<(), CliError> {
        let load = self
            .service
            .load(self.store.as_ref(), &self.channel, LoadMode::Force)
            .await?;

        match load.checkout {
            Some(checkout) if !checkout.is_empty() => {
                writeln!(out, "{}", hosted_checkout_url(base, &self.channel, &checkout.id))?;
                Ok(())
            }
            Some(_) => Err(CliError::Failed(
                baxoq_storefront::cart::view::EMPTY_CART_MESSAGE.to_string(),
            )),
            None => Err(CliError::NoCart(self.channel.to_string())),
        }
    }

    /// Forget the stored checkout for the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if writing output fails.
    pub fn forget(&self, out: &mut impl Write) -> Result<(), CliError> {
        self.store.clear(&self.channel);
        writeln!(out, "Forgot checkout for channel {}", self.channel)?;
        Ok(())
    }

    async fn page_with_line(&self, line_id: &LineId) -> Result<CartSurface, CliError> {
        let page = self.surface(SurfaceKind::Page);
        page.mount().await;

        match page.state() {
            SurfaceState::Error(message) => Err(CliError::Failed(message)),
            SurfaceState::Ready(Some(checkout)) if checkout.line(line_id).is_some() => Ok(page),
            SurfaceState::Ready(Some(_)) => Err(CliError::UnknownLine(line_id.to_string())),
            _ => Err(CliError::NoCart(self.channel.to_string())),
        }
    }
}

/// Report a surface's outcome: the notice, then the cart.
fn finish(surface: &CartSurface, out: &mut impl Write) -> Result<(), CliError> {
    let model = surface.snapshot();
    if let Some(notice) = model.notice() {
        match notice.level {
            NoticeLevel::Error => return Err(CliError::Failed(notice.message.clone())),
            NoticeLevel::Success => writeln!(out, "{}", notice.message)?,
        }
    }
    render(&model.view(), out)?;
    Ok(())
}

/// Print a cart view as plain text.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render(view: &CartView, out: &mut impl Write) -> std::io::Result<()> {
    if let Some(empty) = &view.empty_state {
        writeln!(out, "{}", empty.message)?;
        writeln!(out, "Total: {}", view.total)?;
        return writeln!(out, "[{}]", empty.action_label);
    }

    for item in &view.items {
        let name = item.variant_name.as_ref().map_or_else(
            || item.product_name.clone(),
            |variant| format!("{} ({variant})", item.product_name),
        );
        writeln!(
            out,
            "{:>3} x {name}  {}  [{}]",
            item.quantity, item.line_total, item.id
        )?;
    }
    writeln!(out, "Items: {}", view.item_count)?;
    writeln!(out, "Total: {}", view.total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use baxoq_storefront::cart::{CartEvents, CartGateway, LocalCartCache, MemoryCheckoutIds};
    use baxoq_storefront::testing::InMemoryGateway;
    use rust_decimal::Decimal;

    use super::*;

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        store: Arc<MemoryCheckoutIds>,
        shopper: Shopper,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(InMemoryGateway::new());
        let store = Arc::new(MemoryCheckoutIds::new());
        let service = CartService::new(
            Arc::clone(&gateway) as Arc<dyn CartGateway>,
            LocalCartCache::new(Duration::from_secs(30)),
            CartEvents::new(),
        );
        let shopper = Shopper::new(
            service,
            Arc::clone(&store) as Arc<dyn CheckoutIdStore>,
            ChannelSlug::parse("default-channel").unwrap(),
        );
        Fixture {
            gateway,
            store,
            shopper,
        }
    }

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    fn variant() -> VariantId {
        VariantId::parse("v1").unwrap()
    }

    fn only_line(fx: &Fixture) -> LineId {
        let id = fx.store.get(&ChannelSlug::parse("default-channel").unwrap()).unwrap();
        fx.gateway.checkout(&id).unwrap().lines[0].id.clone()
    }

    #[tokio::test]
    async fn test_show_without_cart() {
        let fx = fixture();
        let mut out = Vec::new();
        fx.shopper.show(&mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("Your cart is empty"));
        assert!(text.contains("Total: 0.00"));
        assert!(text.contains("[Continue Shopping]"));
    }

    #[tokio::test]
    async fn test_add_then_show() {
        let fx = fixture();
        let mut out = Vec::new();
        fx.shopper
            .add(Item::Variant(variant()), Quantity::new(2).unwrap(), &mut out)
            .await
            .unwrap();

        let text = output(out);
        assert!(text.starts_with("Item added to cart successfully!"));
        assert!(text.contains("2 x Product v1"));
        assert!(text.contains("Total: 20.00 USD"));
    }

    #[tokio::test]
    async fn test_add_by_product_uses_first_variant() {
        let fx = fixture();
        let product = ProductId::parse("p1").unwrap();
        fx.gateway.add_variant(&VariantId::parse("p1-b").unwrap(), &product, "Tee", Decimal::ONE, None);
        fx.gateway.add_variant(&VariantId::parse("p1-a").unwrap(), &product, "Tee", Decimal::ONE, None);

        let mut out = Vec::new();
        fx.shopper
            .add(Item::Product(product), Quantity::ONE, &mut out)
            .await
            .unwrap();

        let id = fx.store.get(&ChannelSlug::parse("default-channel").unwrap()).unwrap();
        let checkout = fx.gateway.checkout(&id).unwrap();
        assert_eq!(checkout.lines[0].variant.id.as_str(), "p1-a");
    }

    #[tokio::test]
    async fn test_validation_message_surfaces_as_error() {
        let fx = fixture();
        fx.gateway.add_variant(
            &variant(),
            &ProductId::parse("p1").unwrap(),
            "Tee",
            Decimal::TEN,
            Some(1),
        );

        let err = fx
            .shopper
            .add(Item::Variant(variant()), Quantity::new(3).unwrap(), &mut Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not add items Tee. Only 1 remaining in stock.");
    }

    #[tokio::test]
    async fn test_increment_and_set() {
        let fx = fixture();
        fx.shopper
            .add(Item::Variant(variant()), Quantity::ONE, &mut Vec::new())
            .await
            .unwrap();
        let line = only_line(&fx);

        let mut out = Vec::new();
        fx.shopper.increment(&line, &mut out).await.unwrap();
        assert!(output(out).contains("Cart updated successfully"));

        fx.shopper
            .set(&line, Quantity::new(5).unwrap(), &mut Vec::new())
            .await
            .unwrap();
        let id = fx.store.get(&ChannelSlug::parse("default-channel").unwrap()).unwrap();
        assert_eq!(fx.gateway.checkout(&id).unwrap().total_quantity(), 5);
    }

    #[tokio::test]
    async fn test_decrement_at_one_is_noop() {
        let fx = fixture();
        fx.shopper
            .add(Item::Variant(variant()), Quantity::ONE, &mut Vec::new())
            .await
            .unwrap();
        let line = only_line(&fx);
        let before = fx.gateway.mutation_count();

        let mut out = Vec::new();
        fx.shopper.decrement(&line, &mut out).await.unwrap();

        assert_eq!(fx.gateway.mutation_count(), before);
        assert!(output(out).contains("use `remove`"));
    }

    #[tokio::test]
    async fn test_remove_only_line_empties_cart() {
        let fx = fixture();
        fx.shopper
            .add(Item::Variant(variant()), Quantity::ONE, &mut Vec::new())
            .await
            .unwrap();
        let line = only_line(&fx);

        let mut out = Vec::new();
        fx.shopper.remove(&line, &mut out).await.unwrap();
        let text = output(out);
        assert!(text.contains("Item removed from cart"));
        assert!(text.contains("Your cart is empty"));
    }

    #[tokio::test]
    async fn test_unknown_line() {
        let fx = fixture();
        fx.shopper
            .add(Item::Variant(variant()), Quantity::ONE, &mut Vec::new())
            .await
            .unwrap();

        let err = fx
            .shopper
            .remove(&LineId::parse("nope").unwrap(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::UnknownLine(_)));
    }

    #[tokio::test]
    async fn test_line_commands_need_a_cart() {
        let fx = fixture();
        let err = fx
            .shopper
            .increment(&LineId::parse("line-1").unwrap(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::NoCart(channel) if channel == "default-channel"));
    }

    #[tokio::test]
    async fn test_checkout_url() {
        let fx = fixture();
        let base: Url = "https://shop.example/checkout".parse().unwrap();

        let err = fx.shopper.checkout_url(&base, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::NoCart(_)));

        fx.shopper
            .add(Item::Variant(variant()), Quantity::ONE, &mut Vec::new())
            .await
            .unwrap();
        let mut out = Vec::new();
        fx.shopper.checkout_url(&base, &mut out).await.unwrap();
        assert!(output(out).starts_with("https://shop.example/checkout?checkout=checkout-1"));
    }

    #[tokio::test]
    async fn test_create_and_forget() {
        let fx = fixture();
        let channel = ChannelSlug::parse("default-channel").unwrap();

        let mut out = Vec::new();
        fx.shopper.create(&mut out).await.unwrap();
        assert!(output(out).starts_with("Created checkout checkout-1"));
        assert!(fx.store.get(&channel).is_some());

        fx.shopper.forget(&mut Vec::new()).unwrap();
        assert!(fx.store.get(&channel).is_none());
    }
}
