//! In-memory [`CartGateway`] for tests.
//!
//! Behaves like the backend for the operations the storefront uses: it
//! computes totals, merges repeated adds of the same variant and reports
//! missing checkouts as [`CartError::NotFound`]. Responses can be delayed per
//! quantity, held behind a gate, or replaced with an injected error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use baxoq_core::{ChannelSlug, CheckoutId, LineId, Money, ProductId, Quantity, VariantId};
use rust_decimal::Decimal;
use tokio::sync::Notify;

use crate::cart::CartGateway;
use crate::saleor::{CartError, Checkout, CheckoutLine, Product, Variant};

const CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
struct CatalogEntry {
    product_id: ProductId,
    product_name: String,
    unit_price: Decimal,
    stock: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    checkouts: HashMap<CheckoutId, Checkout>,
    catalog: HashMap<VariantId, CatalogEntry>,
    delays: HashMap<u32, Duration>,
    fail_next: Option<CartError>,
    gate: Option<Arc<Notify>>,
}

/// A fake commerce backend.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
    next_id: AtomicU64,
    creates: AtomicUsize,
    fetches: AtomicUsize,
    mutations: AtomicUsize,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a variant. Unregistered variants cost 10.00 with no stock limit.
    pub fn add_variant(
        &self,
        variant_id: &VariantId,
        product_id: &ProductId,
        product_name: &str,
        unit_price: Decimal,
        stock: Option<u32>,
    ) {
        self.state().catalog.insert(
            variant_id.clone(),
            CatalogEntry {
                product_id: product_id.clone(),
                product_name: product_name.to_string(),
                unit_price,
                stock,
            },
        );
    }

    /// Delay responses to mutations that set this quantity.
    pub fn delay_quantity(&self, quantity: u32, delay: Duration) {
        self.state().delays.insert(quantity, delay);
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: CartError) {
        self.state().fail_next = Some(error);
    }

    /// Hold every mutation response until the returned gate is notified.
    pub fn hold_mutations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().gate = Some(Arc::clone(&gate));
        gate
    }

    /// Stop holding mutations.
    pub fn release_mutations(&self) {
        self.state().gate = None;
    }

    /// Drop a checkout, as if it expired on the backend.
    pub fn expire(&self, checkout_id: &CheckoutId) {
        self.state().checkouts.remove(checkout_id);
    }

    /// The backend's current view of a checkout.
    #[must_use]
    pub fn checkout(&self, checkout_id: &CheckoutId) -> Option<Checkout> {
        self.state().checkouts.get(checkout_id).cloned()
    }

    #[must_use]
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Result<(), CartError> {
        self.state().fail_next.take().map_or(Ok(()), Err)
    }

    fn catalog_entry(&self, variant_id: &VariantId) -> Result<CatalogEntry, CartError> {
        if let Some(entry) = self.state().catalog.get(variant_id) {
            return Ok(entry.clone());
        }
        Ok(CatalogEntry {
            product_id: ProductId::parse(format!("product-{variant_id}"))?,
            product_name: format!("Product {variant_id}"),
            unit_price: Decimal::TEN,
            stock: None,
        })
    }

    /// Apply a change to a checkout and return the new snapshot.
    fn apply(
        &self,
        checkout_id: &CheckoutId,
        change: impl FnOnce(&mut Checkout, &HashMap<VariantId, CatalogEntry>) -> Result<(), CartError>,
    ) -> Result<Checkout, CartError> {
        let mut state = self.state();
        let State {
            checkouts, catalog, ..
        } = &mut *state;
        let checkout = checkouts
            .get_mut(checkout_id)
            .ok_or_else(|| CartError::NotFound(format!("Checkout not found: {checkout_id}")))?;
        change(checkout, catalog)?;
        recompute(checkout, catalog);
        Ok(checkout.clone())
    }

    /// Wait for the configured delay and gate before answering.
    async fn respond(&self, quantity: Option<u32>, result: Result<Checkout, CartError>) -> Result<Checkout, CartError> {
        let (delay, gate) = {
            let state = self.state();
            (
                quantity.and_then(|q| state.delays.get(&q).copied()),
                state.gate.clone(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

fn recompute(checkout: &mut Checkout, catalog: &HashMap<VariantId, CatalogEntry>) {
    let mut total = Decimal::ZERO;
    for line in &mut checkout.lines {
        let unit = catalog
            .get(&line.variant.id)
            .map_or(Decimal::TEN, |entry| entry.unit_price);
        let line_total = unit * Decimal::from(line.quantity.get());
        line.total = Money::new(line_total, CURRENCY.to_string());
        total += line_total;
    }
    checkout.total = Money::new(total, CURRENCY.to_string());
}

fn check_stock(entry: &CatalogEntry, quantity: Quantity) -> Result<(), CartError> {
    match entry.stock {
        Some(stock) if quantity.get() > stock => Err(CartError::Validation(format!(
            "Could not add items {}. Only {stock} remaining in stock.",
            entry.product_name
        ))),
        _ => Ok(()),
    }
}

#[async_trait]
impl CartGateway for InMemoryGateway {
    async fn create(&self, _channel: &ChannelSlug) -> Result<Checkout, CartError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = CheckoutId::parse(format!("checkout-{n}"))?;
        let checkout = Checkout {
            id: id.clone(),
            lines: Vec::new(),
            total: Money::zero(CURRENCY),
        };
        self.state().checkouts.insert(id, checkout.clone());
        Ok(checkout)
    }

    async fn fetch(&self, checkout_id: &CheckoutId) -> Result<Checkout, CartError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        self.checkout(checkout_id)
            .ok_or_else(|| CartError::NotFound(format!("Checkout not found: {checkout_id}")))
    }

    async fn add_line(
        &self,
        checkout_id: &CheckoutId,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let entry = self.catalog_entry(variant_id)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.apply(checkout_id, |checkout, _| {
            if let Some(line) = checkout.lines.iter_mut().find(|l| &l.variant.id == variant_id) {
                let merged = Quantity::new(line.quantity.get().saturating_add(quantity.get()))?;
                check_stock(&entry, merged)?;
                line.quantity = merged;
            } else {
                check_stock(&entry, quantity)?;
                checkout.lines.push(CheckoutLine {
                    id: LineId::parse(format!("line-{n}"))?,
                    quantity,
                    variant: Variant {
                        id: variant_id.clone(),
                        name: "Default".to_string(),
                        product: Product {
                            id: entry.product_id.clone(),
                            name: entry.product_name.clone(),
                            slug: entry.product_id.as_str().to_lowercase(),
                            thumbnail: None,
                        },
                    },
                    total: Money::zero(CURRENCY),
                });
            }
            Ok(())
        });
        self.respond(Some(quantity.get()), result).await
    }

    async fn update_line_quantity(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let result = self.apply(checkout_id, |checkout, catalog| {
            let line = checkout
                .lines
                .iter_mut()
                .find(|l| &l.id == line_id)
                .ok_or_else(|| CartError::Validation(format!("Line not found: {line_id}")))?;
            if let Some(entry) = catalog.get(&line.variant.id) {
                check_stock(entry, quantity)?;
            }
            line.quantity = quantity;
            Ok(())
        });
        self.respond(Some(quantity.get()), result).await
    }

    async fn remove_line(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
    ) -> Result<Checkout, CartError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let result = self.apply(checkout_id, |checkout, _| {
            checkout.lines.retain(|l| &l.id != line_id);
            Ok(())
        });
        self.respond(None, result).await
    }

    async fn first_variant(
        &self,
        product_id: &ProductId,
        _channel: &ChannelSlug,
    ) -> Result<VariantId, CartError> {
        self.take_failure()?;

        let state = self.state();
        let mut variants: Vec<&VariantId> = state
            .catalog
            .iter()
            .filter(|(_, entry)| &entry.product_id == product_id)
            .map(|(id, _)| id)
            .collect();
        variants.sort();
        variants
            .first()
            .map(|id| (*id).clone())
            .ok_or_else(|| CartError::Validation("No variants found for this product".to_string()))
    }
}
