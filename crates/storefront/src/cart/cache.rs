//! Process-wide cart snapshot cache.
//!
//! Entries are keyed by channel and checkout ID, so shoppers never see each
//! other's carts. Freshness is judged from the entry's own timestamp; moka
//! only bounds memory.
//!
//! Every request that may write a snapshot first takes a sequence number from
//! [`LocalCartCache::next_sequence`]. A write carrying a lower sequence than
//! the stored entry is discarded, so a slow response to an earlier request
//! never overwrites the result of a later one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use baxoq_core::{ChannelSlug, CheckoutId};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tokio::time::Instant;
use tracing::debug;

use crate::saleor::Checkout;

const MAX_ENTRIES: u64 = 10_000;
const IDLE_EVICTION: Duration = Duration::from_secs(60 * 60);

/// Cache key: one cart per channel per shopper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub channel: ChannelSlug,
    pub checkout_id: CheckoutId,
}

impl CartKey {
    #[must_use]
    pub const fn new(channel: ChannelSlug, checkout_id: CheckoutId) -> Self {
        Self {
            channel,
            checkout_id,
        }
    }
}

/// A cached snapshot with the time it was written.
#[derive(Debug, Clone)]
pub struct CachedCart {
    pub checkout: Checkout,
    pub fetched_at: Instant,
    pub sequence: u64,
}

impl CachedCart {
    /// Whether the snapshot is younger than `ttl`.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Shared cart cache. Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct LocalCartCache {
    entries: Cache<CartKey, CachedCart>,
    sequence: Arc<AtomicU64>,
    ttl: Duration,
}

impl LocalCartCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_idle(IDLE_EVICTION)
            .build();

        Self {
            entries,
            sequence: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Freshness window.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take the sequence number for a request about to be issued.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Read an entry, fresh or not.
    pub async fn read(&self, key: &CartKey) -> Option<CachedCart> {
        self.entries.get(key).await
    }

    /// Store a snapshot stamped with the current time.
    ///
    /// Returns `false` when a response to a later request has already been
    /// written for this cart and the snapshot was discarded.
    pub async fn write(&self, key: CartKey, checkout: Checkout, sequence: u64) -> bool {
        let entry = CachedCart {
            checkout,
            fetched_at: Instant::now(),
            sequence,
        };

        let result = self
            .entries
            .entry(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(existing) if existing.value().sequence > sequence => Op::Nop,
                    _ => Op::Put(entry),
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(_) | CompResult::ReplacedWith(_) => true,
            _ => {
                debug!(sequence, "Discarded out-of-order cart snapshot");
                false
            }
        }
    }

    /// Drop an entry so the next read fetches from the backend.
    pub async fn invalidate(&self, key: &CartKey) {
        self.entries.invalidate(key).await;
    }
}
