//! File-backed checkout ID store.
//!
//! Keeps `{ "<channel>": "<checkout id>" }` in a JSON file so consecutive
//! CLI runs share a cart, the way browser cookies do for the storefront.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use baxoq_core::{ChannelSlug, CheckoutId};
use baxoq_storefront::cart::CheckoutIdStore;

/// Checkout IDs persisted in a JSON file.
///
/// Unreadable or corrupt files count as empty; write failures are logged.
#[derive(Debug)]
pub struct FileCheckoutIds {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileCheckoutIds {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "Ignoring corrupt state file: {e}");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read state file: {e}");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, ids: &BTreeMap<String, String>) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(ids)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids = self.load();
        f(&mut ids);
        if let Err(e) = self.save(&ids) {
            tracing::warn!(path = %self.path.display(), "Failed to write state file: {e}");
        }
    }
}

impl CheckoutIdStore for FileCheckoutIds {
    fn get(&self, channel: &ChannelSlug) -> Option<CheckoutId> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
            .remove(channel.as_str())
            .and_then(|id| CheckoutId::parse(id).ok())
    }

    fn set(&self, channel: &ChannelSlug, checkout_id: &CheckoutId) {
        self.modify(|ids| {
            ids.insert(channel.to_string(), checkout_id.to_string());
        });
    }

    fn clear(&self, channel: &ChannelSlug) {
        self.modify(|ids| {
            ids.remove(channel.as_str());
        });
    }
}
