//! Per-channel checkout ID persistence.
//!
//! The checkout ID for each channel lives in a cookie named
//! `checkoutId-<channel>`. The cookie is readable by page scripts (no
//! `HttpOnly`), scoped to `/`, `SameSite=Lax` and `Secure` only when the
//! storefront is served over HTTPS.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use baxoq_core::{ChannelSlug, CheckoutId};

use crate::config::StorefrontConfig;

/// Storage for the current checkout ID of each channel.
///
/// Storage failures are treated as "no checkout".
pub trait CheckoutIdStore: Send + Sync {
    /// The checkout ID for a channel, if one is stored.
    fn get(&self, channel: &ChannelSlug) -> Option<CheckoutId>;

    /// Store (or overwrite) the checkout ID for a channel.
    fn set(&self, channel: &ChannelSlug, checkout_id: &CheckoutId);

    /// Forget the checkout ID for a channel.
    fn clear(&self, channel: &ChannelSlug);
}

// =============================================================================
// Cookies
// =============================================================================

/// Attributes applied to checkout ID cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age: time::Duration,
}

impl CookiePolicy {
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            secure: config.is_https(),
            max_age: config.cart.cookie_max_age,
        }
    }

    fn build(self, name: String, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .http_only(false)
            .max_age(self.max_age)
            .build()
    }
}

/// Checkout IDs carried in the cookies of one HTTP exchange.
///
/// Reads come from the request jar; writes are collected and returned with
/// [`CheckoutCookies::into_jar`] so the handler can attach them to the
/// response.
#[derive(Debug)]
pub struct CheckoutCookies {
    jar: Mutex<CookieJar>,
    policy: CookiePolicy,
}

impl CheckoutCookies {
    #[must_use]
    pub const fn new(jar: CookieJar, policy: CookiePolicy) -> Self {
        Self {
            jar: Mutex::new(jar),
            policy,
        }
    }

    /// The jar with every change made through this store.
    #[must_use]
    pub fn into_jar(self) -> CookieJar {
        self.jar.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(CookieJar) -> CookieJar) {
        let mut jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::take(&mut *jar);
        *jar = f(current);
    }
}

impl CheckoutIdStore for CheckoutCookies {
    fn get(&self, channel: &ChannelSlug) -> Option<CheckoutId> {
        let jar = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
        jar.get(&channel.checkout_cookie_name())
            .and_then(|cookie| CheckoutId::parse(cookie.value()).ok())
    }

    fn set(&self, channel: &ChannelSlug, checkout_id: &CheckoutId) {
        let cookie = self
            .policy
            .build(channel.checkout_cookie_name(), checkout_id.to_string());
        self.update(|jar| jar.add(cookie));
    }

    fn clear(&self, channel: &ChannelSlug) {
        let name = channel.checkout_cookie_name();
        self.update(|jar| jar.remove(Cookie::build((name, "")).path("/")));
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local store, used by tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemoryCheckoutIds {
    ids: Mutex<HashMap<ChannelSlug, CheckoutId>>,
}

impl MemoryCheckoutIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckoutIdStore for MemoryCheckoutIds {
    fn get(&self, channel: &ChannelSlug) -> Option<CheckoutId> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }

    fn set(&self, channel: &ChannelSlug, checkout_id: &CheckoutId) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.clone(), checkout_id.clone());
    }

    fn clear(&self, channel: &ChannelSlug) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn channel(slug: &str) -> ChannelSlug {
        ChannelSlug::parse(slug).unwrap()
    }

    fn policy(secure: bool) -> CookiePolicy {
        CookiePolicy {
            secure,
            max_age: time::Duration::days(30),
        }
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryCheckoutIds::new();
        let ch = channel("default-channel");
        let id = CheckoutId::parse("c1").unwrap();

        assert_eq!(store.get(&ch), None);
        store.set(&ch, &id);
        assert_eq!(store.get(&ch), Some(id));
        store.clear(&ch);
        assert_eq!(store.get(&ch), None);
    }

    #[test]
    fn test_channels_are_independent() {
        let store = MemoryCheckoutIds::new();
        store.set(&channel("us"), &CheckoutId::parse("c-us").unwrap());
        store.set(&channel("eu"), &CheckoutId::parse("c-eu").unwrap());
        store.clear(&channel("us"));
        assert_eq!(store.get(&channel("us")), None);
        assert_eq!(store.get(&channel("eu")).unwrap().as_str(), "c-eu");
    }

    #[test]
    fn test_cookie_round_trip() {
        let store = CheckoutCookies::new(CookieJar::new(), policy(false));
        let ch = channel("default-channel");
        let id = CheckoutId::parse("Q2hlY2tvdXQ6MQ==").unwrap();

        store.set(&ch, &id);
        assert_eq!(store.get(&ch), Some(id));
        store.clear(&ch);
        assert_eq!(store.get(&ch), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let store = CheckoutCookies::new(CookieJar::new(), policy(true));
        let ch = channel("default-channel");
        store.set(&ch, &CheckoutId::parse("c1").unwrap());

        let jar = store.into_jar();
        let cookie = jar.get("checkoutId-default-channel").unwrap();
        assert_eq!(cookie.value(), "c1");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }

    #[test]
    fn test_overwrite_replaces_cookie() {
        let store = CheckoutCookies::new(CookieJar::new(), policy(false));
        let ch = channel("default-channel");
        store.set(&ch, &CheckoutId::parse("old").unwrap());
        store.set(&ch, &CheckoutId::parse("new").unwrap());
        assert_eq!(store.get(&ch).unwrap().as_str(), "new");
    }

    #[test]
    fn test_empty_cookie_value_is_absent() {
        let jar = CookieJar::new().add(Cookie::new("checkoutId-default-channel", ""));
        let store = CheckoutCookies::new(jar, policy(false));
        assert_eq!(store.get(&channel("default-channel")), None);
    }
}
