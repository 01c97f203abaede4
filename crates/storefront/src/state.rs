//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;

use crate::cart::{CartEvents, CartGateway, CartService, CookiePolicy, LocalCartCache};
use crate::config::StorefrontConfig;
use crate::saleor::SaleorClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Saleor client, the shared cart cache and the cart event bus.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    saleor: SaleorClient,
    cart: CartService,
    cookies: CookiePolicy,
}

impl AppState {
    /// Create application state backed by the configured Saleor API.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let saleor = SaleorClient::new(&config.saleor);
        let gateway: Arc<dyn CartGateway> = Arc::new(saleor.clone());
        Self::with_gateway(config, saleor, gateway)
    }

    /// Create application state with a custom cart gateway.
    ///
    /// The Saleor client is still used for readiness checks and for
    /// requests carrying a shopper token.
    #[must_use]
    pub fn with_gateway(
        config: StorefrontConfig,
        saleor: SaleorClient,
        gateway: Arc<dyn CartGateway>,
    ) -> Self {
        let cart = CartService::new(
            gateway,
            LocalCartCache::new(config.cart.cache_ttl),
            CartEvents::new(),
        );
        let cookies = CookiePolicy::from_config(&config);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                saleor,
                cart,
                cookies,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Saleor API client.
    #[must_use]
    pub fn saleor(&self) -> &SaleorClient {
        &self.inner.saleor
    }

    /// The shared cart service (anonymous access).
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Cart service for a request, authorized with the shopper's token when
    /// one is present.
    #[must_use]
    pub fn cart_for(&self, access_token: Option<SecretString>) -> CartService {
        match access_token {
            Some(token) => {
                let client = self.inner.saleor.authorized(Some(token));
                self.inner.cart.with_gateway(Arc::new(client))
            }
            None => self.inner.cart.clone(),
        }
    }

    /// Attributes for checkout ID cookies.
    #[must_use]
    pub fn cookie_policy(&self) -> CookiePolicy {
        self.inner.cookies
    }
}
