//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                 - Liveness check
//! GET  /health/ready                           - Readiness check (Saleor reachable)
//!
//! # Checkout API (JSON, mutating endpoints send HX-Trigger: cart:updated)
//! POST   /api/checkout/create                  - Create a cart for a channel
//! POST   /api/checkout/lines/add               - Add a line, creating the cart if needed
//! POST   /api/checkout/{checkout_id}/lines     - Add a line to a specific cart
//! PUT    /api/checkout/{checkout_id}/lines/{line_id} - Set a line's quantity
//! DELETE /api/checkout/{checkout_id}/lines/{line_id} - Remove a line
//!
//! # Cart (per channel)
//! GET  /api/{channel}/cart                     - Cart view
//! GET  /api/{channel}/cart/count               - Item count badge
//! GET  /api/{channel}/cart/events              - cart:updated event stream (SSE)
//! GET  /{channel}/checkout                     - Redirect to hosted checkout
//! ```

pub mod cart;
pub mod checkout;
pub mod health;

use axum::{
    Router,
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::CookieJar;
use baxoq_core::ChannelSlug;
use secrecy::SecretString;

use crate::cart::{CART_UPDATED, CartKey, CartService, CheckoutCookies, CheckoutIdStore};
use crate::error::AppError;
use crate::saleor::CartError;
use crate::state::AppState;

/// Cookie carrying the shopper's Saleor access token.
pub const ACCESS_TOKEN_COOKIE: &str = "saleor_access_token";

/// Response header that tells HTMX clients the cart changed.
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

/// The `HX-Trigger` header sent by every mutating endpoint.
#[must_use]
pub fn cart_updated_trigger() -> [(HeaderName, &'static str); 1] {
    [(HX_TRIGGER, CART_UPDATED)]
}

// =============================================================================
// Request context
// =============================================================================

/// Cart access for one request: a service authorized for the shopper and
/// the checkout ID cookies of the exchange.
pub struct CartContext {
    pub service: CartService,
    pub cookies: CheckoutCookies,
}

impl CartContext {
    #[must_use]
    pub fn new(state: &AppState, jar: CookieJar) -> Self {
        let token = access_token(&jar);
        Self {
            service: state.cart_for(token),
            cookies: CheckoutCookies::new(jar, state.cookie_policy()),
        }
    }

    /// The cookie jar with any checkout ID changes, for the response.
    #[must_use]
    pub fn into_jar(self) -> CookieJar {
        self.cookies.into_jar()
    }

    /// Error response for a failed operation on `key`.
    ///
    /// When the backend no longer has the checkout and it is the channel's
    /// current one, its cookie is cleared.
    #[must_use]
    pub fn reject(self, key: &CartKey, err: CartError) -> Response {
        if err.is_not_found() && self.cookies.get(&key.channel).as_ref() == Some(&key.checkout_id) {
            self.cookies.clear(&key.channel);
        }
        (self.into_jar(), AppError::from(err)).into_response()
    }
}

/// The shopper's access token, if the auth cookie is set.
fn access_token(jar: &CookieJar) -> Option<SecretString> {
    jar.get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim())
        .filter(|value| !value.is_empty())
        .map(|value| SecretString::from(value.to_string()))
}

/// Resolve an optional channel name, falling back to the default channel.
///
/// # Errors
///
/// Returns `BadRequest` if the name is blank.
pub fn resolve_channel(state: &AppState, channel: Option<&str>) -> Result<ChannelSlug, AppError> {
    match channel {
        Some(slug) => ChannelSlug::parse(slug).map_err(|e| AppError::BadRequest(e.to_string())),
        None => Ok(state.config().default_channel.clone()),
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the checkout API router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(checkout::create))
        .route("/lines/add", post(checkout::add_line))
        .route("/{checkout_id}/lines", post(checkout::add_line_to))
        .route(
            "/{checkout_id}/lines/{line_id}",
            put(checkout::update_line).delete(checkout::remove_line),
        )
}

/// Create the per-channel cart router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/events", get(cart::events))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/checkout", checkout_routes())
        .nest("/api/{channel}/cart", cart_routes())
        .route("/{channel}/checkout", get(cart::checkout))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum_extra::extract::cookie::Cookie;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_access_token_from_cookie() {
        let jar = CookieJar::new().add(Cookie::new(ACCESS_TOKEN_COOKIE, "jwt-token"));
        let token = access_token(&jar);
        assert_eq!(token.as_ref().map(|t| t.expose_secret()), Some("jwt-token"));
    }

    #[test]
    fn test_blank_access_token_ignored() {
        let jar = CookieJar::new().add(Cookie::new(ACCESS_TOKEN_COOKIE, "  "));
        assert!(access_token(&jar).is_none());
        assert!(access_token(&CookieJar::new()).is_none());
    }
}
