//! Baxoq Storefront library.
//!
//! Keeps a shopper's cart in sync across every part of the storefront that
//! shows it. The cart itself lives in Saleor; this crate provides:
//!
//! - [`saleor`] - GraphQL client for checkout operations
//! - [`cart`] - shared snapshot cache, change notifications, the cart
//!   service and the view surfaces built on them
//! - [`routes`] - the JSON/SSE HTTP API over the cart service

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod saleor;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use axum::{Router, middleware::from_fn};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .with_state(state)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
