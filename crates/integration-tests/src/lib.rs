//! Integration tests for the Baxoq storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p baxoq-integration-tests
//! ```
//!
//! Nothing external is needed: the Saleor API is replaced by an `httpmock`
//! server or by the in-memory gateway from `baxoq_storefront::testing`.
//!
//! # Test Categories
//!
//! - `saleor_gateway` - GraphQL client against a mock Saleor endpoint
//! - `cart_sync` - cache, notification bus and surfaces working together
//! - `http_api` - the JSON/SSE router driven in-process
