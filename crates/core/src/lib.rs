//! Baxoq Core - Shared types library.
//!
//! This crate provides common types used across all Baxoq components:
//! - `storefront` - Cart synchronization core and checkout HTTP service
//! - `cli` - Command-line shopper for driving carts against the backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no caches.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, money and line quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
