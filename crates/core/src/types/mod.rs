//! Core types for Baxoq.
//!
//! This module provides type-safe wrappers for common cart concepts.

pub mod id;
pub mod price;
pub mod quantity;

pub use id::*;
pub use price::Money;
pub use quantity::{Quantity, QuantityError};
