//! Saleor GraphQL API client for checkout (cart) operations.
//!
//! # Architecture
//!
//! - Uses `graphql_client` request/response envelopes with hand-written documents
//! - Saleor is source of truth - NO local persistence, direct API calls
//! - Snapshots are cached by [`crate::cart::LocalCartCache`], not here
//!
//! # Example
//!
//! ```rust,ignore
//! use baxoq_storefront::saleor::SaleorClient;
//!
//! let client = SaleorClient::new(&config.saleor);
//!
//! let checkout = client.create(&channel).await?;
//! let checkout = client.add_line(&checkout.id, &variant_id, Quantity::ONE).await?;
//! ```

mod checkout;
pub mod types;

pub use checkout::SaleorClient;
pub use types::*;

use baxoq_core::{IdError, QuantityError};
use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
///
/// `Http`, `GraphQL`, `Parse` and `RateLimited` are the remote failures a
/// surface shows as a transient notice. `Validation` is shown inline and
/// `NotFound` is recovered by replacing the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Missing or invalid input, or a field error reported by the backend.
    #[error("{0}")]
    Validation(String),

    /// The checkout no longer exists (expired or invalid identifier).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token is absent, expired or rejected.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors, or the response was unusable.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl CartError {
    /// Build a remote error from a single message.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::GraphQL(vec![GraphQLError {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }])
    }

    /// Whether this is a remote (network/backend) failure rather than a user
    /// error. Transient failures are shown as a dismissible notice and are
    /// never retried automatically.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::GraphQL(_) | Self::Parse(_) | Self::RateLimited(_)
        )
    }

    /// Whether this error means the checkout identifier is stale.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<IdError> for CartError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// A GraphQL error returned by the Saleor API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
