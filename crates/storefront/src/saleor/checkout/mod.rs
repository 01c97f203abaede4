//! Saleor checkout client implementation.
//!
//! Sends hand-written documents through `graphql_client` envelopes with
//! `reqwest` 0.13. Nothing is cached here; see [`crate::cart::LocalCartCache`].

mod conversions;
mod queries;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use baxoq_core::{ChannelSlug, CheckoutId, LineId, ProductId, Quantity, VariantId};
use graphql_client::{QueryBody, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::cart::CartGateway;
use crate::config::SaleorConfig;
use crate::saleor::types::{Checkout, CheckoutFieldError};
use crate::saleor::{CartError, GraphQLError, GraphQLErrorLocation};

use conversions::{convert_checkout, convert_field_error, join_messages};
use queries::{
    CHECKOUT_CREATE, CHECKOUT_FIND, CHECKOUT_LINES_ADD, CHECKOUT_LINES_DELETE,
    CHECKOUT_LINES_UPDATE, CheckoutCreateData, CheckoutFindData, CheckoutLinesAddData,
    CheckoutLinesDeleteData, CheckoutLinesUpdateData, CreateVariables, FindVariables,
    LinesAddVariables, LinesDeleteVariables, LinesUpdateVariables, MutationData, NoVariables,
    PING, PRODUCT_VARIANTS, PingData, ProductVariantsData, ProductVariantsVariables,
};

/// Exception codes Saleor reports for rejected or expired JWTs.
const AUTH_EXCEPTION_CODES: &[&str] = &[
    "ExpiredSignatureError",
    "InvalidSignatureError",
    "InvalidTokenError",
    "JSONWebTokenError",
    "PermissionDenied",
];

// =============================================================================
// SaleorClient
// =============================================================================

/// Client for the Saleor GraphQL API.
///
/// Cheap to clone. [`SaleorClient::authorized`] derives a per-request client
/// that acts on behalf of a signed-in shopper.
#[derive(Clone)]
pub struct SaleorClient {
    inner: Arc<SaleorClientInner>,
    access_token: Option<SecretString>,
}

struct SaleorClientInner {
    client: reqwest::Client,
    endpoint: String,
    app_token: Option<SecretString>,
}

/// How mutation field errors are reported to the caller.
#[derive(Debug, Clone, Copy)]
enum FieldErrorKind {
    /// Cart creation failures are not the shopper's fault.
    Remote,
    /// Line mutations report field errors verbatim.
    Validation,
}

impl SaleorClient {
    /// Create a new Saleor API client.
    #[must_use]
    pub fn new(config: &SaleorConfig) -> Self {
        Self {
            inner: Arc::new(SaleorClientInner {
                client: reqwest::Client::new(),
                endpoint: config.api_url.to_string(),
                app_token: config.app_token.clone(),
            }),
            access_token: None,
        }
    }

    /// A client that sends the shopper's access token, if any.
    ///
    /// Without a token the app token (when configured) is used instead.
    #[must_use]
    pub fn authorized(&self, access_token: Option<SecretString>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            access_token,
        }
    }

    /// Check that the API answers at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn ping(&self) -> Result<(), CartError> {
        self.execute::<_, PingData>("Ping", PING, NoVariables {})
            .await
            .map(|_| ())
    }

    fn bearer(&self) -> Option<&SecretString> {
        self.access_token
            .as_ref()
            .or(self.inner.app_token.as_ref())
    }

    /// Execute a GraphQL operation.
    async fn execute<V: Serialize, D: DeserializeOwned>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<D, CartError> {
        let request_body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Content-Type", "application/json")
            .json(&request_body);

        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CartError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CartError::Unauthenticated(
                "Access token rejected".to_string(),
            ));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Saleor API returned non-success status"
            );
            return Err(CartError::remote(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: Response<D> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = operation_name,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Saleor GraphQL response"
                );
                return Err(CartError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, operation = operation_name, "GraphQL errors in response");

            if errors.iter().any(is_auth_error) {
                return Err(CartError::Unauthenticated(
                    errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; "),
                ));
            }

            return Err(CartError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Saleor GraphQL response has no data and no errors"
            );
            CartError::remote("No data in response")
        })
    }

    /// Run a checkout mutation and convert its payload.
    async fn mutate<V: Serialize, D: DeserializeOwned + MutationData>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
        field_errors: FieldErrorKind,
    ) -> Result<Checkout, CartError> {
        let data = self
            .execute::<V, D>(operation_name, query, variables)
            .await?;

        let Some(payload) = data.into_payload() else {
            return Err(CartError::remote(format!("{operation_name} returned no payload")));
        };

        if !payload.errors.is_empty() {
            let errors: Vec<CheckoutFieldError> =
                payload.errors.into_iter().map(convert_field_error).collect();
            return Err(field_errors_to_cart_error(&errors, field_errors));
        }

        payload.checkout.map_or_else(
            || Err(CartError::remote(format!("{operation_name} returned no checkout"))),
            convert_checkout,
        )
    }
}

fn field_errors_to_cart_error(errors: &[CheckoutFieldError], kind: FieldErrorKind) -> CartError {
    let message = join_messages(errors);
    if errors.iter().any(CheckoutFieldError::is_checkout_not_found) {
        return CartError::NotFound(message);
    }
    match kind {
        FieldErrorKind::Remote => CartError::remote(message),
        FieldErrorKind::Validation => CartError::Validation(message),
    }
}

fn is_auth_error(error: &graphql_client::Error) -> bool {
    let code = error
        .extensions
        .as_ref()
        .and_then(|ext: &HashMap<String, serde_json::Value>| ext.get("exception"))
        .and_then(|exception| exception.get("code"))
        .and_then(serde_json::Value::as_str);

    code.is_some_and(|code| AUTH_EXCEPTION_CODES.contains(&code))
        || error.message.contains("Signature has expired")
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

// =============================================================================
// Checkout operations
// =============================================================================

#[async_trait]
impl CartGateway for SaleorClient {
    #[instrument(skip(self), fields(channel = %channel))]
    async fn create(&self, channel: &ChannelSlug) -> Result<Checkout, CartError> {
        self.mutate::<_, CheckoutCreateData>(
            "CheckoutCreate",
            CHECKOUT_CREATE,
            CreateVariables {
                channel: channel.as_str(),
            },
            FieldErrorKind::Remote,
        )
        .await
    }

    #[instrument(skip(self), fields(checkout_id = %checkout_id))]
    async fn fetch(&self, checkout_id: &CheckoutId) -> Result<Checkout, CartError> {
        let data = self
            .execute::<_, CheckoutFindData>(
                "CheckoutFind",
                CHECKOUT_FIND,
                FindVariables {
                    id: checkout_id.as_str(),
                },
            )
            .await?;

        data.checkout.map_or_else(
            || Err(CartError::NotFound(format!("Checkout not found: {checkout_id}"))),
            convert_checkout,
        )
    }

    #[instrument(skip(self), fields(checkout_id = %checkout_id, variant_id = %variant_id))]
    async fn add_line(
        &self,
        checkout_id: &CheckoutId,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        self.mutate::<_, CheckoutLinesAddData>(
            "CheckoutLinesAdd",
            CHECKOUT_LINES_ADD,
            LinesAddVariables {
                id: checkout_id.as_str(),
                variant_id: variant_id.as_str(),
                quantity: i64::from(quantity),
            },
            FieldErrorKind::Validation,
        )
        .await
    }

    #[instrument(skip(self), fields(checkout_id = %checkout_id, line_id = %line_id))]
    async fn update_line_quantity(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<Checkout, CartError> {
        self.mutate::<_, CheckoutLinesUpdateData>(
            "CheckoutLinesUpdate",
            CHECKOUT_LINES_UPDATE,
            LinesUpdateVariables {
                id: checkout_id.as_str(),
                line_id: line_id.as_str(),
                quantity: i64::from(quantity),
            },
            FieldErrorKind::Validation,
        )
        .await
    }

    #[instrument(skip(self), fields(checkout_id = %checkout_id, line_id = %line_id))]
    async fn remove_line(
        &self,
        checkout_id: &CheckoutId,
        line_id: &LineId,
    ) -> Result<Checkout, CartError> {
        self.mutate::<_, CheckoutLinesDeleteData>(
            "CheckoutLinesDelete",
            CHECKOUT_LINES_DELETE,
            LinesDeleteVariables {
                id: checkout_id.as_str(),
                line_id: line_id.as_str(),
            },
            FieldErrorKind::Validation,
        )
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id, channel = %channel))]
    async fn first_variant(
        &self,
        product_id: &ProductId,
        channel: &ChannelSlug,
    ) -> Result<VariantId, CartError> {
        let data = self
            .execute::<_, ProductVariantsData>(
                "ProductVariants",
                PRODUCT_VARIANTS,
                ProductVariantsVariables {
                    id: product_id.as_str(),
                    channel: channel.as_str(),
                },
            )
            .await?;

        data.product
            .and_then(|product| product.variants)
            .and_then(|variants| variants.into_iter().next())
            .and_then(|variant| VariantId::parse(variant.id).ok())
            .ok_or_else(|| CartError::Validation("No variants found for this product".to_string()))
    }
}
