//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body of the form `{"error": "..."}`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use baxoq_core::{IdError, QuantityError};
use serde_json::json;
use thiserror::Error;

use crate::saleor::CartError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::Validation(_) => StatusCode::BAD_REQUEST,
                CartError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                CartError::NotFound(_) => StatusCode::NOT_FOUND,
                CartError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                CartError::Http(_) | CartError::GraphQL(_) | CartError::Parse(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Cart(err) => match err {
                // Backend validation messages are meant for shoppers
                CartError::Validation(msg) => msg.clone(),
                CartError::Unauthenticated(_) => "Authentication required".to_string(),
                CartError::NotFound(_) => "Checkout not found".to_string(),
                CartError::RateLimited(_) => "Too many requests, please try again".to_string(),
                CartError::Http(_) | CartError::GraphQL(_) | CartError::Parse(_) => {
                    "External service error".to_string()
                }
            },
            Self::BadRequest(_) => self.to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        match self {
            Self::Cart(err) => err.is_transient() && !matches!(err, CartError::RateLimited(_)),
            Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = Json(json!({ "error": self.client_message() }));
        let mut response = (status, body).into_response();
        if let Self::Cart(CartError::RateLimited(secs)) = &self {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(*secs));
        }
        response
    }
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        Self::Cart(err.into())
    }
}

impl From<QuantityError> for AppError {
    fn from(err: QuantityError) -> Self {
        Self::Cart(err.into())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
