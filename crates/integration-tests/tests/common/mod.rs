//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use baxoq_core::{ChannelSlug, CheckoutId, LineId, ProductId, VariantId};
use baxoq_storefront::cart::{CartEvents, CartGateway, CartService, LocalCartCache};
use baxoq_storefront::config::{CartConfig, SaleorConfig, StorefrontConfig};
use baxoq_storefront::saleor::SaleorClient;
use baxoq_storefront::state::AppState;
use baxoq_storefront::testing::InMemoryGateway;
use tower::ServiceExt;

pub fn channel(slug: &str) -> ChannelSlug {
    ChannelSlug::parse(slug).unwrap()
}

pub fn variant(id: &str) -> VariantId {
    VariantId::parse(id).unwrap()
}

pub fn product(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

pub fn line(id: &str) -> LineId {
    LineId::parse(id).unwrap()
}

pub fn checkout_id(id: &str) -> CheckoutId {
    CheckoutId::parse(id).unwrap()
}

pub fn saleor_config(api_url: &str) -> SaleorConfig {
    SaleorConfig {
        api_url: api_url.parse().unwrap(),
        app_token: None,
    }
}

/// Storefront configuration as it would be loaded for local development.
pub fn storefront_config(base_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: base_url.to_string(),
        default_channel: channel("default-channel"),
        saleor: saleor_config("http://127.0.0.1:9/graphql/"),
        cart: CartConfig::default(),
        checkout_url: format!("{base_url}/checkout").parse().unwrap(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A cart service over the in-memory backend.
pub fn service(gateway: &Arc<InMemoryGateway>) -> CartService {
    CartService::new(
        Arc::clone(gateway) as Arc<dyn CartGateway>,
        LocalCartCache::new(Duration::from_secs(30)),
        CartEvents::new(),
    )
}

/// The storefront router over the in-memory backend.
pub struct TestApp {
    pub gateway: Arc<InMemoryGateway>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:3000")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let config = storefront_config(base_url);
        let saleor = SaleorClient::new(&config.saleor);
        let gateway = Arc::new(InMemoryGateway::new());
        let state = AppState::with_gateway(
            config,
            saleor,
            Arc::clone(&gateway) as Arc<dyn CartGateway>,
        );
        let router = baxoq_storefront::app(state.clone());
        Self {
            gateway,
            state,
            router,
        }
    }

    /// Send a request and collect the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: bytes.to_vec(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every `Set-Cookie` header value.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    /// The `Set-Cookie` value for a cookie name.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies()
            .into_iter()
            .find(|cookie| cookie.starts_with(&prefix))
    }
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_with_cookie(
    method: &str,
    uri: &str,
    cookie: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}
