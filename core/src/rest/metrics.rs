// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Prometheus instrumentation for HTTP services.
//!
//! Every request that reaches the router is counted and timed, keyed by the route pattern that
//! matched it (not the raw path) so that label cardinality stays bounded.

use crate::rest::{RestError, RestResult};
use axum::Router;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::FutureExt;
use http::{StatusCode, header};
use log::error;
use prometheus::{
    DEFAULT_BUCKETS, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TEXT_FORMAT, TextEncoder,
};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Route label used for requests that did not match any registered route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Collection of HTTP metrics backed by a Prometheus registry.
///
/// Cloning is cheap: all clones share the same underlying collectors and registry.
#[derive(Clone)]
pub struct HttpMetrics {
    /// Registry holding these metrics and any other service-specific collectors.
    registry: Registry,

    /// Number of requests by route pattern and method.
    requests_total: IntCounterVec,

    /// Latency of requests by route pattern and method.
    request_duration: HistogramVec,

    /// Number of responses by status code.
    status_codes_total: IntCounterVec,
}

impl HttpMetrics {
    /// Creates the HTTP collectors and registers them in `registry`.
    pub fn new(registry: Registry) -> Result<Self, prometheus::Error> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP requests handled, labeled by route and method",
            ),
            &["route", "method"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds",
            )
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["route", "method"],
        )?;
        let status_codes_total = IntCounterVec::new(
            Opts::new(
                "http_response_status_codes_total",
                "Total number of HTTP response status codes",
            ),
            &["status_code"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(status_codes_total.clone()))?;

        Ok(Self { registry, requests_total, request_duration, status_codes_total })
    }

    /// Returns the registry where these metrics live.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Records the outcome of one request.
    pub fn observe(&self, route: &str, method: &str, status: StatusCode, elapsed: Duration) {
        self.requests_total.with_label_values(&[route, method]).inc();
        self.request_duration.with_label_values(&[route, method]).observe(elapsed.as_secs_f64());
        self.status_codes_total.with_label_values(&[status.as_str()]).inc();
    }

    /// Returns the number of requests recorded for `route` and `method`.
    pub fn request_count(&self, route: &str, method: &str) -> u64 {
        self.requests_total.with_label_values(&[route, method]).get()
    }

    /// Returns the number of latency observations recorded for `route` and `method`.
    pub fn duration_count(&self, route: &str, method: &str) -> u64 {
        self.request_duration.with_label_values(&[route, method]).get_sample_count()
    }

    /// Returns the number of responses recorded with `status`.
    pub fn status_count(&self, status: StatusCode) -> u64 {
        self.status_codes_total.with_label_values(&[status.as_str()]).get()
    }

    /// Renders all metrics in the registry using the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Middleware that records the metrics of every request that goes through it.
///
/// Panics in downstream handlers are recorded as 500 responses and then propagated so that an
/// outer layer can turn them into a proper response.
pub async fn track(State(metrics): State<HttpMetrics>, request: Request, next: Next) -> Response {
    let route = match request.extensions().get::<MatchedPath>() {
        Some(path) => path.as_str().to_owned(),
        None => UNMATCHED_ROUTE.to_owned(),
    };
    let method = request.method().to_string();

    let start = Instant::now();
    let result = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    let elapsed = start.elapsed();

    match result {
        Ok(response) => {
            metrics.observe(&route, &method, response.status(), elapsed);
            response
        }
        Err(payload) => {
            metrics.observe(&route, &method, StatusCode::INTERNAL_SERVER_ERROR, elapsed);
            panic::resume_unwind(payload)
        }
    }
}

/// GET handler for the metrics scraping endpoint.
async fn metrics_get(State(metrics): State<HttpMetrics>) -> RestResult<impl IntoResponse> {
    let body = metrics.render().map_err(|e| {
        error!("Cannot render metrics: {}", e);
        RestError::InternalError("Failed to render metrics".to_owned())
    })?;
    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}

/// Creates a router that exposes `metrics` under `/metrics`.
pub fn router(metrics: HttpMetrics) -> Router {
    Router::new().route("/metrics", get(metrics_get)).with_state(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::OneShotBuilder;
    use axum::middleware;

    fn setup() -> HttpMetrics {
        HttpMetrics::new(Registry::new()).unwrap()
    }

    fn app(metrics: HttpMetrics) -> Router {
        Router::new()
            .route("/items/:id", get(|| async { "item" }))
            .merge(router(metrics.clone()))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn_with_state(metrics, track))
    }

    #[test]
    fn test_new_rejects_double_registration() {
        let registry = Registry::new();
        HttpMetrics::new(registry.clone()).unwrap();
        assert!(HttpMetrics::new(registry).is_err());
    }

    #[test]
    fn test_observe() {
        let metrics = setup();
        metrics.observe("/a", "GET", StatusCode::OK, Duration::from_millis(5));
        metrics.observe("/a", "GET", StatusCode::NOT_FOUND, Duration::from_millis(5));
        metrics.observe("/a", "POST", StatusCode::OK, Duration::from_millis(5));

        assert_eq!(2, metrics.request_count("/a", "GET"));
        assert_eq!(2, metrics.duration_count("/a", "GET"));
        assert_eq!(1, metrics.request_count("/a", "POST"));
        assert_eq!(0, metrics.request_count("/b", "GET"));
        assert_eq!(2, metrics.status_count(StatusCode::OK));
        assert_eq!(1, metrics.status_count(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_track_uses_route_pattern() {
        let metrics = setup();

        OneShotBuilder::new(app(metrics.clone()), (http::Method::GET, "/items/1"))
            .send_empty()
            .await
            .expect_text("item")
            .await;
        OneShotBuilder::new(app(metrics.clone()), (http::Method::GET, "/items/2"))
            .send_empty()
            .await
            .expect_text("item")
            .await;

        assert_eq!(2, metrics.request_count("/items/:id", "GET"));
        assert_eq!(2, metrics.duration_count("/items/:id", "GET"));
        assert_eq!(0, metrics.request_count("/items/1", "GET"));
        assert_eq!(2, metrics.status_count(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_track_unmatched_route() {
        let metrics = setup();

        OneShotBuilder::new(app(metrics.clone()), (http::Method::GET, "/nowhere"))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .take_response()
            .await;

        assert_eq!(1, metrics.request_count(UNMATCHED_ROUTE, "GET"));
        assert_eq!(1, metrics.status_count(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = setup();
        metrics.observe("/a", "GET", StatusCode::OK, Duration::from_millis(5));

        let response = OneShotBuilder::new(app(metrics.clone()), (http::Method::GET, "/metrics"))
            .send_empty()
            .await
            .take_response()
            .await;
        assert_eq!(TEXT_FORMAT, response.headers().get(header::CONTENT_TYPE).unwrap());
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"http_requests_total{method="GET",route="/a"} 1"#));
        assert!(body.contains("http_request_duration_seconds_bucket"));
        assert!(body.contains(r#"http_response_status_codes_total{status_code="200"} 1"#));
    }
}
