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

//! Request pipeline shared by all services.
//!
//! The pipeline, from the outside in, is: panic recovery, request logging, metrics, and finally
//! the handler.  Recovery sits outermost so that no panic escapes the pipeline.  The logging and
//! metrics layers observe panics on their own and record them as internal errors before letting
//! them through.

use crate::rest::RestError;
use crate::rest::metrics::{self, HttpMetrics};
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use http::{Method, StatusCode};
use log::{error, info};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;

/// Formats the access log line of a request that completed with `status` after `elapsed`.
fn access_line(method: &Method, path: &str, status: StatusCode, elapsed: Duration) -> String {
    format!("{} {} {} {}ms", method, path, status.as_u16(), elapsed.as_millis())
}

/// Logs one line per request with its outcome and latency.
///
/// Panicking requests are logged as internal errors and the panic is then propagated.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let start = Instant::now();
    let result = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    let elapsed = start.elapsed();

    match result {
        Ok(response) => {
            info!("{}", access_line(&method, &path, response.status(), elapsed));
            response
        }
        Err(payload) => {
            info!("{}", access_line(&method, &path, StatusCode::INTERNAL_SERVER_ERROR, elapsed));
            panic::resume_unwind(payload)
        }
    }
}

/// Converts a panic raised by a handler into a generic internal error.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Request handler panicked: {}", details);
    RestError::InternalError("Internal server error".to_owned()).into_response()
}

/// Fallback for requests that do not match any route.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Wraps `router` with the common request pipeline and records its activity in `metrics`.
///
/// This must be the last step in building the router: routes added afterwards bypass the
/// pipeline.
pub fn wrap(router: Router, metrics: HttpMetrics) -> Router {
    router
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(metrics, metrics::track))
        .layer(middleware::from_fn(log_request))
        .layer(CatchPanicLayer::custom(handle_panic))
}
