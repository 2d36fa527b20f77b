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

//! Entry point to the REST server.

use crate::driver::Driver;
use crate::model::EntityId;
use async_trait::async_trait;
use axum::Router;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use log::debug;
use studentapi_core::rest::metrics::{self, HttpMetrics};
use studentapi_core::rest::{RestError, layers};

mod health_get;
mod student_delete;
mod student_get;
mod student_put;
mod students_get;
mod students_post;
#[cfg(test)]
mod testutils;
mod user_by_id_get;
mod user_delete;
mod users_get;
mod users_post;

/// Extractor for the entity identifier in the `:id` segment of a path.
///
/// Runs before any body extractor so that malformed identifiers are reported first.
pub(crate) struct IdPath(pub(crate) EntityId);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await.map_err(|e| {
            debug!("Cannot extract id from path: {}", e);
            RestError::InvalidRequest("Invalid ID".to_owned())
        })?;
        Ok(IdPath(EntityId::parse(&raw)?))
    }
}

/// Creates the router for the application.
///
/// All requests, including those to `/metrics` and to unknown routes, are recorded in `metrics`.
pub(crate) fn app(driver: Driver, metrics: HttpMetrics) -> Router {
    use axum::routing::{delete, get};

    let router = Router::new()
        .route("/api/v1/health", get(health_get::handler))
        .route("/api/v1/students", get(students_get::handler).post(students_post::handler))
        .route(
            "/api/v1/students/:id",
            get(student_get::handler).put(student_put::handler).delete(student_delete::handler),
        )
        .route("/api/v1/users", get(users_get::handler).post(users_post::handler))
        // The literal segment shadows `:id` for every method, so "by-id" must also be rejected
        // as an invalid identifier on delete.
        .route("/api/v1/users/by-id", get(user_by_id_get::handler).delete(user_delete::handler))
        .route("/api/v1/users/:id", delete(user_delete::handler))
        .with_state(driver)
        .merge(metrics::router(metrics.clone()));

    layers::wrap(router, metrics)
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use crate::model::*;
    use axum::http::{self, Method, StatusCode};
    use studentapi_core::rest::testutils::*;

    #[tokio::test]
    async fn test_e2e_student_lifecycle() {
        let context = TestContext::setup().await;

        let student = OneShotBuilder::new(context.app(), (Method::POST, "/api/v1/students"))
            .send_json(serde_json::json!({"name": "Ann", "age": 22, "email": "a@x.com"}))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(
            serde_json::json!({"id": 1, "name": "Ann", "age": 22, "email": "a@x.com"}),
            student
        );

        let fetched = OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/students/1"))
            .send_empty()
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(student, fetched);

        OneShotBuilder::new(context.app(), (Method::DELETE, "/api/v1/students/1"))
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let response = OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/students/1"))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(serde_json::json!({"error": "Student not found"}), response);

        let metrics = context.metrics();
        assert_eq!(1, metrics.request_count("/api/v1/students", "POST"));
        assert_eq!(2, metrics.request_count("/api/v1/students/:id", "GET"));
        assert_eq!(2, metrics.duration_count("/api/v1/students/:id", "GET"));
        assert_eq!(1, metrics.request_count("/api/v1/students/:id", "DELETE"));
        assert_eq!(1, metrics.status_count(StatusCode::CREATED));
        assert_eq!(1, metrics.status_count(StatusCode::OK));
        assert_eq!(1, metrics.status_count(StatusCode::NO_CONTENT));
        assert_eq!(1, metrics.status_count(StatusCode::NOT_FOUND));
        assert_eq!(1, context.student_creations());
    }

    #[tokio::test]
    async fn test_e2e_user_lifecycle() {
        let context = TestContext::setup().await;

        let user = OneShotBuilder::new(context.app(), (Method::POST, "/api/v1/users"))
            .send_json(serde_json::json!({"name": "Carol", "email": "c@x.com"}))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<User>()
            .await;

        let users = OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users"))
            .send_empty()
            .await
            .expect_json::<Vec<User>>()
            .await;
        assert_eq!(vec![user.clone()], users);

        let fetched = OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/users/by-id"))
            .with_query([("id", user.id().as_i64())])
            .send_empty()
            .await
            .expect_json::<User>()
            .await;
        assert_eq!(user, fetched);

        let path = format!("/api/v1/users/{}", user.id().as_i64());
        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;
        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("^User not found$")
            .await;

        assert_eq!(0, context.student_creations());
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), (Method::POST, "/api/v1/students"))
            .send_json(serde_json::json!({"name": "Ann", "age": 22, "email": "a@x.com"}))
            .await
            .expect_status(StatusCode::CREATED)
            .take_response()
            .await;
        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/health"))
            .send_empty()
            .await
            .take_response()
            .await;

        let response = OneShotBuilder::new(context.app(), (Method::GET, "/metrics"))
            .send_empty()
            .await
            .take_response()
            .await;
        assert_eq!(
            "text/plain; version=0.0.4",
            response.headers().get(http::header::CONTENT_TYPE).unwrap()
        );
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("student_creations_total 1"), "{}", body);
        assert!(
            body.contains(r#"http_requests_total{method="POST",route="/api/v1/students"} 1"#),
            "{}",
            body
        );
        assert!(
            body.contains(r#"http_requests_total{method="GET",route="/api/v1/health"} 1"#),
            "{}",
            body
        );
        assert!(
            body.contains(r#"http_response_status_codes_total{status_code="201"} 1"#),
            "{}",
            body
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), (Method::GET, "/api/v2/students"))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_empty()
            .await;

        assert_eq!(1, context.metrics().request_count("unmatched", "GET"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let context = TestContext::setup_stalled();

        OneShotBuilder::new(context.app(), (Method::GET, "/api/v1/students"))
            .send_empty()
            .await
            .expect_status(StatusCode::GATEWAY_TIMEOUT)
            .expect_error("^Request timed out$")
            .await;

        assert_eq!(1, context.metrics().status_count(StatusCode::GATEWAY_TIMEOUT));
    }
}
