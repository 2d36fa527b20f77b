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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::*;
use crate::rest::app;
use axum::Router;
use studentapi_core::db::DbError;
use studentapi_core::rest::metrics::HttpMetrics;

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the business layer, which gives direct access to the database.
    inner: DriverTestContext,

    /// The fully-wrapped router for the application.
    app: Router,
}

impl TestContext {
    /// Creates the app with the given driver-level `inner` context.
    fn from_inner(inner: DriverTestContext) -> Self {
        let app = app(inner.driver(), inner.metrics());
        Self { inner, app }
    }

    /// Initializes the app with an in-memory database that has the service's schema.
    pub(crate) async fn setup() -> Self {
        Self::from_inner(DriverTestContext::setup().await)
    }

    /// Initializes the app with an in-memory database that has no tables.
    pub(crate) async fn setup_without_schema() -> Self {
        Self::from_inner(DriverTestContext::setup_without_schema().await)
    }

    /// Initializes the app with a database that never answers.
    pub(crate) fn setup_stalled() -> Self {
        Self::from_inner(DriverTestContext::setup_stalled())
    }

    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    pub(crate) fn metrics(&self) -> HttpMetrics {
        self.inner.metrics()
    }

    pub(crate) fn student_creations(&self) -> u64 {
        self.inner.student_creations()
    }

    pub(crate) async fn exec_raw(&self, query: &str) {
        self.inner.exec_raw(query).await
    }

    pub(crate) async fn create_student(&self, name: &str, age: i32) -> Student {
        self.inner.create_student(name, age).await
    }

    pub(crate) async fn create_user(&self, name: &str) -> User {
        self.inner.create_user(name).await
    }

    /// Gets the student with the raw `id` straight from the database, if it exists.
    pub(crate) async fn get_student(&self, id: i64) -> Option<Student> {
        match db::get_student(&mut self.inner.ex().await, EntityId::new(id).unwrap()).await {
            Ok(student) => Some(student),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    /// Gets the user with the raw `id` straight from the database, if it exists.
    pub(crate) async fn get_user(&self, id: i64) -> Option<User> {
        match db::get_user(&mut self.inner.ex().await, EntityId::new(id).unwrap()).await {
            Ok(user) => Some(user),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
