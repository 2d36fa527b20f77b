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

//! Test utilities for the business layer.

use crate::db;
use crate::driver::{Driver, DriverOptions};
use crate::model::*;
use async_trait::async_trait;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use studentapi_core::db::sqlite::testutils::setup as setup_sqlite;
use studentapi_core::db::{Db, DbResult, Executor};
use studentapi_core::rest::metrics::HttpMetrics;

/// A database whose executors never become available, to simulate a hung backend.
pub(crate) struct StalledDb;

#[async_trait]
impl Db for StalledDb {
    async fn ex(&self) -> DbResult<Executor> {
        futures::future::pending().await
    }

    async fn close(&self) {}
}

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The HTTP metrics whose registry also holds the driver's metrics.
    metrics: HttpMetrics,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database with the service's schema.
    pub(crate) async fn setup() -> Self {
        let db = Arc::new(setup_sqlite().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        Self::setup_with(db, DriverOptions::default())
    }

    /// Initializes the driver using an in-memory database without any tables, so that every
    /// operation that reaches the database fails.
    pub(crate) async fn setup_without_schema() -> Self {
        Self::setup_with(Arc::new(setup_sqlite().await), DriverOptions::default())
    }

    /// Initializes the driver using a database that never answers and a short query timeout.
    pub(crate) fn setup_stalled() -> Self {
        Self::setup_with(
            Arc::new(StalledDb),
            DriverOptions { query_timeout: Duration::from_millis(10) },
        )
    }

    /// Initializes the driver using the given already-initialized objects.
    pub(crate) fn setup_with(db: Arc<dyn Db + Send + Sync>, opts: DriverOptions) -> Self {
        let metrics = HttpMetrics::new(Registry::new()).unwrap();
        let driver = Driver::new(db.clone(), metrics.registry(), opts).unwrap();
        Self { db, metrics, driver }
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Gets the HTTP metrics in this test context.
    pub(crate) fn metrics(&self) -> HttpMetrics {
        self.metrics.clone()
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns the number of students created through the driver.
    pub(crate) fn student_creations(&self) -> u64 {
        self.driver.student_creations.get()
    }

    /// Syntactic sugar to create a student directly in the database.
    pub(crate) async fn create_student(&self, name: &str, age: i32) -> Student {
        let fields = StudentFields::new(
            name.to_owned(),
            age,
            format!("{}@example.com", name.to_lowercase()),
        );
        db::create_student(&mut self.ex().await, fields).await.unwrap()
    }

    /// Syntactic sugar to create a user directly in the database.
    pub(crate) async fn create_user(&self, name: &str) -> User {
        let fields =
            UserFields::new(name.to_owned(), format!("{}@example.com", name.to_lowercase()));
        db::create_user(&mut self.ex().await, fields).await.unwrap()
    }

    /// Runs a raw `query` against the SQLite database backing this context.
    pub(crate) async fn exec_raw(&self, query: &str) {
        match &mut self.ex().await {
            Executor::Sqlite(ex) => {
                sqlx::query(query).execute(&mut **ex).await.unwrap();
            }

            #[allow(unused)]
            _ => unreachable!(),
        }
    }
}
