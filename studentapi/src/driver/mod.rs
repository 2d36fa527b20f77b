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

//! Business logic for the service.

use log::{error, warn};
use prometheus::{IntCounter, Registry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use studentapi_core::db::{Db, DbError, DbResult};
use studentapi_core::driver::{DriverError, DriverResult};
use studentapi_core::env::get_optional_var;

mod students;
#[cfg(test)]
pub(crate) mod testutils;
mod users;

/// Default value for the `QUERY_TIMEOUT_MS` setting when not specified.
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30 * 1000;

/// Message returned to clients when an operation does not complete within its deadline.
const TIMEOUT_MESSAGE: &str = "Request timed out";

/// Configuration options for the driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DriverOptions {
    /// Maximum amount of time that a single operation may spend talking to the database.
    pub query_timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS) }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            query_timeout: Duration::from_millis(
                get_optional_var::<u64>(prefix, "QUERY_TIMEOUT_MS")?
                    .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS),
            ),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": each issues exactly one
/// database call.  These operations consume the driver to make it hard to chain two of them as
/// if they were a single unit.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Number of students created since startup.
    student_creations: IntCounter,

    /// Options for the driver.
    opts: DriverOptions,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    ///
    /// The driver's own metrics are registered in `registry`.
    pub(crate) fn new(
        db: Arc<dyn Db + Send + Sync>,
        registry: &Registry,
        opts: DriverOptions,
    ) -> Result<Self, prometheus::Error> {
        let student_creations =
            IntCounter::new("student_creations_total", "Total number of student records created")?;
        registry.register(Box::new(student_creations.clone()))?;
        Ok(Self { db, student_creations, opts })
    }

    /// Runs `op` against a fresh executor, giving up after the configured query timeout.
    ///
    /// The outer result reports a missed deadline.  The inner result is the outcome of `op`,
    /// which callers translate into messages suitable for clients.
    async fn with_deadline<F, Fut, T>(&self, op: F) -> DriverResult<DbResult<T>>
    where
        F: FnOnce(Arc<dyn Db + Send + Sync>) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.opts.query_timeout, op(self.db.clone())).await {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!("Database operation exceeded {:?}", self.opts.query_timeout);
                Err(DriverError::DeadlineExceeded(TIMEOUT_MESSAGE.to_owned()))
            }
        }
    }
}

/// Converts an unexpected database error `e` into a generic client-facing `message`, logging the
/// details that the client does not get to see.
fn store_error(message: &str, e: DbError) -> DriverError {
    error!("{}: {}", message, e);
    DriverError::BackendError(message.to_owned())
}
