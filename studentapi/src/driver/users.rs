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

//! Operations on users.

use crate::db;
use crate::driver::{Driver, store_error};
use crate::model::*;
use studentapi_core::db::DbError;
use studentapi_core::driver::{DriverError, DriverResult};

/// Message returned to clients when a user does not exist.
const NOT_FOUND_MESSAGE: &str = "User not found";

impl Driver {
    /// Gets all users.
    pub(crate) async fn list_users(self) -> DriverResult<Vec<User>> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::list_users(&mut ex).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::DataIntegrityError(_) => store_error("Failed to parse user record", e),
            DbError::Interrupted(_) => store_error("Database error while fetching users", e),
            e => store_error("Failed to fetch users", e),
        })
    }

    /// Creates a new user with the given `fields`.
    pub(crate) async fn create_user(self, fields: UserFields) -> DriverResult<User> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::create_user(&mut ex, fields).await
            })
            .await?;
        result.map_err(|e| store_error("Failed to create user", e))
    }

    /// Gets the user identified by `id`.
    pub(crate) async fn get_user(self, id: EntityId) -> DriverResult<User> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::get_user(&mut ex, id).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::NotFound => DriverError::NotFound(NOT_FOUND_MESSAGE.to_owned()),
            e => store_error("Failed to fetch user", e),
        })
    }

    /// Deletes the user identified by `id`.
    pub(crate) async fn delete_user(self, id: EntityId) -> DriverResult<()> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::delete_user(&mut ex, id).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::NotFound => DriverError::NotFound(NOT_FOUND_MESSAGE.to_owned()),
            e => store_error("Failed to delete user", e),
        })
    }
}
