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

//! API to get a single user, identified by a query parameter.

use crate::driver::Driver;
use crate::model::{EntityId, User};
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use log::debug;
use serde::{Deserialize, Serialize};
use studentapi_core::rest::{RestError, RestResult};

/// Query parameters for this API.
#[derive(Deserialize, Serialize)]
pub(crate) struct UserByIdQuery {
    /// Identifier of the user to fetch, in textual form.
    pub(crate) id: Option<String>,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    query: Result<Query<UserByIdQuery>, QueryRejection>,
) -> RestResult<Json<User>> {
    let raw_id = match query {
        Ok(Query(UserByIdQuery { id: Some(id) })) => id,
        Ok(Query(UserByIdQuery { id: None })) => {
            return Err(RestError::InvalidRequest("Invalid ID".to_owned()));
        }
        Err(e) => {
            debug!("Cannot parse query: {}", e);
            return Err(RestError::InvalidRequest("Invalid ID".to_owned()));
        }
    };
    let id = EntityId::parse(&raw_id)?;

    let user = driver.get_user(id).await?;
    Ok(Json(user))
}
