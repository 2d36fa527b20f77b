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

//! API to create a new student.

use crate::driver::Driver;
use crate::model::StudentFields;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use studentapi_core::rest::{JsonBody, RestResult};

/// Message sent to the server to create a student.
#[derive(Deserialize, Serialize)]
pub(crate) struct StudentCreateRequest {
    /// Full name of the student.
    pub(crate) name: String,

    /// Age of the student.
    pub(crate) age: i32,

    /// Contact email address.
    pub(crate) email: String,
}

impl From<StudentCreateRequest> for StudentFields {
    fn from(request: StudentCreateRequest) -> Self {
        StudentFields::new(request.name, request.age, request.email)
    }
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    JsonBody(request): JsonBody<StudentCreateRequest>,
) -> RestResult<impl IntoResponse> {
    let student = driver.create_student(request.into()).await?;
    Ok((StatusCode::CREATED, Json(student)))
}
