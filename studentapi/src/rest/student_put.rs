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

//! API to replace the contents of an existing student.

use crate::driver::Driver;
use crate::model::{Student, StudentFields};
use crate::rest::IdPath;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use studentapi_core::rest::{JsonBody, RestResult};

/// Message sent to the server to update a student.  All fields are replaced.
#[derive(Deserialize, Serialize)]
pub(crate) struct StudentUpdateRequest {
    /// New full name of the student.
    pub(crate) name: String,

    /// New age of the student.
    pub(crate) age: i32,

    /// New contact email address.
    pub(crate) email: String,
}

impl From<StudentUpdateRequest> for StudentFields {
    fn from(request: StudentUpdateRequest) -> Self {
        StudentFields::new(request.name, request.age, request.email)
    }
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    IdPath(id): IdPath,
    JsonBody(request): JsonBody<StudentUpdateRequest>,
) -> RestResult<Json<Student>> {
    let student = driver.update_student(id, request.into()).await?;
    Ok(Json(student))
}
