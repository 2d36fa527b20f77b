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

//! Operations on students.

use crate::db;
use crate::driver::{Driver, store_error};
use crate::model::*;
use studentapi_core::db::DbError;
use studentapi_core::driver::{DriverError, DriverResult};

/// Message returned to clients when a student does not exist.
const NOT_FOUND_MESSAGE: &str = "Student not found";

impl Driver {
    /// Gets all students.
    pub(crate) async fn list_students(self) -> DriverResult<Vec<Student>> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::list_students(&mut ex).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::DataIntegrityError(_) => store_error("Failed to parse student record", e),
            DbError::Interrupted(_) => store_error("Database error while fetching students", e),
            e => store_error("Failed to fetch students", e),
        })
    }

    /// Creates a new student with the given `fields`.
    pub(crate) async fn create_student(self, fields: StudentFields) -> DriverResult<Student> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::create_student(&mut ex, fields).await
            })
            .await?;
        let student = result.map_err(|e| store_error("Failed to create student", e))?;
        self.student_creations.inc();
        Ok(student)
    }

    /// Gets the student identified by `id`.
    pub(crate) async fn get_student(self, id: EntityId) -> DriverResult<Student> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::get_student(&mut ex, id).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::NotFound => DriverError::NotFound(NOT_FOUND_MESSAGE.to_owned()),
            e => store_error("Failed to fetch student", e),
        })
    }

    /// Replaces the contents of the student identified by `id` with `fields`.
    pub(crate) async fn update_student(
        self,
        id: EntityId,
        fields: StudentFields,
    ) -> DriverResult<Student> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::update_student(&mut ex, id, fields).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::NotFound => DriverError::NotFound(NOT_FOUND_MESSAGE.to_owned()),
            e => store_error("Failed to update student", e),
        })
    }

    /// Deletes the student identified by `id`.
    pub(crate) async fn delete_student(self, id: EntityId) -> DriverResult<()> {
        let result = self
            .with_deadline(|db| async move {
                let mut ex = db.ex().await?;
                db::delete_student(&mut ex, id).await
            })
            .await?;
        result.map_err(|e| match e {
            DbError::NotFound => DriverError::NotFound(NOT_FOUND_MESSAGE.to_owned()),
            e => store_error("Failed to delete student", e),
        })
    }
}
