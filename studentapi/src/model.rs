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

//! High-level data types.

use derive_getters::Getters;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use studentapi_core::model::{ModelError, ModelResult};

/// Identifier of a stored entity.  Identifiers are assigned by the database at creation time and
/// are always positive.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityId(i64);

impl EntityId {
    /// Creates an identifier from its raw `id` value, validating that it is positive.
    pub fn new(id: i64) -> ModelResult<Self> {
        if id < 1 {
            return Err(ModelError("Invalid ID".to_owned()));
        }
        Ok(Self(id))
    }

    /// Parses an identifier from its textual representation in `s`.
    pub fn parse(s: &str) -> ModelResult<Self> {
        match s.parse::<i64>() {
            Ok(id) => Self::new(id),
            Err(_) => Err(ModelError("Invalid ID".to_owned())),
        }
    }

    /// Returns the raw value of the identifier.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

/// A student record.
#[derive(Clone, Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct Student {
    /// Identifier assigned by the database.
    id: EntityId,

    /// Full name of the student.
    name: String,

    /// Age of the student.  Not validated.
    age: i32,

    /// Contact email address.  Not validated.
    email: String,
}

/// The contents of a student record, without an identifier.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct StudentFields {
    /// Full name of the student.
    name: String,

    /// Age of the student.
    age: i32,

    /// Contact email address.
    email: String,
}

impl StudentFields {
    /// Attaches the database-assigned `id` to these fields to form a full record.
    pub fn with_id(self, id: EntityId) -> Student {
        Student::new(id, self.name, self.age, self.email)
    }
}

/// A user record.
#[derive(Clone, Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct User {
    /// Identifier assigned by the database.
    id: EntityId,

    /// Display name of the user.
    name: String,

    /// Contact email address.
    email: String,
}

/// The contents of a user record, without an identifier.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct UserFields {
    /// Display name of the user.
    name: String,

    /// Contact email address.
    email: String,
}

impl UserFields {
    /// Attaches the database-assigned `id` to these fields to form a full record.
    pub fn with_id(self, id: EntityId) -> User {
        User::new(id, self.name, self.email)
    }
}
