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

//! Database abstraction in terms of the operations needed by the server.
//!
//! Every function here issues exactly one statement against the executor it receives.

use crate::model::{EntityId, Student, StudentFields, User, UserFields};
use futures::TryStreamExt;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
#[cfg(feature = "postgres")]
use studentapi_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use studentapi_core::db::sqlite;
use studentapi_core::db::{DbError, DbResult, Executor};


/// Initializes the database schema.
///
/// The schema only creates missing tables so this is safe to call on every startup.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Student {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let age: i32 = row.try_get("age").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;

        Ok(Student::new(EntityId::new(id)?, name, age, email))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;

        Ok(User::new(EntityId::new(id)?, name, email))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Student {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let age: i32 = row.try_get("age").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;

        Ok(Student::new(EntityId::new(id)?, name, age, email))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;

        Ok(User::new(EntityId::new(id)?, name, email))
    }
}

/// Converts the raw `id` returned by an insertion into an identifier.
fn new_id(id: i64) -> DbResult<EntityId> {
    EntityId::new(id).map_err(|e| DbError::BackendError(format!("Invalid generated id: {}", e)))
}

/// Classifies an error `e` raised while streaming a result set after `rows_read` rows.
///
/// An error before the first row means that the query itself failed.
fn stream_error(e: DbError, rows_read: usize) -> DbError {
    if rows_read == 0 {
        e
    } else {
        DbError::Interrupted(e.to_string())
    }
}

/// Ensures that a deletion affected exactly one row.
fn check_deletion(rows_affected: u64) -> DbResult<()> {
    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}

/// Gets all students, sorted by their identifier.
pub async fn list_students(ex: &mut Executor) -> DbResult<Vec<Student>> {
    let query_str = "SELECT id, name, age, email FROM students ORDER BY id";
    let mut students = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| stream_error(postgres::map_sqlx_error(e), students.len()))?
            {
                students.push(Student::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| stream_error(sqlite::map_sqlx_error(e), students.len()))?
            {
                students.push(Student::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(students)
}

/// Creates a new student with the given `fields` and returns it with its assigned identifier.
pub async fn create_student(ex: &mut Executor, fields: StudentFields) -> DbResult<Student> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO students (name, age, email) VALUES ($1, $2, $3) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(*fields.age())
                .bind(fields.email())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO students (name, age, email) VALUES (?, ?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(*fields.age())
                .bind(fields.email())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(fields.with_id(new_id(id)?))
}

/// Gets the student identified by `id`.
pub async fn get_student(ex: &mut Executor, id: EntityId) -> DbResult<Student> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, age, email FROM students WHERE id = $1";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            match maybe_row {
                Some(row) => Student::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, age, email FROM students WHERE id = ?";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            match maybe_row {
                Some(row) => Student::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Replaces the contents of the student identified by `id` with `fields` and returns the
/// record as stored after the update.
pub async fn update_student(
    ex: &mut Executor,
    id: EntityId,
    fields: StudentFields,
) -> DbResult<Student> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE students SET name = $1, age = $2, email = $3
                WHERE id = $4
                RETURNING id, name, age, email
            ";
            let maybe_row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(*fields.age())
                .bind(fields.email())
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            match maybe_row {
                Some(row) => Student::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE students SET name = ?, age = ?, email = ?
                WHERE id = ?
                RETURNING id, name, age, email
            ";
            let maybe_row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(*fields.age())
                .bind(fields.email())
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            match maybe_row {
                Some(row) => Student::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Deletes the student identified by `id`.
pub async fn delete_student(ex: &mut Executor, id: EntityId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM students WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM students WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    check_deletion(rows_affected)
}

/// Gets all users, sorted by their identifier.
pub async fn list_users(ex: &mut Executor) -> DbResult<Vec<User>> {
    let query_str = "SELECT id, name, email FROM users ORDER BY id";
    let mut users = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| stream_error(postgres::map_sqlx_error(e), users.len()))?
            {
                users.push(User::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| stream_error(sqlite::map_sqlx_error(e), users.len()))?
            {
                users.push(User::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(users)
}

/// Creates a new user with the given `fields` and returns it with its assigned identifier.
pub async fn create_user(ex: &mut Executor, fields: UserFields) -> DbResult<User> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(fields.email())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO users (name, email) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name())
                .bind(fields.email())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(fields.with_id(new_id(id)?))
}

/// Gets the user identified by `id`.
pub async fn get_user(ex: &mut Executor, id: EntityId) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, email FROM users WHERE id = $1";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            match maybe_row {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, email FROM users WHERE id = ?";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            match maybe_row {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Deletes the user identified by `id`.
pub async fn delete_user(ex: &mut Executor, id: EntityId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM users WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM users WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    check_deletion(rows_affected)
}
