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

//! Entry point to the student records service.

#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::error;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};
use std::process;
use std::sync::Arc;
use studentapi::db::init_schema;
use studentapi::driver::DriverOptions;
use studentapi::serve;
use studentapi_core::db::Db;
use studentapi_core::db::postgres::{PostgresDb, PostgresOptions};
use studentapi_core::env::get_optional_var;

/// Prefix of the environment variables that configure the service.
const CONFIG_PREFIX: &str = "STUDENTAPI";

/// Prefix of the environment variables that configure the database connection.
const DB_PREFIX: &str = "DB";

/// Port to listen on when `STUDENTAPI_PORT` is not set.
const DEFAULT_PORT: u16 = 8080;

/// Reads the configuration, prepares the database and runs the server until it stops.
async fn run() -> Result<(), Box<dyn Error>> {
    let address = get_optional_var::<IpAddr>(CONFIG_PREFIX, "ADDRESS")?
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let port = get_optional_var::<u16>(CONFIG_PREFIX, "PORT")?.unwrap_or(DEFAULT_PORT);
    let opts = DriverOptions::from_env(CONFIG_PREFIX)?;

    let db_opts = PostgresOptions::from_env(DB_PREFIX)?;
    let db = Arc::new(PostgresDb::connect(db_opts)?);
    init_schema(&mut db.ex().await?).await?;

    serve((address, port), db, opts).await
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        process::exit(1);
    }
}
