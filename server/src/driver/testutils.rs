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

use crate::db::init_schema;
use crate::driver::{Driver, DriverOptions};
use hospital_core::db::sqlite;
use hospital_core::db::{Db, Executor};
use std::sync::Arc;

/// State of a running test.
pub(crate) struct TestContext {
    db: Arc<dyn Db + Send + Sync>,
    driver: Driver,
}

impl TestContext {
    /// Initializes a driver backed by an empty in-memory database with default options.
    pub(crate) async fn setup() -> Self {
        Self::setup_with_opts(DriverOptions::default()).await
    }

    /// Initializes a driver backed by an empty in-memory database with the given `opts`.
    pub(crate) async fn setup_with_opts(opts: DriverOptions) -> Self {
        Self::with_db(Arc::new(sqlite::testutils::setup().await), opts).await
    }

    /// Initializes a driver backed by the PostgreSQL test database with default options.
    #[cfg(feature = "postgres")]
    pub(crate) async fn setup_postgres() -> Self {
        use hospital_core::db::postgres;
        Self::with_db(Arc::new(postgres::testutils::setup().await), DriverOptions::default()).await
    }

    /// Initializes the schema in `db` and creates a driver on top of it.
    async fn with_db(db: Arc<dyn Db + Send + Sync>, opts: DriverOptions) -> Self {
        init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let driver = Driver::new(db.clone(), opts);
        Self { db, driver }
    }

    /// Returns a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns a copy of the driver backing this context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }
}
