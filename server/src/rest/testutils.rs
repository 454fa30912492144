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

//! Test utilities for the REST API.

use crate::db::{self, Table};
use crate::driver::{Driver, DriverOptions};
use crate::model::{Entity, EntityId};
use crate::rest::app;
use axum::Router;
use hospital_core::db::sqlite::testutils::setup;
use hospital_core::db::{Db, DbError};
use std::sync::Arc;

/// State of a running test.
pub(crate) struct TestContext {
    db: Arc<dyn Db + Send + Sync>,
    app: Router,
}

impl TestContext {
    /// Initializes the app backed by an empty in-memory database.
    pub(crate) async fn setup() -> Self {
        let db = setup().await;
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let db: Arc<dyn Db + Send + Sync> = Arc::new(db);
        let driver = Driver::new(db.clone(), DriverOptions::default());
        let app = app(driver);
        Self { db, app }
    }

    /// Returns a copy of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Stores `fields` directly in the database and returns the identifier of the new entity.
    pub(crate) async fn insert<T: Table>(&self, fields: &T) -> EntityId {
        db::insert(&mut self.db.ex().await.unwrap(), fields).await.unwrap()
    }

    /// Gets the entity of type `T` identified by `id` directly from the database, if it exists.
    pub(crate) async fn get<T: Table>(&self, id: EntityId) -> Option<Entity<T>> {
        match db::get::<T>(&mut self.db.ex().await.unwrap(), id).await {
            Ok(entity) => Some(entity),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    /// Counts the entities of type `T` directly in the database.
    pub(crate) async fn count<T: Table>(&self) -> u64 {
        db::count::<T>(&mut self.db.ex().await.unwrap()).await.unwrap()
    }
}
