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

//! Operations on one entity.

use crate::db::{self, Table};
use crate::driver::Driver;
use crate::model::*;
use hospital_core::db::DbError;
use hospital_core::driver::{DriverError, DriverResult};
use log::debug;

/// Converts an error raised while writing an entity of type `T` into a driver error.
///
/// Writes only fail with `NotFound` when the entity refers to another one that does not exist,
/// which is a problem with the input and not with the entity being written.
fn map_write_error<T: Table>(e: DbError) -> DriverError {
    match e {
        DbError::NotFound => DriverError::InvalidInput(format!(
            "{} refers to an entity that does not exist",
            T::NAME
        )),
        e => e.into(),
    }
}

impl Driver {
    /// Stores `fields` as a new entity of type `T` and returns the stored entity.
    pub(crate) async fn create<T: Table>(self, fields: T) -> DriverResult<Entity<T>> {
        let mut tx = self.db.begin().await?;
        let id = db::insert(tx.ex(), &fields).await.map_err(map_write_error::<T>)?;
        let entity = db::get::<T>(tx.ex(), id).await?;
        tx.commit().await?;
        Ok(entity)
    }

    /// Replaces the fields of the entity of type `T` identified by `id` with `fields`.
    ///
    /// If there is no such entity, `fields` are stored as a new entity whose identifier is
    /// assigned by the database and not taken from `id`.
    pub(crate) async fn update<T: Table>(self, id: EntityId, fields: T) -> DriverResult<Entity<T>> {
        let mut tx = self.db.begin().await?;
        let updated = db::update(tx.ex(), id, &fields).await.map_err(map_write_error::<T>)?;
        let id = if updated {
            id
        } else {
            let new_id = db::insert(tx.ex(), &fields).await.map_err(map_write_error::<T>)?;
            debug!("{} {} does not exist; stored as {}", T::NAME, id, new_id);
            new_id
        };
        let entity = db::get::<T>(tx.ex(), id).await?;
        tx.commit().await?;
        Ok(entity)
    }

    /// Gets the entity of type `T` identified by `id`.
    pub(crate) async fn get<T: Table>(self, id: EntityId) -> DriverResult<Entity<T>> {
        let entity = db::get::<T>(&mut self.db.ex().await?, id).await?;
        Ok(entity)
    }

    /// Deletes the entity of type `T` identified by `id`.
    ///
    /// Deleting an entity that does not exist is not an error.
    pub(crate) async fn delete<T: Table>(self, id: EntityId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        match db::delete::<T>(tx.ex(), id).await {
            Ok(()) => (),
            Err(DbError::NotFound) => {
                debug!("{} {} does not exist; nothing to delete", T::NAME, id)
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(())
    }
}
