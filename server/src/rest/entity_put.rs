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

//! API to update an existing entity.

use crate::driver::Driver;
use crate::model::{Entity, Identity};
use crate::rest::{ALERTS, Resource, entity_post};
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use hospital_core::rest::RestResult;
use log::debug;

/// API handler.
///
/// Entities without an identifier are created as if they had been posted.
pub(crate) async fn handler<T: Resource>(
    State(driver): State<Driver>,
    Json(entity): Json<Entity<T>>,
) -> RestResult<Response> {
    debug!("REST request to update {}: {:?}", T::NAME, entity);
    match entity.into_parts() {
        (Identity::Unsaved, fields) => entity_post::create(driver, fields).await,
        (Identity::Saved(id), fields) => {
            let entity = driver.update(id, fields).await?;
            let headers = ALERTS.updated(T::NAME, entity.saved_id().unwrap_or(id))?;
            Ok((headers, Json(entity)).into_response())
        }
    }
}
