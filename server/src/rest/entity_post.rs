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

//! API to create a new entity.

use crate::driver::Driver;
use crate::model::{Entity, Identity};
use crate::rest::{ALERTS, Resource};
use axum::Json;
use axum::extract::State;
use axum::http::{self, HeaderValue};
use axum::response::{IntoResponse, Response};
use hospital_core::rest::{RestError, RestResult};
use log::debug;

/// Stores `fields` as a new entity and builds the response to its creation.
pub(super) async fn create<T: Resource>(driver: Driver, fields: T) -> RestResult<Response> {
    let entity = driver.create(fields).await?;
    let id = entity.saved_id().ok_or_else(|| {
        RestError::InternalError(format!("Stored {} has no identifier", T::NAME))
    })?;

    let mut headers = ALERTS.created(T::NAME, id)?;
    headers.insert(http::header::LOCATION, HeaderValue::try_from(T::entity_path(id))?);
    Ok((http::StatusCode::CREATED, headers, Json(entity)).into_response())
}

/// API handler.
pub(crate) async fn handler<T: Resource>(
    State(driver): State<Driver>,
    Json(entity): Json<Entity<T>>,
) -> RestResult<Response> {
    debug!("REST request to save {}: {:?}", T::NAME, entity);
    match entity.into_parts() {
        (Identity::Unsaved, fields) => create(driver, fields).await,
        (Identity::Saved(_), _) => Err(RestError::EntityRejected {
            alert: ALERTS.failure(T::NAME, "idexists"),
            message: format!("A new {} cannot already have an ID", T::NAME),
        }),
    }
}
