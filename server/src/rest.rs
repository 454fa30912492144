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

//! Entry point to the REST server.
//!
//! Every entity type is exposed as a resource under `/api/<collection>` with the same set of
//! generic handlers.

use crate::db::Table;
use crate::driver::Driver;
use crate::model::*;
use axum::Router;
use hospital_core::rest::Alerts;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

mod entities_get;
mod entity_delete;
mod entity_get;
mod entity_post;
mod entity_put;
#[cfg(test)]
mod testutils;

/// Generator of the alert headers that clients use to notify users about the outcome of their
/// requests.
const ALERTS: Alerts = Alerts::new("hospitalManagementApp");

/// An entity type that is exposed through the REST API.
pub(crate) trait Resource:
    Table + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the collection that holds all entities of this type, used as the path component
    /// of the resource.
    const COLLECTION: &'static str;

    /// Returns the path to the collection of entities of this type.
    fn collection_path() -> String {
        format!("/api/{}", Self::COLLECTION)
    }

    /// Returns the path to the entity of this type identified by `id`.
    fn entity_path(id: EntityId) -> String {
        format!("/api/{}/{}", Self::COLLECTION, id)
    }
}

impl Resource for Appointment {
    const COLLECTION: &'static str = "appointments";
}

impl Resource for Country {
    const COLLECTION: &'static str = "countries";
}

impl Resource for District {
    const COLLECTION: &'static str = "districts";
}

impl Resource for Patient {
    const COLLECTION: &'static str = "patients";
}

impl Resource for State {
    const COLLECTION: &'static str = "states";
}

/// Creates the routes for the resource of type `T`.
fn routes<T: Resource>() -> Router<Driver> {
    use axum::routing::get;
    let collection = T::collection_path();
    let entity = format!("{}/:id", collection);
    Router::new()
        .route(
            &collection,
            get(entities_get::handler::<T>)
                .post(entity_post::handler::<T>)
                .put(entity_put::handler::<T>),
        )
        .route(&entity, get(entity_get::handler::<T>).delete(entity_delete::handler::<T>))
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    Router::new()
        .merge(routes::<Appointment>())
        .merge(routes::<Country>())
        .merge(routes::<District>())
        .merge(routes::<Patient>())
        .merge(routes::<State>())
        .with_state(driver)
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use axum::http;
    use hospital_core::rest::testutils::*;
    use serde_json::json;

    #[test]
    fn test_resource_paths() {
        assert_eq!("/api/countries", Country::collection_path());
        assert_eq!("/api/appointments/5", Appointment::entity_path(EntityId::new(5)));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), (http::Method::GET, "/api/hospitals"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_empty()
            .await;
    }

    #[tokio::test]
    async fn test_district_lifecycle() {
        let context = TestContext::setup().await;

        let created = OneShotBuilder::new(context.app(), (http::Method::POST, "/api/districts"))
            .send_json(json!({"district": "AAAAAAAAAA"}))
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<Entity<District>>()
            .await;
        let id = created.saved_id().unwrap();
        assert_eq!(1, context.count::<District>().await);

        let path = format!("/api/districts/{}", id);
        let fetched = OneShotBuilder::new(context.app(), (http::Method::GET, &path))
            .send_empty()
            .await
            .expect_json::<Entity<District>>()
            .await;
        assert_eq!(created, fetched);

        let updated = OneShotBuilder::new(context.app(), (http::Method::PUT, "/api/districts"))
            .send_json(json!({"id": id, "district": "BBBBBBBBBB"}))
            .await
            .expect_json::<Entity<District>>()
            .await;
        assert_eq!(Entity::saved(id, District::new(Some("BBBBBBBBBB".to_owned()))), updated);
        assert_eq!(1, context.count::<District>().await);

        OneShotBuilder::new(context.app(), (http::Method::DELETE, &path))
            .send_empty()
            .await
            .expect_empty()
            .await;
        assert_eq!(0, context.count::<District>().await);

        OneShotBuilder::new(context.app(), (http::Method::GET, &path))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_empty()
            .await;
    }
}
