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

//! API to get a page of entities.

use crate::driver::Driver;
use crate::model::Entity;
use crate::rest::Resource;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use hospital_core::model::PageRequest;
use hospital_core::rest::{EmptyBody, RestResult, pagination_headers};
use log::debug;

/// API handler.
pub(crate) async fn handler<T: Resource>(
    State(driver): State<Driver>,
    request: PageRequest,
    _: EmptyBody,
) -> RestResult<(HeaderMap, Json<Vec<Entity<T>>>)> {
    debug!("REST request to get a page of {}: {:?}", T::COLLECTION, request);
    let page = driver.list::<T>(&request).await?;
    let headers =
        pagination_headers(&T::collection_path(), page.total(), page.number(), page.size())?;
    Ok((headers, Json(page.into_items())))
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use hospital_core::rest::testutils::*;
    use hospital_core::test_payload_must_be_empty;

    fn route(collection: &str) -> (http::Method, String) {
        (http::Method::GET, format!("/api/{}", collection))
    }

    /// Inserts one district per name in `names` and returns their identifiers in order.
    async fn insert_districts(context: &TestContext, names: &[&str]) -> Vec<EntityId> {
        let mut ids = vec![];
        for name in names {
            ids.push(context.insert(&District::new(Some((*name).to_owned()))).await);
        }
        ids
    }

    fn ids_of<T>(entities: &[Entity<T>]) -> Vec<EntityId> {
        entities.iter().map(|e| e.saved_id().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_empty() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.into_app(), route("appointments"))
            .send_empty()
            .await
            .expect_header("x-total-count", "0")
            .expect_header(
                "link",
                "</api/appointments?page=0&size=20>; rel=\"last\",\
                 </api/appointments?page=0&size=20>; rel=\"first\"",
            )
            .expect_json::<Vec<Entity<Appointment>>>()
            .await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_default_page() {
        let context = TestContext::setup().await;

        let ids = insert_districts(&context, &["a", "b", "c"]).await;

        let response = OneShotBuilder::new(context.into_app(), route("districts"))
            .send_empty()
            .await
            .expect_header("x-total-count", "3")
            .expect_json::<Vec<Entity<District>>>()
            .await;
        assert_eq!(ids, ids_of(&response));
        assert_eq!(&District::new(Some("b".to_owned())), response[1].fields());
    }

    #[tokio::test]
    async fn test_middle_page() {
        let context = TestContext::setup().await;

        let ids = insert_districts(&context, &["a", "b", "c", "d", "e"]).await;

        let response = OneShotBuilder::new(context.into_app(), route("districts"))
            .with_query([("page", "1"), ("size", "2")])
            .send_empty()
            .await
            .expect_header("x-total-count", "5")
            .expect_header(
                "link",
                "</api/districts?page=2&size=2>; rel=\"next\",\
                 </api/districts?page=0&size=2>; rel=\"prev\",\
                 </api/districts?page=2&size=2>; rel=\"last\",\
                 </api/districts?page=0&size=2>; rel=\"first\"",
            )
            .expect_json::<Vec<Entity<District>>>()
            .await;
        assert_eq!(ids[2..4].to_vec(), ids_of(&response));
    }

    #[tokio::test]
    async fn test_sorted() {
        let context = TestContext::setup().await;

        let ids = insert_districts(&context, &["b", "c", "a", "c"]).await;

        let response = OneShotBuilder::new(context.app(), route("districts"))
            .with_query([("sort", "id,desc")])
            .send_empty()
            .await
            .expect_json::<Vec<Entity<District>>>()
            .await;
        assert_eq!(vec![ids[3], ids[2], ids[1], ids[0]], ids_of(&response));

        let response = OneShotBuilder::new(context.app(), route("districts"))
            .with_query([("sort", "district,desc")])
            .send_empty()
            .await
            .expect_json::<Vec<Entity<District>>>()
            .await;
        assert_eq!(vec![ids[1], ids[3], ids[0], ids[2]], ids_of(&response));
    }

    #[tokio::test]
    async fn test_sorted_by_reference() {
        let context = TestContext::setup().await;

        let patient1 = context.insert(&Patient::default()).await;
        let patient2 = context.insert(&Patient::default()).await;
        let mut ids = vec![];
        for patient_id in [patient2, patient1, patient2] {
            let fields = Appointment::new(None, None, Some(patient_id));
            ids.push(context.insert(&fields).await);
        }

        let response = OneShotBuilder::new(context.into_app(), route("appointments"))
            .with_query([("sort", "patientId")])
            .send_empty()
            .await
            .expect_json::<Vec<Entity<Appointment>>>()
            .await;
        assert_eq!(vec![ids[1], ids[0], ids[2]], ids_of(&response));
    }

    #[tokio::test]
    async fn test_unknown_sort_property() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route("patients"))
            .with_query([("sort", "district_id")])
            .send_empty()
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("unknown property 'district_id'")
            .await;
    }

    #[tokio::test]
    async fn test_bad_paging_uses_defaults() {
        let context = TestContext::setup().await;

        let mut ids = vec![];
        for name in ["x", "y", "z"] {
            ids.push(context.insert(&Country::new(Some(name.to_owned()))).await);
        }

        for (name, value) in [("page", "-1"), ("page", "abc"), ("size", "abc"), ("size", "-5")] {
            let response = OneShotBuilder::new(context.app(), route("countries"))
                .with_query([(name, value)])
                .send_empty()
                .await
                .expect_header("x-total-count", "3")
                .expect_header(
                    "link",
                    "</api/countries?page=0&size=20>; rel=\"last\",\
                     </api/countries?page=0&size=20>; rel=\"first\"",
                )
                .expect_json::<Vec<Entity<Country>>>()
                .await;
            assert_eq!(ids, ids_of(&response));
        }
    }

    #[tokio::test]
    async fn test_misplaced_sort_direction() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route("countries"))
            .with_query([("sort", "desc,country")])
            .send_empty()
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Misplaced sort direction 'desc'")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("districts"));
}
