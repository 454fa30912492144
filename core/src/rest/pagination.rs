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

//! Headers that describe where a page sits within a collection.

use crate::model::total_pages;
use crate::rest::RestResult;
use axum::http::header::LINK;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Formats the URI of the page `number` of `size` items in the collection at `base`.
fn page_uri(base: &str, number: u64, size: u64) -> String {
    format!("<{}?page={}&size={}>", base, number, size)
}

/// Builds the `X-Total-Count` and `Link` headers for the page `number` of `size` items within a
/// collection of `total` items served at `base`.
///
/// The `Link` header always contains the `last` and `first` relations, and contains `next` and
/// `prev` only when such pages exist.
pub fn pagination_headers(base: &str, total: u64, number: u64, size: u64) -> RestResult<HeaderMap> {
    let pages = total_pages(total, size);

    let mut link = String::new();
    if number.saturating_add(1) < pages {
        link.push_str(&format!("{}; rel=\"next\",", page_uri(base, number + 1, size)));
    }
    if number > 0 {
        link.push_str(&format!("{}; rel=\"prev\",", page_uri(base, number - 1, size)));
    }
    let last = pages.saturating_sub(1);
    link.push_str(&format!("{}; rel=\"last\",", page_uri(base, last, size)));
    link.push_str(&format!("{}; rel=\"first\"", page_uri(base, 0, size)));

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("x-total-count"), HeaderValue::from(total));
    headers.insert(LINK, HeaderValue::try_from(link)?);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(headers: &HeaderMap) -> &str {
        headers.get(LINK).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_middle_page() {
        let headers = pagination_headers("/api/districts", 45, 1, 20).unwrap();
        assert_eq!("45", headers.get("X-Total-Count").unwrap());
        assert_eq!(
            "</api/districts?page=2&size=20>; rel=\"next\",\
            </api/districts?page=0&size=20>; rel=\"prev\",\
            </api/districts?page=2&size=20>; rel=\"last\",\
            </api/districts?page=0&size=20>; rel=\"first\"",
            link(&headers)
        );
    }

    #[test]
    fn test_first_page() {
        let headers = pagination_headers("/api/states", 3, 0, 2).unwrap();
        assert_eq!("3", headers.get("X-Total-Count").unwrap());
        assert_eq!(
            "</api/states?page=1&size=2>; rel=\"next\",\
            </api/states?page=1&size=2>; rel=\"last\",\
            </api/states?page=0&size=2>; rel=\"first\"",
            link(&headers)
        );
    }

    #[test]
    fn test_last_page() {
        let headers = pagination_headers("/api/states", 3, 1, 2).unwrap();
        assert_eq!(
            "</api/states?page=0&size=2>; rel=\"prev\",\
            </api/states?page=1&size=2>; rel=\"last\",\
            </api/states?page=0&size=2>; rel=\"first\"",
            link(&headers)
        );
    }

    #[test]
    fn test_empty_collection() {
        let headers = pagination_headers("/api/countries", 0, 0, 20).unwrap();
        assert_eq!("0", headers.get("X-Total-Count").unwrap());
        assert_eq!(
            "</api/countries?page=0&size=20>; rel=\"last\",\
            </api/countries?page=0&size=20>; rel=\"first\"",
            link(&headers)
        );
    }

    #[test]
    fn test_page_past_the_end() {
        let headers = pagination_headers("/api/countries", 5, 7, 5).unwrap();
        assert_eq!(
            "</api/countries?page=6&size=5>; rel=\"prev\",\
            </api/countries?page=0&size=5>; rel=\"last\",\
            </api/countries?page=0&size=5>; rel=\"first\"",
            link(&headers)
        );
    }
}
