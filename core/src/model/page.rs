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

//! Types to request and return pages of results.

use crate::model::{ModelError, ModelResult};

/// Direction in which to sort the values of a property.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    /// Smallest values first.
    #[default]
    Asc,

    /// Largest values first.
    Desc,
}

impl Direction {
    /// Parses a direction keyword, ignoring case.  Returns `None` if `s` is not a keyword.
    fn from_keyword(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }
}

/// A single sort order: the name of a property and the direction to sort it in.
///
/// The property name is not validated here because only the service knows which properties its
/// entities have.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sort {
    /// Name of the property to sort by, as exposed in the API.
    property: String,

    /// Direction of the sort.
    direction: Direction,
}

impl Sort {
    /// Creates a new sort order on `property`.
    pub fn new<S: Into<String>>(property: S, direction: Direction) -> Self {
        Self { property: property.into(), direction }
    }

    /// Returns the name of the property to sort by.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Returns the direction of the sort.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Parses the value of one `sort` query parameter.
///
/// The value is a comma-separated list of property names optionally followed by a direction
/// keyword, which then applies to all of the properties in the list: `id`, `id,desc` and
/// `name,age,asc` are all valid.
fn parse_sort(value: &str) -> ModelResult<Vec<Sort>> {
    let mut tokens = value.split(',').map(str::trim).filter(|t| !t.is_empty()).collect::<Vec<_>>();

    let mut direction = Direction::default();
    if tokens.len() > 1 {
        if let Some(d) = tokens.last().and_then(|t| Direction::from_keyword(t)) {
            direction = d;
            tokens.pop();
        }
    }

    let mut sorts = Vec::with_capacity(tokens.len());
    for token in tokens {
        if Direction::from_keyword(token).is_some() {
            return Err(ModelError(format!("Misplaced sort direction '{}' in '{}'", token, value)));
        }
        sorts.push(Sort::new(token, direction));
    }
    Ok(sorts)
}

/// Parses the numeric `value` of a paging parameter.
///
/// Negative and malformed values yield `None` so that callers fall back to their defaults.
fn parse_number(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

/// Request for a page of results.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PageRequest {
    /// Zero-based number of the page to return.
    page: u64,

    /// Number of items per page.  `None` lets the service choose.
    size: Option<u64>,

    /// Sort orders to apply, in order of precedence.
    sort: Vec<Sort>,
}

impl PageRequest {
    /// Creates a request for the zero-based `page` with `size` items per page and no sorting.
    pub fn new(page: u64, size: Option<u64>) -> Self {
        Self { page, size, sort: vec![] }
    }

    /// Adds a sort order to the request with lower precedence than any existing one.
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    /// Parses a page request from the raw `query` string of a request.
    ///
    /// Recognizes the `page`, `size` and `sort` parameters, the latter of which can be repeated.
    /// All other parameters are ignored.  A `page` that is not a non-negative number selects the
    /// first page, and a `size` that is not a non-negative number is treated as absent.
    pub fn parse(query: &str) -> ModelResult<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| ModelError(format!("Invalid query string: {}", e)))?;

        let mut request = PageRequest::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => request.page = parse_number(&value).unwrap_or(0),
                "size" => request.size = parse_number(&value),
                "sort" => request.sort.extend(parse_sort(&value)?),
                _ => (),
            }
        }
        Ok(request)
    }

    /// Returns the zero-based number of the requested page.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Returns the requested page size, if any.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns the requested sort orders.
    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }
}

/// A bounded and ordered subset of a collection plus metadata about the whole collection.
#[derive(Debug, PartialEq)]
pub struct Page<T> {
    /// Items in this page.
    items: Vec<T>,

    /// Total number of items in the collection.
    total: u64,

    /// Zero-based number of this page.
    number: u64,

    /// Maximum number of items per page.
    size: u64,
}

impl<T> Page<T> {
    /// Creates a new page with `items` that is the `number`th page of `size` items in a
    /// collection of `total` items.
    pub fn new(items: Vec<T>, total: u64, number: u64, size: u64) -> Self {
        Self { items, total, number, size }
    }

    /// Returns the items in this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page and returns its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Returns the total number of items in the collection.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns the zero-based number of this page.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the maximum number of items per page.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the number of pages needed to hold the whole collection.
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.size)
    }
}

/// Computes the number of pages of `size` items needed to hold `total` items.
pub(crate) fn total_pages(total: u64, size: u64) -> u64 {
    if size == 0 { 0 } else { total.div_ceil(size) }
}
