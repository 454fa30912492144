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

//! Business logic for the service.

use hospital_core::db::Db;
use hospital_core::env::get_optional_var;
use std::sync::Arc;

mod entities;
mod entity;
#[cfg(test)]
pub(crate) mod testutils;

/// Configuration options for the business logic.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverOptions {
    /// Number of entities to return in a page when the request does not ask for a size.
    pub default_page_size: u64,

    /// Maximum number of entities to return in a single page.
    pub max_page_size: u64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { default_page_size: 20, max_page_size: 2000 }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_DEFAULT_PAGE_SIZE` and `<prefix>_MAX_PAGE_SIZE`.
    /// Missing variables take their default values.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        let default_page_size = get_optional_var::<u64>(prefix, "DEFAULT_PAGE_SIZE")?
            .unwrap_or(defaults.default_page_size);
        let max_page_size =
            get_optional_var::<u64>(prefix, "MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size);
        if default_page_size == 0 || max_page_size == 0 {
            return Err("Page sizes must be positive".to_owned());
        }
        if default_page_size > max_page_size {
            return Err(format!(
                "Default page size {} cannot exceed the maximum page size {}",
                default_page_size, max_page_size
            ));
        }
        Ok(Self { default_page_size, max_page_size })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Configuration for the business logic.
    opts: DriverOptions,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub(crate) fn new(db: Arc<dyn Db + Send + Sync>, opts: DriverOptions) -> Self {
        Self { db, opts }
    }
}
