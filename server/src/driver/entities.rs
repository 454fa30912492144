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

//! Operations on collections of entities.

use crate::db::{self, Order, Table};
use crate::driver::Driver;
use crate::model::*;
use hospital_core::driver::{DriverError, DriverResult};
use hospital_core::model::{Direction, Page, PageRequest, Sort};

/// Maps the requested `sort` properties of entities of type `T` to database orderings.
///
/// The result always ends with the identifier so that pages are stable.
fn resolve_orders<T: Table>(sort: &[Sort]) -> DriverResult<Vec<Order>> {
    let mut orders = Vec::with_capacity(sort.len() + 1);
    let mut has_id = false;
    for s in sort {
        let column = if s.property() == "id" {
            has_id = true;
            "id"
        } else {
            match T::COLUMNS.iter().find(|c| c.property == s.property()) {
                Some(column) => column.name,
                None => {
                    return Err(DriverError::InvalidInput(format!(
                        "Cannot sort {} by unknown property '{}'",
                        T::NAME,
                        s.property()
                    )));
                }
            }
        };
        orders.push(Order::new(column, s.direction()));
    }
    if !has_id {
        orders.push(Order::new("id", Direction::Asc));
    }
    Ok(orders)
}

impl Driver {
    /// Resolves the page size to use for a `requested` size.
    fn page_size(&self, requested: Option<u64>) -> u64 {
        match requested {
            None | Some(0) => self.opts.default_page_size,
            Some(size) => size.min(self.opts.max_page_size),
        }
    }

    /// Gets the page of entities of type `T` described by `request`.
    pub(crate) async fn list<T: Table>(
        self,
        request: &PageRequest,
    ) -> DriverResult<Page<Entity<T>>> {
        let size = self.page_size(request.size());
        let orders = resolve_orders::<T>(request.sort())?;
        let offset = match request.page().checked_mul(size) {
            Some(offset) if i64::try_from(offset).is_ok() => offset,
            _ => {
                return Err(DriverError::InvalidInput(format!(
                    "Page {} is out of range",
                    request.page()
                )));
            }
        };

        let mut tx = self.db.begin().await?;
        let total = db::count::<T>(tx.ex()).await?;
        let items = db::list::<T>(tx.ex(), &orders, size, offset).await?;
        tx.commit().await?;
        Ok(Page::new(items, total, request.page(), size))
    }
}
