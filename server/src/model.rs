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

//! High-level data types.

use derive_getters::Getters;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identifier of a stored entity, assigned by the database.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub(crate) struct EntityId(i64);

impl EntityId {
    /// Creates a new identifier from its raw value.
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value of the identifier.
    pub(crate) fn as_i64(self) -> i64 {
        self.0
    }
}

/// Whether an entity has been stored or not.
///
/// In JSON, this is represented as an `id` property that is either `null` or an integer.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Option<EntityId>", into = "Option<EntityId>")]
pub(crate) enum Identity {
    /// The entity does not exist in the database yet.
    #[default]
    Unsaved,

    /// The entity was stored with the given identifier.
    Saved(EntityId),
}

impl From<Option<EntityId>> for Identity {
    fn from(id: Option<EntityId>) -> Self {
        match id {
            Some(id) => Identity::Saved(id),
            None => Identity::Unsaved,
        }
    }
}

impl From<Identity> for Option<EntityId> {
    fn from(identity: Identity) -> Self {
        match identity {
            Identity::Saved(id) => Some(id),
            Identity::Unsaved => None,
        }
    }
}

/// A record of type `F` together with its identity.
///
/// The identity and the fields are serialized as a single flat object.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub(crate) struct Entity<F> {
    /// Identity of the record.
    #[serde(default)]
    id: Identity,

    /// Contents of the record.
    #[serde(flatten)]
    fields: F,
}

impl<F> Entity<F> {
    /// Creates a record that has not been stored yet.
    #[cfg(test)]
    pub(crate) fn unsaved(fields: F) -> Self {
        Self { id: Identity::Unsaved, fields }
    }

    /// Creates a record that is stored with identifier `id`.
    pub(crate) fn saved(id: EntityId, fields: F) -> Self {
        Self { id: Identity::Saved(id), fields }
    }

    /// Returns the identifier of the record if it has been stored.
    pub(crate) fn saved_id(&self) -> Option<EntityId> {
        self.id.into()
    }

    /// Returns the contents of the record.
    #[cfg(test)]
    pub(crate) fn fields(&self) -> &F {
        &self.fields
    }

    /// Consumes the record and returns its identity and contents.
    pub(crate) fn into_parts(self) -> (Identity, F) {
        (self.id, self.fields)
    }
}

/// A country where patients live.
#[derive(Clone, Constructor, Debug, Default, Deserialize, Getters, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Country {
    /// Name of the country.
    country: Option<String>,
}

/// A state within a country.
#[derive(Clone, Constructor, Debug, Default, Deserialize, Getters, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct State {
    /// Name of the state.
    state: Option<String>,
}

/// A district within a state.
#[derive(Clone, Constructor, Debug, Default, Deserialize, Getters, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct District {
    /// Name of the district.
    district: Option<String>,
}

/// A person receiving care.
#[derive(Clone, Constructor, Debug, Default, Deserialize, Getters, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Patient {
    /// Full name.
    name: Option<String>,

    /// Age in years.
    age: Option<i32>,

    /// Contact phone number.
    phone: Option<String>,

    /// Postal address.
    address: Option<String>,

    /// District where the patient lives.
    district_id: Option<EntityId>,

    /// State where the patient lives.
    state_id: Option<EntityId>,

    /// Country where the patient lives.
    country_id: Option<EntityId>,
}

/// A scheduled visit of a patient.
#[derive(Clone, Constructor, Debug, Default, Deserialize, Getters, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Appointment {
    /// Date and time of the visit.
    #[serde(with = "time::serde::rfc3339::option")]
    date: Option<OffsetDateTime>,

    /// Reason for the visit.
    reason: Option<String>,

    /// Patient that will attend the visit.
    patient_id: Option<EntityId>,
}
