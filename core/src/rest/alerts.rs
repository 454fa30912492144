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

//! Headers that notify clients about the outcome of entity operations.
//!
//! Clients that render notifications look for `X-<app>-alert` (a message key to localize),
//! `X-<app>-error` (a failure key) and `X-<app>-params` (the argument to the message).

use crate::rest::RestResult;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;

/// Builder of alert headers for a given application.
#[derive(Clone, Copy, Debug)]
pub struct Alerts {
    /// Name of the application, used both in header names and message keys.
    app: &'static str,
}

impl Alerts {
    /// Creates a new builder for the application named `app`.
    pub const fn new(app: &'static str) -> Self {
        Self { app }
    }

    /// Computes the name of the header with the given `suffix`.
    fn header_name(app: &str, suffix: &str) -> RestResult<HeaderName> {
        Ok(HeaderName::try_from(format!("x-{}-{}", app, suffix).to_ascii_lowercase())?)
    }

    /// Builds the headers for an `action` on the `entity` identified by `param`.
    fn alert(&self, entity: &str, action: &str, param: &dyn fmt::Display) -> RestResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            Self::header_name(self.app, "alert")?,
            HeaderValue::try_from(format!("{}.{}.{}", self.app, entity, action))?,
        );
        headers.insert(
            Self::header_name(self.app, "params")?,
            HeaderValue::try_from(param.to_string())?,
        );
        Ok(headers)
    }

    /// Builds the headers that announce the creation of `entity` with identifier `param`.
    pub fn created<P: fmt::Display>(&self, entity: &str, param: P) -> RestResult<HeaderMap> {
        self.alert(entity, "created", &param)
    }

    /// Builds the headers that announce the update of `entity` with identifier `param`.
    pub fn updated<P: fmt::Display>(&self, entity: &str, param: P) -> RestResult<HeaderMap> {
        self.alert(entity, "updated", &param)
    }

    /// Builds the headers that announce the deletion of `entity` with identifier `param`.
    pub fn deleted<P: fmt::Display>(&self, entity: &str, param: P) -> RestResult<HeaderMap> {
        self.alert(entity, "deleted", &param)
    }

    /// Describes a failure identified by `key` while processing `entity`.
    pub fn failure(&self, entity: &'static str, key: &'static str) -> FailureAlert {
        FailureAlert { app: self.app, entity, key }
    }
}

/// Description of a failed operation on an entity, carried by errors until they become responses.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureAlert {
    /// Name of the application.
    app: &'static str,

    /// Name of the entity that was being processed.
    entity: &'static str,

    /// Key that identifies the failure.
    key: &'static str,
}

impl FailureAlert {
    /// Returns the key that identifies the failure.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Builds the headers that describe this failure.
    pub fn headers(&self) -> RestResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            Alerts::header_name(self.app, "error")?,
            HeaderValue::try_from(format!("error.{}", self.key))?,
        );
        headers.insert(
            Alerts::header_name(self.app, "params")?,
            HeaderValue::try_from(self.entity)?,
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERTS: Alerts = Alerts::new("hospitalManagementApp");

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
        headers.get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_created() {
        let headers = ALERTS.created("district", 12).unwrap();
        assert_eq!(2, headers.len());
        assert_eq!(
            "hospitalManagementApp.district.created",
            header(&headers, "X-hospitalManagementApp-alert")
        );
        assert_eq!("12", header(&headers, "X-hospitalManagementApp-params"));
    }

    #[test]
    fn test_updated() {
        let headers = ALERTS.updated("patient", 3).unwrap();
        assert_eq!(
            "hospitalManagementApp.patient.updated",
            header(&headers, "x-hospitalmanagementapp-alert")
        );
        assert_eq!("3", header(&headers, "x-hospitalmanagementapp-params"));
    }

    #[test]
    fn test_deleted() {
        let headers = ALERTS.deleted("appointment", 9223372036854775807i64).unwrap();
        assert_eq!(
            "hospitalManagementApp.appointment.deleted",
            header(&headers, "X-hospitalManagementApp-alert")
        );
        assert_eq!("9223372036854775807", header(&headers, "X-hospitalManagementApp-params"));
    }

    #[test]
    fn test_failure() {
        let alert = ALERTS.failure("country", "idexists");
        assert_eq!("idexists", alert.key());

        let headers = alert.headers().unwrap();
        assert_eq!(2, headers.len());
        assert_eq!("error.idexists", header(&headers, "X-hospitalManagementApp-error"));
        assert_eq!("country", header(&headers, "X-hospitalManagementApp-params"));
    }

    #[test]
    fn test_bad_app_name() {
        let alerts = Alerts::new("bad app");
        alerts.created("thing", 1).unwrap_err();
    }
}
