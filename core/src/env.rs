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

//! Utilities to read the service configuration from environment variables.
//!
//! Every variable is named `<prefix>_<suffix>` so that the same configuration structure can be
//! loaded for different purposes, such as `PGSQL_PROD` for the server and `PGSQL_TEST` for tests.

use std::env;

/// Result type for environment errors.
type Result<T> = std::result::Result<T, String>;

/// Wrapper around an environment variable's value to support conversions to other types.
pub struct Value(String);

impl TryFrom<Value> for String {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Ok(value.0)
    }
}

/// Generates a `TryFrom<Value>` for integer types, which are parsed with `FromStr`.
macro_rules! tryfrom_value_for_integer [
    ( $( $t:ty ),+ ) => {
        $(
            impl TryFrom<Value> for $t {
                type Error = String;

                fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
                    value.0.parse::<$t>().map_err(|e| format!("Invalid {}: {}", stringify!($t), e))
                }
            }
        )+
    }
];

tryfrom_value_for_integer!(u16, u32, u64);

/// Looks up the variable `<prefix>_<suffix>` and converts its value to `T` if present.
///
/// Returns the name of the variable along the result so that callers can build error messages.
fn lookup_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> (String, Result<Option<T>>) {
    let name = format!("{}_{}", prefix, suffix);
    let result = match env::var(&name) {
        Ok(value) => match Value(value).try_into() {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(format!("Invalid type in environment variable {}: {}", name, e)),
        },
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    };
    (name, result)
}

/// Gets a required environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
pub fn get_required_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<T> {
    let (name, result) = lookup_var(prefix, suffix);
    match result? {
        Some(value) => Ok(value),
        None => Err(format!("Required environment variable {} not present", name)),
    }
}

/// Gets an optional environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
///
/// A variable that is present but cannot be converted is an error, not a missing value.
pub fn get_optional_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<Option<T>> {
    lookup_var(prefix, suffix).1
}
