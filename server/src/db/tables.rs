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

//! Table descriptions of every entity.

use crate::db::{Column, Kind, Table, Value, Values};
use crate::model::{Appointment, Country, District, Patient, State};
use hospital_core::db::DbResult;

impl Table for Country {
    const NAME: &'static str = "country";

    const COLUMNS: &'static [Column] =
        &[Column { property: "country", name: "country", kind: Kind::Text }];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.country().clone())]
    }

    fn from_values(values: &mut Values) -> DbResult<Self> {
        Ok(Country::new(values.text()?))
    }
}

impl Table for State {
    const NAME: &'static str = "state";

    const COLUMNS: &'static [Column] =
        &[Column { property: "state", name: "state", kind: Kind::Text }];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.state().clone())]
    }

    fn from_values(values: &mut Values) -> DbResult<Self> {
        Ok(State::new(values.text()?))
    }
}

impl Table for District {
    const NAME: &'static str = "district";

    const COLUMNS: &'static [Column] =
        &[Column { property: "district", name: "district", kind: Kind::Text }];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.district().clone())]
    }

    fn from_values(values: &mut Values) -> DbResult<Self> {
        Ok(District::new(values.text()?))
    }
}

impl Table for Patient {
    const NAME: &'static str = "patient";

    const COLUMNS: &'static [Column] = &[
        Column { property: "name", name: "name", kind: Kind::Text },
        Column { property: "age", name: "age", kind: Kind::Int },
        Column { property: "phone", name: "phone", kind: Kind::Text },
        Column { property: "address", name: "address", kind: Kind::Text },
        Column { property: "districtId", name: "district_id", kind: Kind::Id },
        Column { property: "stateId", name: "state_id", kind: Kind::Id },
        Column { property: "countryId", name: "country_id", kind: Kind::Id },
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name().clone()),
            Value::Int(*self.age()),
            Value::Text(self.phone().clone()),
            Value::Text(self.address().clone()),
            Value::Id(*self.district_id()),
            Value::Id(*self.state_id()),
            Value::Id(*self.country_id()),
        ]
    }

    fn from_values(values: &mut Values) -> DbResult<Self> {
        Ok(Patient::new(
            values.text()?,
            values.int()?,
            values.text()?,
            values.text()?,
            values.id()?,
            values.id()?,
            values.id()?,
        ))
    }
}

impl Table for Appointment {
    const NAME: &'static str = "appointment";

    const COLUMNS: &'static [Column] = &[
        Column { property: "date", name: "date", kind: Kind::Timestamp },
        Column { property: "reason", name: "reason", kind: Kind::Text },
        Column { property: "patientId", name: "patient_id", kind: Kind::Id },
    ];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Timestamp(*self.date()),
            Value::Text(self.reason().clone()),
            Value::Id(*self.patient_id()),
        ]
    }

    fn from_values(values: &mut Values) -> DbResult<Self> {
        Ok(Appointment::new(values.timestamp()?, values.text()?, values.id()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use time::macros::datetime;

    /// Checks that the values of `fields` match the declared columns and convert back losslessly.
    fn check_mapping<T: Table + std::fmt::Debug + PartialEq>(fields: T) {
        let values = fields.to_values();
        assert_eq!(T::COLUMNS.len(), values.len());
        for (column, value) in T::COLUMNS.iter().zip(values.iter()) {
            let kind = match value {
                Value::Text(_) => Kind::Text,
                Value::Int(_) => Kind::Int,
                Value::Id(_) => Kind::Id,
                Value::Timestamp(_) => Kind::Timestamp,
            };
            assert_eq!(column.kind, kind, "Bad value for column {}", column.name);
        }
        assert_eq!(fields, T::from_values(&mut Values::new(values)).unwrap());
    }

    #[test]
    fn test_mappings() {
        check_mapping(Country::new(Some("India".to_owned())));
        check_mapping(State::new(None));
        check_mapping(District::new(Some("AAAAAAAAAA".to_owned())));
        check_mapping(Patient::new(
            Some("John".to_owned()),
            Some(51),
            None,
            Some("1 Main St".to_owned()),
            Some(EntityId::new(1)),
            None,
            Some(EntityId::new(3)),
        ));
        check_mapping(Appointment::new(
            Some(datetime!(2023-12-24 08:00:00 UTC)),
            Some("Fever".to_owned()),
            Some(EntityId::new(4)),
        ));
    }

    #[test]
    fn test_from_values_type_mismatch() {
        let mut values = Values::new(vec![Value::Int(Some(3))]);
        match Country::from_values(&mut values) {
            Err(hospital_core::db::DbError::DataIntegrityError(e)) => {
                assert!(e.contains("Expected Text"), "Unexpected message: {}", e)
            }
            r => panic!("Unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_from_values_missing() {
        let mut values = Values::new(vec![Value::Timestamp(None), Value::Text(None)]);
        Appointment::from_values(&mut values).unwrap_err();
    }
}
