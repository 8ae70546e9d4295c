use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_opt_at, decimal_opt_param, decimal_param};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

use super::VEHICLE_PARENT;

text_enum! {
    pub enum TripType { Business, Personal }
}

fn default_trip_type() -> TripType {
    TripType::Personal
}

/// One logged drive, open until its end odometer is recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_odometer: Decimal,
    pub end_odometer: Option<Decimal>,
    pub trip_type: TripType,
    pub purpose: Option<String>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Miles driven; `None` while the trip is still open.
    pub fn distance(&self) -> Option<Decimal> {
        self.end_odometer?.checked_sub(self.start_odometer)
    }

    pub fn is_complete(&self) -> bool {
        self.end_odometer.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripCommand {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub start_odometer: Decimal,
    #[serde(default)]
    pub end_odometer: Option<Decimal>,
    #[serde(default = "default_trip_type")]
    pub trip_type: TripType,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub start_location: Option<String>,
    #[serde(default)]
    pub end_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTripCommand {
    pub trip_id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub start_odometer: Decimal,
    #[serde(default)]
    pub end_odometer: Option<Decimal>,
    pub trip_type: TripType,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub start_location: Option<String>,
    #[serde(default)]
    pub end_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct TripFields<'a> {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    start_odometer: Decimal,
    end_odometer: Option<Decimal>,
    purpose: Option<&'a str>,
    start_location: Option<&'a str>,
    end_location: Option<&'a str>,
    notes: Option<&'a str>,
}

impl TripFields<'_> {
    fn validate(&self) -> ValidationResult {
        let dates_ordered = self.end_date.map_or(true, |end| end >= self.start_date);
        let odometer_ordered = self.end_odometer.map_or(true, |end| end >= self.start_odometer);

        Validator::new("Trip")
            .amount("start_odometer", self.start_odometer)
            .amount_opt("end_odometer", self.end_odometer)
            .check(odometer_ordered, "end_odometer", "Must not be below start_odometer")
            .check(dates_ordered, "end_date", "Must not be before start_date")
            .max_len_opt("purpose", self.purpose, 200)
            .max_len_opt("start_location", self.start_location, 200)
            .max_len_opt("end_location", self.end_location, 200)
            .max_len_opt("notes", self.notes, 500)
            .finish()
    }
}

impl Validate for CreateTripCommand {
    fn validate(&self) -> ValidationResult {
        TripFields {
            start_date: self.start_date,
            end_date: self.end_date,
            start_odometer: self.start_odometer,
            end_odometer: self.end_odometer,
            purpose: self.purpose.as_deref(),
            start_location: self.start_location.as_deref(),
            end_location: self.end_location.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateTripCommand {
    fn validate(&self) -> ValidationResult {
        TripFields {
            start_date: self.start_date,
            end_date: self.end_date,
            start_odometer: self.start_odometer,
            end_odometer: self.end_odometer,
            purpose: self.purpose.as_deref(),
            start_location: self.start_location.as_deref(),
            end_location: self.end_location.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDto {
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_odometer: Decimal,
    pub end_odometer: Option<Decimal>,
    pub trip_type: TripType,
    pub purpose: Option<String>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub distance: Option<Decimal>,
}

impl From<&Trip> for TripDto {
    fn from(t: &Trip) -> Self {
        TripDto {
            trip_id: t.trip_id,
            vehicle_id: t.vehicle_id,
            user_id: t.user_id,
            start_date: t.start_date,
            end_date: t.end_date,
            start_odometer: t.start_odometer,
            end_odometer: t.end_odometer,
            trip_type: t.trip_type,
            purpose: t.purpose.clone(),
            start_location: t.start_location.clone(),
            end_location: t.end_location.clone(),
            notes: t.notes.clone(),
            created_at: t.created_at,
            distance: t.distance(),
        }
    }
}

impl Record for Trip {
    const TABLE: &'static str = "trips";
    const KIND: &'static str = "trip";
    const COLUMNS: &'static [&'static str] = &[
        "trip_id",
        "vehicle_id",
        "user_id",
        "start_date",
        "end_date",
        "start_odometer",
        "end_odometer",
        "trip_type",
        "purpose",
        "start_location",
        "end_location",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "start_date DESC";
    const PARENT: Option<Parent> = Some(VEHICLE_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.trip_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.vehicle_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Trip {
            trip_id: row.get(0)?,
            vehicle_id: row.get(1)?,
            user_id: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            start_odometer: decimal_at(row, 5)?,
            end_odometer: decimal_opt_at(row, 6)?,
            trip_type: row.get(7)?,
            purpose: row.get(8)?,
            start_location: row.get(9)?,
            end_location: row.get(10)?,
            notes: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.trip_id),
            Box::new(self.vehicle_id),
            Box::new(self.user_id),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(decimal_param(self.start_odometer)),
            Box::new(decimal_opt_param(self.end_odometer)),
            Box::new(self.trip_type),
            Box::new(self.purpose.clone()),
            Box::new(self.start_location.clone()),
            Box::new(self.end_location.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Trip {
    type Dto = TripDto;
    type Create = CreateTripCommand;
    type Update = UpdateTripCommand;

    fn from_create(cmd: CreateTripCommand) -> Self {
        Trip {
            trip_id: Uuid::new_v4(),
            vehicle_id: cmd.vehicle_id,
            user_id: cmd.user_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            start_odometer: cmd.start_odometer,
            end_odometer: cmd.end_odometer,
            trip_type: cmd.trip_type,
            purpose: cmd.purpose,
            start_location: cmd.start_location,
            end_location: cmd.end_location,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateTripCommand) -> Uuid {
        cmd.trip_id
    }

    fn apply_update(&mut self, cmd: UpdateTripCommand) {
        self.start_date = cmd.start_date;
        self.end_date = cmd.end_date;
        self.start_odometer = cmd.start_odometer;
        self.end_odometer = cmd.end_odometer;
        self.trip_type = cmd.trip_type;
        self.purpose = cmd.purpose;
        self.start_location = cmd.start_location;
        self.end_location = cmd.end_location;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> TripDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client_meeting() -> CreateTripCommand {
        CreateTripCommand {
            vehicle_id: Uuid::nil(),
            user_id: Uuid::nil(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 10),
            start_odometer: dec!(25350),
            end_odometer: Some(dec!(25720)),
            trip_type: TripType::Business,
            purpose: Some("Client meeting in another city".to_string()),
            start_location: None,
            end_location: None,
            notes: Some("Highway driving, good weather".to_string()),
        }
    }

    #[test]
    fn test_distance() {
        let trip = Trip::from_create(client_meeting());
        assert_eq!(trip.distance(), Some(dec!(370)));
        assert!(trip.is_complete());

        let mut open = client_meeting();
        open.end_odometer = None;
        open.end_date = None;
        let open = Trip::from_create(open);
        assert_eq!(open.distance(), None);
        assert!(!open.is_complete());
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut cmd = client_meeting();
        cmd.end_odometer = Some(dec!(25000));
        cmd.end_date = NaiveDate::from_ymd_opt(2024, 5, 1);

        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["end_odometer", "end_date"]);
    }

    #[test]
    fn test_trip_type_defaults_to_personal() {
        let json = serde_json::json!({
            "vehicle_id": Uuid::nil(),
            "user_id": Uuid::nil(),
            "start_date": "2024-05-18",
            "start_odometer": "25720"
        });
        let cmd: CreateTripCommand = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.trip_type, TripType::Personal);
        assert!(cmd.validate().is_ok());
    }
}
