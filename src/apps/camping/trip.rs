use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handler::Resource;
use crate::store::{self, ListFilter, Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::{average_rating, Campsite, GearChecklist, Review, CAMPSITE_PARENT};

/// A planned stay at one campsite
#[derive(Debug, Clone, PartialEq)]
pub struct CampingTrip {
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_people: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CampingTrip {
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Nightly rate times nights; `None` for a free site or on overflow.
    pub fn estimated_cost(&self, cost_per_night: Option<Decimal>) -> Option<Decimal> {
        cost_per_night?.checked_mul(Decimal::from(self.nights()))
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_date > today
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampingTripCommand {
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_people: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCampingTripCommand {
    pub trip_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_people: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_people: i32,
    notes: Option<&str>,
) -> ValidationResult {
    Validator::new("CampingTrip")
        .required("name", name)
        .max_len("name", name, 200)
        .check(start_date <= end_date, "end_date", "Must not be before start_date")
        .range("number_of_people", number_of_people, 1, 100)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateCampingTripCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.start_date,
            self.end_date,
            self.number_of_people,
            self.notes.as_deref(),
        )
    }
}

impl Validate for UpdateCampingTripCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.start_date,
            self.end_date,
            self.number_of_people,
            self.notes.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampingTripDto {
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_people: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub nights: i64,
}

impl From<&CampingTrip> for CampingTripDto {
    fn from(t: &CampingTrip) -> Self {
        CampingTripDto {
            trip_id: t.trip_id,
            user_id: t.user_id,
            campsite_id: t.campsite_id,
            name: t.name.clone(),
            start_date: t.start_date,
            end_date: t.end_date,
            number_of_people: t.number_of_people,
            notes: t.notes.clone(),
            created_at: t.created_at,
            nights: t.nights(),
        }
    }
}

impl Record for CampingTrip {
    const TABLE: &'static str = "camping_trips";
    const KIND: &'static str = "camping_trip";
    const COLUMNS: &'static [&'static str] = &[
        "trip_id",
        "user_id",
        "campsite_id",
        "name",
        "start_date",
        "end_date",
        "number_of_people",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "start_date";
    const PARENT: Option<Parent> = Some(CAMPSITE_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.trip_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.campsite_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CampingTrip {
            trip_id: row.get(0)?,
            user_id: row.get(1)?,
            campsite_id: row.get(2)?,
            name: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            number_of_people: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.trip_id),
            Box::new(self.user_id),
            Box::new(self.campsite_id),
            Box::new(self.name.clone()),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(self.number_of_people),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for CampingTrip {
    type Dto = CampingTripDto;
    type Create = CreateCampingTripCommand;
    type Update = UpdateCampingTripCommand;

    fn from_create(cmd: CreateCampingTripCommand) -> Self {
        CampingTrip {
            trip_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            campsite_id: cmd.campsite_id,
            name: cmd.name,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            number_of_people: cmd.number_of_people,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateCampingTripCommand) -> Uuid {
        cmd.trip_id
    }

    fn apply_update(&mut self, cmd: UpdateCampingTripCommand) {
        self.name = cmd.name;
        self.start_date = cmd.start_date;
        self.end_date = cmd.end_date;
        self.number_of_people = cmd.number_of_people;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> CampingTripDto {
        self.into()
    }
}

// ============================================================================
// TRIP PLAN
// ============================================================================

/// A trip with its campsite, cost estimate, and packing progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub trip: CampingTripDto,
    pub campsite_name: String,
    pub campsite_rating: Option<Decimal>,
    pub is_upcoming: bool,
    pub estimated_cost: Option<Decimal>,
    pub total_items: usize,
    pub packed_items: usize,
    /// Percent of checklist items packed, 0 when the list is empty
    pub packing_progress: Decimal,
}

pub fn packing_progress(items: &[GearChecklist]) -> Decimal {
    if items.is_empty() {
        return Decimal::ZERO;
    }
    let packed = items.iter().filter(|i| i.is_packed).count();
    (Decimal::from(packed) * Decimal::ONE_HUNDRED / Decimal::from(items.len())).round_dp(2)
}

/// `Ok(None)` when the trip does not exist.
pub fn trip_plan(conn: &Connection, trip_id: Uuid, today: NaiveDate) -> AppResult<Option<TripPlan>> {
    let Some(trip) = store::find::<CampingTrip>(conn, trip_id)? else {
        return Ok(None);
    };
    let campsite = store::find::<Campsite>(conn, trip.campsite_id)?.ok_or(AppError::NotFound {
        kind: "campsite",
        id: trip.campsite_id,
    })?;

    let items = store::list_by::<GearChecklist>(
        conn,
        &ListFilter {
            user_id: None,
            parent_id: Some(trip_id),
        },
    )?;
    let reviews = store::list_by::<Review>(
        conn,
        &ListFilter {
            user_id: None,
            parent_id: Some(campsite.campsite_id),
        },
    )?;

    let estimated_cost = match campsite.cost_per_night {
        Some(rate) => Some(
            trip.estimated_cost(Some(rate))
                .ok_or_else(|| AppError::out_of_range("CampingTrip", "estimated_cost"))?,
        ),
        None => None,
    };

    Ok(Some(TripPlan {
        trip: trip.to_dto(),
        campsite_name: campsite.name,
        campsite_rating: average_rating(&reviews),
        is_upcoming: trip.is_upcoming(today),
        estimated_cost,
        total_items: items.len(),
        packed_items: items.iter().filter(|i| i.is_packed).count(),
        packing_progress: packing_progress(&items),
    }))
}
