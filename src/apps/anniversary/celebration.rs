use chrono::NaiveDate;
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{join_list, list_at, LIST_DELIMITER};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

use super::IMPORTANT_DATE_PARENT;

text_enum! {
    pub enum CelebrationStatus { Planned, Completed, Cancelled }
}

fn default_status() -> CelebrationStatus {
    CelebrationStatus::Planned
}

/// How one occurrence of an important date was celebrated.
#[derive(Debug, Clone, PartialEq)]
pub struct Celebration {
    pub celebration_id: Uuid,
    pub important_date_id: Uuid,
    pub celebration_date: NaiveDate,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub attendees: Vec<String>,
    pub rating: Option<i32>,
    pub status: CelebrationStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCelebrationCommand {
    pub important_date_id: Uuid,
    pub celebration_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default = "default_status")]
    pub status: CelebrationStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCelebrationCommand {
    pub celebration_id: Uuid,
    pub celebration_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    pub status: CelebrationStatus,
}

fn no_delimiter(items: &[String]) -> bool {
    items.iter().all(|item| !item.contains(LIST_DELIMITER))
}

fn validate_fields(
    notes: Option<&str>,
    photos: &[String],
    attendees: &[String],
    rating: Option<i32>,
) -> ValidationResult {
    Validator::new("Celebration")
        .max_len_opt("notes", notes, 2000)
        .check(no_delimiter(photos), "photos", "Entries must not contain ','")
        .check(no_delimiter(attendees), "attendees", "Entries must not contain ','")
        .range_opt("rating", rating, 1, 5)
        .finish()
}

impl Validate for CreateCelebrationCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.notes.as_deref(), &self.photos, &self.attendees, self.rating)
    }
}

impl Validate for UpdateCelebrationCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.notes.as_deref(), &self.photos, &self.attendees, self.rating)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelebrationDto {
    pub celebration_id: Uuid,
    pub important_date_id: Uuid,
    pub celebration_date: NaiveDate,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub attendees: Vec<String>,
    pub rating: Option<i32>,
    pub status: CelebrationStatus,
}

impl From<&Celebration> for CelebrationDto {
    fn from(c: &Celebration) -> Self {
        CelebrationDto {
            celebration_id: c.celebration_id,
            important_date_id: c.important_date_id,
            celebration_date: c.celebration_date,
            notes: c.notes.clone(),
            photos: c.photos.clone(),
            attendees: c.attendees.clone(),
            rating: c.rating,
            status: c.status,
        }
    }
}

impl Record for Celebration {
    const TABLE: &'static str = "celebrations";
    const KIND: &'static str = "celebration";
    const COLUMNS: &'static [&'static str] = &[
        "celebration_id",
        "important_date_id",
        "celebration_date",
        "notes",
        "photos",
        "attendees",
        "rating",
        "status",
    ];
    const ORDER_BY: &'static str = "celebration_date DESC";
    const PARENT: Option<Parent> = Some(IMPORTANT_DATE_PARENT);

    fn id(&self) -> Uuid {
        self.celebration_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.important_date_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Celebration {
            celebration_id: row.get(0)?,
            important_date_id: row.get(1)?,
            celebration_date: row.get(2)?,
            notes: row.get(3)?,
            photos: list_at(row, 4)?,
            attendees: list_at(row, 5)?,
            rating: row.get(6)?,
            status: row.get(7)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.celebration_id),
            Box::new(self.important_date_id),
            Box::new(self.celebration_date),
            Box::new(self.notes.clone()),
            Box::new(join_list(&self.photos)),
            Box::new(join_list(&self.attendees)),
            Box::new(self.rating),
            Box::new(self.status),
        ]
    }
}

impl Resource for Celebration {
    type Dto = CelebrationDto;
    type Create = CreateCelebrationCommand;
    type Update = UpdateCelebrationCommand;

    fn from_create(cmd: CreateCelebrationCommand) -> Self {
        Celebration {
            celebration_id: Uuid::new_v4(),
            important_date_id: cmd.important_date_id,
            celebration_date: cmd.celebration_date,
            notes: cmd.notes,
            photos: cmd.photos,
            attendees: cmd.attendees,
            rating: cmd.rating,
            status: cmd.status,
        }
    }

    fn update_id(cmd: &UpdateCelebrationCommand) -> Uuid {
        cmd.celebration_id
    }

    fn apply_update(&mut self, cmd: UpdateCelebrationCommand) {
        self.celebration_date = cmd.celebration_date;
        self.notes = cmd.notes;
        self.photos = cmd.photos;
        self.attendees = cmd.attendees;
        self.rating = cmd.rating;
        self.status = cmd.status;
    }

    fn to_dto(&self) -> CelebrationDto {
        self.into()
    }
}
