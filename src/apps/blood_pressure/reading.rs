use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handler::Resource;
use crate::store::Record;
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

text_enum! {
    /// American Heart Association blood pressure categories
    pub enum BloodPressureCategory {
        Normal,
        Elevated,
        HypertensionStage1,
        HypertensionStage2,
        HypertensiveCrisis,
    }
}

impl BloodPressureCategory {
    /// The highest category either number falls into.
    pub fn classify(systolic: i32, diastolic: i32) -> Self {
        if systolic > 180 || diastolic > 120 {
            BloodPressureCategory::HypertensiveCrisis
        } else if systolic >= 140 || diastolic >= 90 {
            BloodPressureCategory::HypertensionStage2
        } else if systolic >= 130 || diastolic >= 80 {
            BloodPressureCategory::HypertensionStage1
        } else if systolic >= 120 {
            BloodPressureCategory::Elevated
        } else {
            BloodPressureCategory::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub reading_id: Uuid,
    pub user_id: Uuid,
    pub systolic: i32,
    pub diastolic: i32,
    pub pulse: Option<i32>,
    pub category: BloodPressureCategory,
    pub measured_at: DateTime<Utc>,
    pub position: Option<String>,
    pub arm: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reading {
    pub fn is_critical(&self) -> bool {
        self.category == BloodPressureCategory::HypertensiveCrisis
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReadingCommand {
    pub user_id: Uuid,
    pub systolic: i32,
    pub diastolic: i32,
    #[serde(default)]
    pub pulse: Option<i32>,
    pub measured_at: DateTime<Utc>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub arm: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReadingCommand {
    pub reading_id: Uuid,
    pub systolic: i32,
    pub diastolic: i32,
    #[serde(default)]
    pub pulse: Option<i32>,
    pub measured_at: DateTime<Utc>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub arm: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct ReadingFields<'a> {
    systolic: i32,
    diastolic: i32,
    pulse: Option<i32>,
    position: Option<&'a str>,
    arm: Option<&'a str>,
    notes: Option<&'a str>,
}

impl ReadingFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("Reading")
            .range("systolic", self.systolic, 40, 300)
            .range("diastolic", self.diastolic, 20, 200)
            .range_opt("pulse", self.pulse, 20, 250)
            .max_len_opt("position", self.position, 50)
            .max_len_opt("arm", self.arm, 20)
            .max_len_opt("notes", self.notes, 500)
            .finish()
    }
}

impl Validate for CreateReadingCommand {
    fn validate(&self) -> ValidationResult {
        ReadingFields {
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
            position: self.position.as_deref(),
            arm: self.arm.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateReadingCommand {
    fn validate(&self) -> ValidationResult {
        ReadingFields {
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
            position: self.position.as_deref(),
            arm: self.arm.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDto {
    pub reading_id: Uuid,
    pub user_id: Uuid,
    pub systolic: i32,
    pub diastolic: i32,
    pub pulse: Option<i32>,
    pub category: BloodPressureCategory,
    pub measured_at: DateTime<Utc>,
    pub position: Option<String>,
    pub arm: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_critical: bool,
}

impl From<&Reading> for ReadingDto {
    fn from(r: &Reading) -> Self {
        ReadingDto {
            reading_id: r.reading_id,
            user_id: r.user_id,
            systolic: r.systolic,
            diastolic: r.diastolic,
            pulse: r.pulse,
            category: r.category,
            measured_at: r.measured_at,
            position: r.position.clone(),
            arm: r.arm.clone(),
            notes: r.notes.clone(),
            created_at: r.created_at,
            is_critical: r.is_critical(),
        }
    }
}

impl Record for Reading {
    const TABLE: &'static str = "readings";
    const KIND: &'static str = "reading";
    const COLUMNS: &'static [&'static str] = &[
        "reading_id",
        "user_id",
        "systolic",
        "diastolic",
        "pulse",
        "category",
        "measured_at",
        "position",
        "arm",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "measured_at DESC";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.reading_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Reading {
            reading_id: row.get(0)?,
            user_id: row.get(1)?,
            systolic: row.get(2)?,
            diastolic: row.get(3)?,
            pulse: row.get(4)?,
            category: row.get(5)?,
            measured_at: row.get(6)?,
            position: row.get(7)?,
            arm: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.reading_id),
            Box::new(self.user_id),
            Box::new(self.systolic),
            Box::new(self.diastolic),
            Box::new(self.pulse),
            Box::new(self.category),
            Box::new(self.measured_at),
            Box::new(self.position.clone()),
            Box::new(self.arm.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Reading {
    type Dto = ReadingDto;
    type Create = CreateReadingCommand;
    type Update = UpdateReadingCommand;

    const CREATED_TOPIC: Option<&'static str> = Some("reading.created");

    fn from_create(cmd: CreateReadingCommand) -> Self {
        Reading {
            reading_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            systolic: cmd.systolic,
            diastolic: cmd.diastolic,
            pulse: cmd.pulse,
            category: BloodPressureCategory::classify(cmd.systolic, cmd.diastolic),
            measured_at: cmd.measured_at,
            position: cmd.position,
            arm: cmd.arm,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateReadingCommand) -> Uuid {
        cmd.reading_id
    }

    fn apply_update(&mut self, cmd: UpdateReadingCommand) {
        self.systolic = cmd.systolic;
        self.diastolic = cmd.diastolic;
        self.pulse = cmd.pulse;
        self.measured_at = cmd.measured_at;
        self.position = cmd.position;
        self.arm = cmd.arm;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> ReadingDto {
        self.into()
    }

    fn before_save(&mut self, _conn: &Connection) -> AppResult<()> {
        self.category = BloodPressureCategory::classify(self.systolic, self.diastolic);
        Ok(())
    }
}
