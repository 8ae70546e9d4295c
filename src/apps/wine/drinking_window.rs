use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

use super::WINE_PARENT;

text_enum! {
    pub enum WindowStatus { NotReady, Open, Past }
}

/// When a wine is expected to drink well.
#[derive(Debug, Clone, PartialEq)]
pub struct DrinkingWindow {
    pub drinking_window_id: Uuid,
    pub user_id: Uuid,
    pub wine_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DrinkingWindow {
    /// Both bounds are inclusive.
    pub fn status(&self, today: NaiveDate) -> WindowStatus {
        if today < self.start_date {
            WindowStatus::NotReady
        } else if today > self.end_date {
            WindowStatus::Past
        } else {
            WindowStatus::Open
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkingWindowCommand {
    pub user_id: Uuid,
    pub wine_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDrinkingWindowCommand {
    pub drinking_window_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_window(start: NaiveDate, end: NaiveDate, notes: Option<&str>) -> ValidationResult {
    Validator::new("DrinkingWindow")
        .check(start <= end, "end_date", "Must not be before start_date")
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateDrinkingWindowCommand {
    fn validate(&self) -> ValidationResult {
        validate_window(self.start_date, self.end_date, self.notes.as_deref())
    }
}

impl Validate for UpdateDrinkingWindowCommand {
    fn validate(&self) -> ValidationResult {
        validate_window(self.start_date, self.end_date, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrinkingWindowDto {
    pub drinking_window_id: Uuid,
    pub user_id: Uuid,
    pub wine_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: WindowStatus,
}

impl From<&DrinkingWindow> for DrinkingWindowDto {
    fn from(w: &DrinkingWindow) -> Self {
        DrinkingWindowDto {
            drinking_window_id: w.drinking_window_id,
            user_id: w.user_id,
            wine_id: w.wine_id,
            start_date: w.start_date,
            end_date: w.end_date,
            notes: w.notes.clone(),
            created_at: w.created_at,
            status: w.status(Utc::now().date_naive()),
        }
    }
}

impl Record for DrinkingWindow {
    const TABLE: &'static str = "drinking_windows";
    const KIND: &'static str = "drinking_window";
    const COLUMNS: &'static [&'static str] = &[
        "drinking_window_id",
        "user_id",
        "wine_id",
        "start_date",
        "end_date",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "start_date";
    const PARENT: Option<Parent> = Some(WINE_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.drinking_window_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.wine_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DrinkingWindow {
            drinking_window_id: row.get(0)?,
            user_id: row.get(1)?,
            wine_id: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.drinking_window_id),
            Box::new(self.user_id),
            Box::new(self.wine_id),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for DrinkingWindow {
    type Dto = DrinkingWindowDto;
    type Create = CreateDrinkingWindowCommand;
    type Update = UpdateDrinkingWindowCommand;

    fn from_create(cmd: CreateDrinkingWindowCommand) -> Self {
        DrinkingWindow {
            drinking_window_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            wine_id: cmd.wine_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateDrinkingWindowCommand) -> Uuid {
        cmd.drinking_window_id
    }

    fn apply_update(&mut self, cmd: UpdateDrinkingWindowCommand) {
        self.start_date = cmd.start_date;
        self.end_date = cmd.end_date;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> DrinkingWindowDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_bounds_are_inclusive() {
        let window = DrinkingWindow::from_create(CreateDrinkingWindowCommand {
            user_id: Uuid::nil(),
            wine_id: Uuid::nil(),
            start_date: date(2025, 1, 1),
            end_date: date(2035, 12, 31),
            notes: None,
        });

        assert_eq!(window.status(date(2024, 12, 31)), WindowStatus::NotReady);
        assert_eq!(window.status(date(2025, 1, 1)), WindowStatus::Open);
        assert_eq!(window.status(date(2035, 12, 31)), WindowStatus::Open);
        assert_eq!(window.status(date(2036, 1, 1)), WindowStatus::Past);
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let cmd = CreateDrinkingWindowCommand {
            user_id: Uuid::nil(),
            wine_id: Uuid::nil(),
            start_date: date(2030, 1, 1),
            end_date: date(2029, 1, 1),
            notes: None,
        };
        let errors = cmd.validate().unwrap_err();
        assert_eq!(errors[0].field, "end_date");
    }
}
