use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::WINE_PARENT;

#[derive(Debug, Clone, PartialEq)]
pub struct TastingNote {
    pub tasting_note_id: Uuid,
    pub user_id: Uuid,
    pub wine_id: Uuid,
    pub tasting_date: DateTime<Utc>,
    /// 0-100 point scale
    pub rating: i32,
    pub appearance: Option<String>,
    pub aroma: Option<String>,
    pub taste: Option<String>,
    pub finish: Option<String>,
    pub overall_impression: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTastingNoteCommand {
    pub user_id: Uuid,
    pub wine_id: Uuid,
    #[serde(default)]
    pub tasting_date: Option<DateTime<Utc>>,
    pub rating: i32,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub aroma: Option<String>,
    #[serde(default)]
    pub taste: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub overall_impression: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTastingNoteCommand {
    pub tasting_note_id: Uuid,
    pub tasting_date: DateTime<Utc>,
    pub rating: i32,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub aroma: Option<String>,
    #[serde(default)]
    pub taste: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default)]
    pub overall_impression: Option<String>,
}

fn validate_note(
    rating: i32,
    appearance: Option<&str>,
    aroma: Option<&str>,
    taste: Option<&str>,
    finish: Option<&str>,
    overall: Option<&str>,
) -> ValidationResult {
    Validator::new("TastingNote")
        .range("rating", rating, 0, 100)
        .max_len_opt("appearance", appearance, 1000)
        .max_len_opt("aroma", aroma, 1000)
        .max_len_opt("taste", taste, 1000)
        .max_len_opt("finish", finish, 1000)
        .max_len_opt("overall_impression", overall, 1000)
        .finish()
}

impl Validate for CreateTastingNoteCommand {
    fn validate(&self) -> ValidationResult {
        validate_note(
            self.rating,
            self.appearance.as_deref(),
            self.aroma.as_deref(),
            self.taste.as_deref(),
            self.finish.as_deref(),
            self.overall_impression.as_deref(),
        )
    }
}

impl Validate for UpdateTastingNoteCommand {
    fn validate(&self) -> ValidationResult {
        validate_note(
            self.rating,
            self.appearance.as_deref(),
            self.aroma.as_deref(),
            self.taste.as_deref(),
            self.finish.as_deref(),
            self.overall_impression.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TastingNoteDto {
    pub tasting_note_id: Uuid,
    pub user_id: Uuid,
    pub wine_id: Uuid,
    pub tasting_date: DateTime<Utc>,
    pub rating: i32,
    pub appearance: Option<String>,
    pub aroma: Option<String>,
    pub taste: Option<String>,
    pub finish: Option<String>,
    pub overall_impression: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&TastingNote> for TastingNoteDto {
    fn from(n: &TastingNote) -> Self {
        TastingNoteDto {
            tasting_note_id: n.tasting_note_id,
            user_id: n.user_id,
            wine_id: n.wine_id,
            tasting_date: n.tasting_date,
            rating: n.rating,
            appearance: n.appearance.clone(),
            aroma: n.aroma.clone(),
            taste: n.taste.clone(),
            finish: n.finish.clone(),
            overall_impression: n.overall_impression.clone(),
            created_at: n.created_at,
        }
    }
}

impl Record for TastingNote {
    const TABLE: &'static str = "tasting_notes";
    const KIND: &'static str = "tasting_note";
    const COLUMNS: &'static [&'static str] = &[
        "tasting_note_id",
        "user_id",
        "wine_id",
        "tasting_date",
        "rating",
        "appearance",
        "aroma",
        "taste",
        "finish",
        "overall_impression",
        "created_at",
    ];
    const ORDER_BY: &'static str = "tasting_date DESC";
    const PARENT: Option<Parent> = Some(WINE_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.tasting_note_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.wine_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TastingNote {
            tasting_note_id: row.get(0)?,
            user_id: row.get(1)?,
            wine_id: row.get(2)?,
            tasting_date: row.get(3)?,
            rating: row.get(4)?,
            appearance: row.get(5)?,
            aroma: row.get(6)?,
            taste: row.get(7)?,
            finish: row.get(8)?,
            overall_impression: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.tasting_note_id),
            Box::new(self.user_id),
            Box::new(self.wine_id),
            Box::new(self.tasting_date),
            Box::new(self.rating),
            Box::new(self.appearance.clone()),
            Box::new(self.aroma.clone()),
            Box::new(self.taste.clone()),
            Box::new(self.finish.clone()),
            Box::new(self.overall_impression.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for TastingNote {
    type Dto = TastingNoteDto;
    type Create = CreateTastingNoteCommand;
    type Update = UpdateTastingNoteCommand;

    fn from_create(cmd: CreateTastingNoteCommand) -> Self {
        let now = Utc::now();
        TastingNote {
            tasting_note_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            wine_id: cmd.wine_id,
            tasting_date: cmd.tasting_date.unwrap_or(now),
            rating: cmd.rating,
            appearance: cmd.appearance,
            aroma: cmd.aroma,
            taste: cmd.taste,
            finish: cmd.finish,
            overall_impression: cmd.overall_impression,
            created_at: now,
        }
    }

    fn update_id(cmd: &UpdateTastingNoteCommand) -> Uuid {
        cmd.tasting_note_id
    }

    fn apply_update(&mut self, cmd: UpdateTastingNoteCommand) {
        self.tasting_date = cmd.tasting_date;
        self.rating = cmd.rating;
        self.appearance = cmd.appearance;
        self.aroma = cmd.aroma;
        self.taste = cmd.taste;
        self.finish = cmd.finish;
        self.overall_impression = cmd.overall_impression;
    }

    fn to_dto(&self) -> TastingNoteDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(rating: i32) -> CreateTastingNoteCommand {
        CreateTastingNoteCommand {
            user_id: Uuid::nil(),
            wine_id: Uuid::nil(),
            tasting_date: None,
            rating,
            appearance: Some("Deep ruby".to_string()),
            aroma: None,
            taste: None,
            finish: Some("Long".to_string()),
            overall_impression: None,
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(note(0).validate().is_ok());
        assert!(note(100).validate().is_ok());
        assert!(note(101).validate().is_err());
        assert!(note(-1).validate().is_err());
    }

    #[test]
    fn test_tasting_date_defaults_to_now() {
        let before = Utc::now();
        let n = TastingNote::from_create(note(94));
        assert!(n.tasting_date >= before);
        assert_eq!(n.tasting_date, n.created_at);
    }
}
