use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handler::Resource;
use crate::store::{self, ListFilter, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

text_enum! {
    pub enum DateType { Birthday, Anniversary, Custom }
}

text_enum! {
    pub enum RecurrencePattern { Annual, OneTime }
}

fn default_recurrence() -> RecurrencePattern {
    RecurrencePattern::Annual
}

/// A birthday, anniversary, or other date worth remembering.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportantDate {
    pub important_date_id: Uuid,
    pub user_id: Uuid,
    pub person_name: String,
    pub date_type: DateType,
    pub date_value: NaiveDate,
    pub recurrence_pattern: RecurrencePattern,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ImportantDate {
    /// The date as it falls in `year`. Feb 29 falls on Feb 28 outside leap years.
    fn in_year(&self, year: i32) -> Option<NaiveDate> {
        let (month, day) = (self.date_value.month(), self.date_value.day());
        NaiveDate::from_ymd_opt(year, month, day).or_else(|| NaiveDate::from_ymd_opt(year, month, 28))
    }

    /// First occurrence on or after `today`; `None` for a one-time date already past.
    pub fn next_occurrence(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.recurrence_pattern {
            RecurrencePattern::OneTime => (self.date_value >= today).then_some(self.date_value),
            RecurrencePattern::Annual => {
                if self.date_value >= today {
                    return Some(self.date_value);
                }
                let this_year = self.in_year(today.year())?;
                if this_year >= today {
                    Some(this_year)
                } else {
                    self.in_year(today.year() + 1)
                }
            }
        }
    }

    pub fn days_until(&self, today: NaiveDate) -> Option<i64> {
        self.next_occurrence(today).map(|next| (next - today).num_days())
    }

    /// Age or anniversary number reached on the next occurrence
    pub fn years_on_next(&self, today: NaiveDate) -> Option<i32> {
        self.next_occurrence(today)
            .map(|next| next.year() - self.date_value.year())
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateImportantDateCommand {
    pub user_id: Uuid,
    pub person_name: String,
    pub date_type: DateType,
    pub date_value: NaiveDate,
    #[serde(default = "default_recurrence")]
    pub recurrence_pattern: RecurrencePattern,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateImportantDateCommand {
    pub important_date_id: Uuid,
    pub person_name: String,
    pub date_type: DateType,
    pub date_value: NaiveDate,
    pub recurrence_pattern: RecurrencePattern,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub is_active: bool,
}

fn validate_fields(person_name: &str, relationship: Option<&str>, notes: Option<&str>) -> ValidationResult {
    Validator::new("ImportantDate")
        .required("person_name", person_name)
        .max_len("person_name", person_name, 200)
        .max_len_opt("relationship", relationship, 100)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateImportantDateCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.person_name, self.relationship.as_deref(), self.notes.as_deref())
    }
}

impl Validate for UpdateImportantDateCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.person_name, self.relationship.as_deref(), self.notes.as_deref())
    }
}

// ============================================================================
// DTO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDateDto {
    pub important_date_id: Uuid,
    pub user_id: Uuid,
    pub person_name: String,
    pub date_type: DateType,
    pub date_value: NaiveDate,
    pub recurrence_pattern: RecurrencePattern,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&ImportantDate> for ImportantDateDto {
    fn from(d: &ImportantDate) -> Self {
        ImportantDateDto {
            important_date_id: d.important_date_id,
            user_id: d.user_id,
            person_name: d.person_name.clone(),
            date_type: d.date_type,
            date_value: d.date_value,
            recurrence_pattern: d.recurrence_pattern,
            relationship: d.relationship.clone(),
            notes: d.notes.clone(),
            is_active: d.is_active,
            created_at: d.created_at,
        }
    }
}

/// An important date with its next occurrence worked out
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingDateDto {
    #[serde(flatten)]
    pub date: ImportantDateDto,
    pub next_occurrence: NaiveDate,
    pub days_until: i64,
    pub years_on_next: i32,
}

// ============================================================================
// PERSISTENCE
// ============================================================================

impl Record for ImportantDate {
    const TABLE: &'static str = "important_dates";
    const KIND: &'static str = "important_date";
    const COLUMNS: &'static [&'static str] = &[
        "important_date_id",
        "user_id",
        "person_name",
        "date_type",
        "date_value",
        "recurrence_pattern",
        "relationship",
        "notes",
        "is_active",
        "created_at",
    ];
    const ORDER_BY: &'static str = "person_name";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.important_date_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ImportantDate {
            important_date_id: row.get(0)?,
            user_id: row.get(1)?,
            person_name: row.get(2)?,
            date_type: row.get(3)?,
            date_value: row.get(4)?,
            recurrence_pattern: row.get(5)?,
            relationship: row.get(6)?,
            notes: row.get(7)?,
            is_active: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.important_date_id),
            Box::new(self.user_id),
            Box::new(self.person_name.clone()),
            Box::new(self.date_type),
            Box::new(self.date_value),
            Box::new(self.recurrence_pattern),
            Box::new(self.relationship.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.is_active),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for ImportantDate {
    type Dto = ImportantDateDto;
    type Create = CreateImportantDateCommand;
    type Update = UpdateImportantDateCommand;

    fn from_create(cmd: CreateImportantDateCommand) -> Self {
        ImportantDate {
            important_date_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            person_name: cmd.person_name,
            date_type: cmd.date_type,
            date_value: cmd.date_value,
            recurrence_pattern: cmd.recurrence_pattern,
            relationship: cmd.relationship,
            notes: cmd.notes,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateImportantDateCommand) -> Uuid {
        cmd.important_date_id
    }

    fn apply_update(&mut self, cmd: UpdateImportantDateCommand) {
        self.person_name = cmd.person_name;
        self.date_type = cmd.date_type;
        self.date_value = cmd.date_value;
        self.recurrence_pattern = cmd.recurrence_pattern;
        self.relationship = cmd.relationship;
        self.notes = cmd.notes;
        self.is_active = cmd.is_active;
    }

    fn to_dto(&self) -> ImportantDateDto {
        self.into()
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Active dates whose next occurrence is within `days` of `today`, soonest first.
pub fn upcoming(
    conn: &Connection,
    user_id: Option<Uuid>,
    today: NaiveDate,
    days: i64,
) -> AppResult<Vec<UpcomingDateDto>> {
    let filter = ListFilter {
        user_id,
        parent_id: None,
    };
    let mut upcoming: Vec<UpcomingDateDto> = store::list_by::<ImportantDate>(conn, &filter)?
        .iter()
        .filter(|d| d.is_active)
        .filter_map(|d| {
            let next = d.next_occurrence(today)?;
            let days_until = (next - today).num_days();
            (days_until <= days).then(|| UpcomingDateDto {
                date: d.into(),
                next_occurrence: next,
                days_until,
                years_on_next: next.year() - d.date_value.year(),
            })
        })
        .collect();

    upcoming.sort_by(|a, b| {
        a.next_occurrence
            .cmp(&b.next_occurrence)
            .then_with(|| a.date.person_name.cmp(&b.date.person_name))
    });
    Ok(upcoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn birthday(name: &str, date: NaiveDate) -> ImportantDate {
        ImportantDate::from_create(CreateImportantDateCommand {
            user_id: Uuid::new_v4(),
            person_name: name.to_string(),
            date_type: DateType::Birthday,
            date_value: date,
            recurrence_pattern: RecurrencePattern::Annual,
            relationship: None,
            notes: None,
        })
    }

    #[test]
    fn test_annual_next_occurrence() {
        let john = birthday("John Smith", ymd(1985, 6, 15));

        assert_eq!(john.next_occurrence(ymd(2024, 6, 1)), Some(ymd(2024, 6, 15)));
        assert_eq!(john.next_occurrence(ymd(2024, 6, 15)), Some(ymd(2024, 6, 15)));
        assert_eq!(john.next_occurrence(ymd(2024, 6, 16)), Some(ymd(2025, 6, 15)));
        assert_eq!(john.days_until(ymd(2024, 6, 1)), Some(14));
        assert_eq!(john.years_on_next(ymd(2024, 6, 1)), Some(39));
    }

    #[test]
    fn test_leap_day_falls_on_feb_28() {
        let leap = birthday("Leap", ymd(2000, 2, 29));

        assert_eq!(leap.next_occurrence(ymd(2023, 1, 1)), Some(ymd(2023, 2, 28)));
        assert_eq!(leap.next_occurrence(ymd(2024, 1, 1)), Some(ymd(2024, 2, 29)));
        assert_eq!(leap.next_occurrence(ymd(2023, 3, 1)), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_one_time_date() {
        let mut party = birthday("Retirement party", ymd(2024, 9, 1));
        party.recurrence_pattern = RecurrencePattern::OneTime;

        assert_eq!(party.next_occurrence(ymd(2024, 8, 1)), Some(ymd(2024, 9, 1)));
        assert_eq!(party.next_occurrence(ymd(2024, 9, 2)), None);
        assert_eq!(party.days_until(ymd(2024, 9, 2)), None);
    }

    #[test]
    fn test_future_annual_date_starts_at_itself() {
        let wedding = birthday("Wedding", ymd(2026, 5, 20));
        assert_eq!(wedding.next_occurrence(ymd(2024, 1, 1)), Some(ymd(2026, 5, 20)));
        assert_eq!(wedding.years_on_next(ymd(2024, 1, 1)), Some(0));
    }

    #[test]
    fn test_validation() {
        let cmd = CreateImportantDateCommand {
            user_id: Uuid::new_v4(),
            person_name: "".to_string(),
            date_type: DateType::Custom,
            date_value: ymd(2020, 1, 15),
            recurrence_pattern: RecurrencePattern::Annual,
            relationship: Some("x".repeat(101)),
            notes: None,
        };
        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["person_name", "relationship"]);
    }

    #[test]
    fn test_dto_carries_every_field() {
        let d = birthday("Jane Doe", ymd(1990, 3, 22));
        let dto = d.to_dto();

        assert_eq!(dto.important_date_id, d.important_date_id);
        assert_eq!(dto.user_id, d.user_id);
        assert_eq!(dto.person_name, d.person_name);
        assert_eq!(dto.date_type, d.date_type);
        assert_eq!(dto.date_value, d.date_value);
        assert_eq!(dto.recurrence_pattern, d.recurrence_pattern);
        assert_eq!(dto.is_active, d.is_active);
        assert_eq!(dto.created_at, d.created_at);
    }

    #[test]
    fn test_upcoming_orders_by_next_occurrence() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let user = Uuid::new_v4();

        let mut inactive = birthday("Inactive", ymd(1970, 6, 2));
        inactive.is_active = false;
        for mut d in [
            birthday("Later", ymd(1985, 6, 20)),
            birthday("Sooner", ymd(1990, 6, 5)),
            birthday("Far", ymd(1960, 12, 5)),
            inactive,
        ] {
            d.user_id = user;
            store::insert(&conn, &d).unwrap();
        }

        let found = upcoming(&conn, Some(user), ymd(2024, 6, 1), 30).unwrap();
        let names: Vec<&str> = found.iter().map(|u| u.date.person_name.as_str()).collect();
        assert_eq!(names, vec!["Sooner", "Later"]);
        assert_eq!(found[0].days_until, 4);
        assert_eq!(found[0].years_on_next, 34);

        assert!(upcoming(&conn, Some(Uuid::new_v4()), ymd(2024, 6, 1), 30).unwrap().is_empty());
    }
}
