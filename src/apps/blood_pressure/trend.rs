use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::{Handlers, Resource};
use crate::store::{self, ListFilter, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::reading::{BloodPressureCategory, Reading};

/// Change in average systolic (second half minus first half) that counts as a trend
const DIRECTION_THRESHOLD: i64 = 5;

pub const IMPROVING: &str = "Improving";
pub const STABLE: &str = "Stable";
pub const WORSENING: &str = "Worsening";

/// Summary of a user's readings over a period
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub trend_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub average_systolic: Decimal,
    pub average_diastolic: Decimal,
    pub highest_systolic: i32,
    pub highest_diastolic: i32,
    pub lowest_systolic: i32,
    pub lowest_diastolic: i32,
    pub reading_count: i32,
    pub trend_direction: String,
    pub insights: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trend {
    pub fn is_improving(&self) -> bool {
        self.trend_direction.eq_ignore_ascii_case(IMPROVING)
    }

    pub fn period_duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrendCommand {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub average_systolic: Decimal,
    pub average_diastolic: Decimal,
    pub highest_systolic: i32,
    pub highest_diastolic: i32,
    pub lowest_systolic: i32,
    pub lowest_diastolic: i32,
    pub reading_count: i32,
    pub trend_direction: String,
    #[serde(default)]
    pub insights: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTrendCommand {
    pub trend_id: Uuid,
    pub trend_direction: String,
    #[serde(default)]
    pub insights: Option<String>,
}

impl Validate for CreateTrendCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Trend")
            .check(self.start_date <= self.end_date, "end_date", "Must not be before start_date")
            .check(self.reading_count >= 0, "reading_count", "Must not be negative")
            .check(
                self.lowest_systolic <= self.highest_systolic,
                "lowest_systolic",
                "Must not exceed highest_systolic",
            )
            .check(
                self.lowest_diastolic <= self.highest_diastolic,
                "lowest_diastolic",
                "Must not exceed highest_diastolic",
            )
            .required("trend_direction", &self.trend_direction)
            .max_len("trend_direction", &self.trend_direction, 50)
            .max_len_opt("insights", self.insights.as_deref(), 2000)
            .finish()
    }
}

impl Validate for UpdateTrendCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Trend")
            .required("trend_direction", &self.trend_direction)
            .max_len("trend_direction", &self.trend_direction, 50)
            .max_len_opt("insights", self.insights.as_deref(), 2000)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDto {
    pub trend_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub average_systolic: Decimal,
    pub average_diastolic: Decimal,
    pub highest_systolic: i32,
    pub highest_diastolic: i32,
    pub lowest_systolic: i32,
    pub lowest_diastolic: i32,
    pub reading_count: i32,
    pub trend_direction: String,
    pub insights: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_improving: bool,
    pub period_duration_days: i64,
}

impl From<&Trend> for TrendDto {
    fn from(t: &Trend) -> Self {
        TrendDto {
            trend_id: t.trend_id,
            user_id: t.user_id,
            start_date: t.start_date,
            end_date: t.end_date,
            average_systolic: t.average_systolic,
            average_diastolic: t.average_diastolic,
            highest_systolic: t.highest_systolic,
            highest_diastolic: t.highest_diastolic,
            lowest_systolic: t.lowest_systolic,
            lowest_diastolic: t.lowest_diastolic,
            reading_count: t.reading_count,
            trend_direction: t.trend_direction.clone(),
            insights: t.insights.clone(),
            created_at: t.created_at,
            is_improving: t.is_improving(),
            period_duration_days: t.period_duration_days(),
        }
    }
}

impl Record for Trend {
    const TABLE: &'static str = "trends";
    const KIND: &'static str = "trend";
    const COLUMNS: &'static [&'static str] = &[
        "trend_id",
        "user_id",
        "start_date",
        "end_date",
        "average_systolic",
        "average_diastolic",
        "highest_systolic",
        "highest_diastolic",
        "lowest_systolic",
        "lowest_diastolic",
        "reading_count",
        "trend_direction",
        "insights",
        "created_at",
    ];
    const ORDER_BY: &'static str = "start_date DESC";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.trend_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Trend {
            trend_id: row.get(0)?,
            user_id: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            average_systolic: decimal_at(row, 4)?,
            average_diastolic: decimal_at(row, 5)?,
            highest_systolic: row.get(6)?,
            highest_diastolic: row.get(7)?,
            lowest_systolic: row.get(8)?,
            lowest_diastolic: row.get(9)?,
            reading_count: row.get(10)?,
            trend_direction: row.get(11)?,
            insights: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.trend_id),
            Box::new(self.user_id),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(decimal_param(self.average_systolic)),
            Box::new(decimal_param(self.average_diastolic)),
            Box::new(self.highest_systolic),
            Box::new(self.highest_diastolic),
            Box::new(self.lowest_systolic),
            Box::new(self.lowest_diastolic),
            Box::new(self.reading_count),
            Box::new(self.trend_direction.clone()),
            Box::new(self.insights.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Trend {
    type Dto = TrendDto;
    type Create = CreateTrendCommand;
    type Update = UpdateTrendCommand;

    fn from_create(cmd: CreateTrendCommand) -> Self {
        Trend {
            trend_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            average_systolic: cmd.average_systolic,
            average_diastolic: cmd.average_diastolic,
            highest_systolic: cmd.highest_systolic,
            highest_diastolic: cmd.highest_diastolic,
            lowest_systolic: cmd.lowest_systolic,
            lowest_diastolic: cmd.lowest_diastolic,
            reading_count: cmd.reading_count,
            trend_direction: cmd.trend_direction,
            insights: cmd.insights,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateTrendCommand) -> Uuid {
        cmd.trend_id
    }

    /// Statistics are fixed once computed; only the interpretation changes.
    fn apply_update(&mut self, cmd: UpdateTrendCommand) {
        self.trend_direction = cmd.trend_direction;
        self.insights = cmd.insights;
    }

    fn to_dto(&self) -> TrendDto {
        self.into()
    }
}

// ============================================================================
// GENERATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateTrendCommand {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn average(values: impl Iterator<Item = i32>) -> Decimal {
    let (sum, count) = values.fold((0i64, 0i64), |(sum, count), v| (sum + v as i64, count + 1));
    if count == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(sum) / Decimal::from(count)).round_dp(2)
}

/// Compare average systolic of the earlier half against the later half.
/// `readings` must be in measurement order.
pub fn trend_direction(readings: &[Reading]) -> &'static str {
    if readings.len() < 2 {
        return STABLE;
    }
    let (first, second) = readings.split_at(readings.len() / 2);
    let change = average(second.iter().map(|r| r.systolic)) - average(first.iter().map(|r| r.systolic));

    if change <= Decimal::from(-DIRECTION_THRESHOLD) {
        IMPROVING
    } else if change >= Decimal::from(DIRECTION_THRESHOLD) {
        WORSENING
    } else {
        STABLE
    }
}

/// Statistics over `readings` (in measurement order) as a create command.
pub fn summarize(
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    readings: &[Reading],
) -> AppResult<CreateTrendCommand> {
    if readings.is_empty() {
        return Err(AppError::invalid(
            "Trend",
            "readings",
            format!("No readings between {} and {}", start_date, end_date),
        ));
    }

    let average_systolic = average(readings.iter().map(|r| r.systolic));
    let average_diastolic = average(readings.iter().map(|r| r.diastolic));
    let direction = trend_direction(readings);

    let overall = BloodPressureCategory::classify(
        average_systolic.round().to_i32().unwrap_or(i32::MAX),
        average_diastolic.round().to_i32().unwrap_or(i32::MAX),
    );
    let critical = readings.iter().filter(|r| r.is_critical()).count();
    let mut insights = format!(
        "{} readings. Average {}/{} mmHg ({}). Trend: {}.",
        readings.len(),
        average_systolic,
        average_diastolic,
        overall,
        direction
    );
    if critical > 0 {
        insights.push_str(&format!(" {} reading(s) in the hypertensive crisis range.", critical));
    }

    Ok(CreateTrendCommand {
        user_id,
        start_date,
        end_date,
        average_systolic,
        average_diastolic,
        highest_systolic: readings.iter().map(|r| r.systolic).max().unwrap_or_default(),
        highest_diastolic: readings.iter().map(|r| r.diastolic).max().unwrap_or_default(),
        lowest_systolic: readings.iter().map(|r| r.systolic).min().unwrap_or_default(),
        lowest_diastolic: readings.iter().map(|r| r.diastolic).min().unwrap_or_default(),
        reading_count: readings.len() as i32,
        trend_direction: direction.to_string(),
        insights: Some(insights),
    })
}

fn readings_in_range(conn: &Connection, cmd: &GenerateTrendCommand) -> AppResult<Vec<Reading>> {
    let filter = ListFilter {
        user_id: Some(cmd.user_id),
        parent_id: None,
    };
    let mut readings: Vec<Reading> = store::list_by::<Reading>(conn, &filter)?
        .into_iter()
        .filter(|r| {
            let day = r.measured_at.date_naive();
            day >= cmd.start_date && day <= cmd.end_date
        })
        .collect();
    readings.sort_by_key(|r| r.measured_at);
    Ok(readings)
}

/// Build and store a trend from the user's readings measured within
/// [start_date, end_date].
pub fn generate(handlers: &Handlers<'_>, cmd: GenerateTrendCommand) -> AppResult<TrendDto> {
    if cmd.start_date > cmd.end_date {
        return Err(AppError::invalid("Trend", "end_date", "Must not be before start_date"));
    }

    let readings = readings_in_range(handlers.conn, &cmd)?;
    let create = summarize(cmd.user_id, cmd.start_date, cmd.end_date, &readings)?;
    handlers.create::<Trend>(create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::blood_pressure::CreateReadingCommand;
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn readings(values: &[(i32, i32)]) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, (s, d))| {
                Reading::from_create(CreateReadingCommand {
                    user_id: Uuid::nil(),
                    systolic: *s,
                    diastolic: *d,
                    pulse: None,
                    measured_at: start + Duration::days(i as i64),
                    position: None,
                    arm: None,
                    notes: None,
                })
            })
            .collect()
    }

    #[test]
    fn test_direction() {
        assert_eq!(trend_direction(&readings(&[(140, 90)])), STABLE);
        assert_eq!(trend_direction(&readings(&[(140, 90), (134, 85)])), IMPROVING);
        assert_eq!(trend_direction(&readings(&[(130, 85), (135, 85)])), WORSENING);
        assert_eq!(trend_direction(&readings(&[(130, 85), (134, 85)])), STABLE);
        // Odd count: the middle reading lands in the later half
        assert_eq!(
            trend_direction(&readings(&[(150, 90), (140, 88), (142, 86)])),
            IMPROVING
        );
    }

    #[test]
    fn test_summary_statistics() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let cmd = summarize(
            Uuid::nil(),
            day(1),
            day(31),
            &readings(&[(120, 80), (125, 81), (131, 79)]),
        )
        .unwrap();

        assert_eq!(cmd.average_systolic, dec!(125.33));
        assert_eq!(cmd.average_diastolic, dec!(80));
        assert_eq!(cmd.highest_systolic, 131);
        assert_eq!(cmd.lowest_systolic, 120);
        assert_eq!(cmd.highest_diastolic, 81);
        assert_eq!(cmd.lowest_diastolic, 79);
        assert_eq!(cmd.reading_count, 3);
        assert_eq!(cmd.trend_direction, WORSENING);
        assert!(cmd.insights.unwrap().starts_with("3 readings."));
    }

    #[test]
    fn test_no_readings_is_a_validation_error() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = summarize(Uuid::nil(), day, day, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_is_improving_ignores_case() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut cmd = summarize(Uuid::nil(), day, day, &readings(&[(120, 80)])).unwrap();
        cmd.trend_direction = "IMPROVING".to_string();
        cmd.end_date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let trend = Trend::from_create(cmd);

        assert!(trend.is_improving());
        assert_eq!(trend.period_duration_days(), 30);
    }

    #[test]
    fn test_generate_uses_only_readings_in_range() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let user_id = Uuid::new_v4();

        for mut r in readings(&[(150, 95), (148, 94), (135, 85), (132, 84)]) {
            r.user_id = user_id;
            store::insert(&conn, &r).unwrap();
        }

        let cmd = GenerateTrendCommand {
            user_id,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        };
        let trend = generate(&handlers, cmd).unwrap();
        assert_eq!(trend.reading_count, 4);
        assert_eq!(trend.trend_direction, IMPROVING);
        assert!(trend.is_improving);
        assert_eq!(store::count::<Trend>(&conn).unwrap(), 1);

        let narrow = GenerateTrendCommand {
            user_id,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        };
        assert_eq!(generate(&handlers, narrow).unwrap().reading_count, 1);
    }
}
