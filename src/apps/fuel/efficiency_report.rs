use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_opt_at, decimal_opt_param, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::{Handlers, Resource};
use crate::store::{self, ListFilter, Parent, Record};
use crate::validation::{checked_sum, Validate, ValidationResult, Validator};

use super::fill_up::FillUp;
use super::VEHICLE_PARENT;

/// Fuel economy over a date range for one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyReport {
    pub efficiency_report_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_miles: Decimal,
    pub total_gallons: Decimal,
    pub average_mpg: Decimal,
    pub total_fuel_cost: Decimal,
    pub cost_per_mile: Decimal,
    pub number_of_fill_ups: i32,
    pub best_mpg: Option<Decimal>,
    pub worst_mpg: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EfficiencyReport {
    /// Left as is when no fuel was bought
    pub fn calculate_average_mpg(&mut self) {
        if self.total_gallons.is_zero() {
            return;
        }
        if let Some(mpg) = self.total_miles.checked_div(self.total_gallons) {
            self.average_mpg = mpg.round_dp(2);
        }
    }

    /// Left as is when no miles were driven
    pub fn calculate_cost_per_mile(&mut self) {
        if self.total_miles.is_zero() {
            return;
        }
        if let Some(cost) = self.total_fuel_cost.checked_div(self.total_miles) {
            self.cost_per_mile = cost.round_dp(4);
        }
    }

    /// Totals and extremes from `fill_ups`, then both ratios. `total_miles`
    /// must already be set.
    pub fn generate_report(&mut self, fill_ups: &[FillUp]) -> AppResult<()> {
        self.number_of_fill_ups = i32::try_from(fill_ups.len())
            .map_err(|_| AppError::out_of_range("EfficiencyReport", "number_of_fill_ups"))?;
        self.total_gallons = checked_sum(fill_ups.iter().map(|f| f.gallons))
            .ok_or_else(|| AppError::out_of_range("EfficiencyReport", "total_gallons"))?;
        self.total_fuel_cost = checked_sum(fill_ups.iter().map(|f| f.total_cost))
            .ok_or_else(|| AppError::out_of_range("EfficiencyReport", "total_fuel_cost"))?;

        let mpgs = fill_ups.iter().filter_map(|f| f.miles_per_gallon);
        self.best_mpg = mpgs.clone().max();
        self.worst_mpg = mpgs.min();

        self.calculate_average_mpg();
        self.calculate_cost_per_mile();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEfficiencyReportCommand {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_miles: Decimal,
    pub total_gallons: Decimal,
    pub total_fuel_cost: Decimal,
    #[serde(default)]
    pub number_of_fill_ups: i32,
    #[serde(default)]
    pub best_mpg: Option<Decimal>,
    #[serde(default)]
    pub worst_mpg: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEfficiencyReportCommand {
    pub efficiency_report_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_miles: Decimal,
    pub total_gallons: Decimal,
    pub total_fuel_cost: Decimal,
    #[serde(default)]
    pub number_of_fill_ups: i32,
    #[serde(default)]
    pub best_mpg: Option<Decimal>,
    #[serde(default)]
    pub worst_mpg: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct ReportFields<'a> {
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_miles: Decimal,
    total_gallons: Decimal,
    total_fuel_cost: Decimal,
    number_of_fill_ups: i32,
    best_mpg: Option<Decimal>,
    worst_mpg: Option<Decimal>,
    notes: Option<&'a str>,
}

impl ReportFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("EfficiencyReport")
            .check(self.start_date <= self.end_date, "end_date", "Must not be before start_date")
            .amount("total_miles", self.total_miles)
            .amount("total_gallons", self.total_gallons)
            .amount("total_fuel_cost", self.total_fuel_cost)
            .amount_opt("best_mpg", self.best_mpg)
            .amount_opt("worst_mpg", self.worst_mpg)
            .check(self.number_of_fill_ups >= 0, "number_of_fill_ups", "Must not be negative")
            .max_len_opt("notes", self.notes, 1000)
            .finish()
    }
}

impl Validate for CreateEfficiencyReportCommand {
    fn validate(&self) -> ValidationResult {
        ReportFields {
            start_date: self.start_date,
            end_date: self.end_date,
            total_miles: self.total_miles,
            total_gallons: self.total_gallons,
            total_fuel_cost: self.total_fuel_cost,
            number_of_fill_ups: self.number_of_fill_ups,
            best_mpg: self.best_mpg,
            worst_mpg: self.worst_mpg,
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateEfficiencyReportCommand {
    fn validate(&self) -> ValidationResult {
        ReportFields {
            start_date: self.start_date,
            end_date: self.end_date,
            total_miles: self.total_miles,
            total_gallons: self.total_gallons,
            total_fuel_cost: self.total_fuel_cost,
            number_of_fill_ups: self.number_of_fill_ups,
            best_mpg: self.best_mpg,
            worst_mpg: self.worst_mpg,
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReportDto {
    pub efficiency_report_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_miles: Decimal,
    pub total_gallons: Decimal,
    pub average_mpg: Decimal,
    pub total_fuel_cost: Decimal,
    pub cost_per_mile: Decimal,
    pub number_of_fill_ups: i32,
    pub best_mpg: Option<Decimal>,
    pub worst_mpg: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&EfficiencyReport> for EfficiencyReportDto {
    fn from(r: &EfficiencyReport) -> Self {
        EfficiencyReportDto {
            efficiency_report_id: r.efficiency_report_id,
            vehicle_id: r.vehicle_id,
            start_date: r.start_date,
            end_date: r.end_date,
            total_miles: r.total_miles,
            total_gallons: r.total_gallons,
            average_mpg: r.average_mpg,
            total_fuel_cost: r.total_fuel_cost,
            cost_per_mile: r.cost_per_mile,
            number_of_fill_ups: r.number_of_fill_ups,
            best_mpg: r.best_mpg,
            worst_mpg: r.worst_mpg,
            notes: r.notes.clone(),
            created_at: r.created_at,
        }
    }
}

impl From<&EfficiencyReport> for CreateEfficiencyReportCommand {
    fn from(r: &EfficiencyReport) -> Self {
        CreateEfficiencyReportCommand {
            vehicle_id: r.vehicle_id,
            start_date: r.start_date,
            end_date: r.end_date,
            total_miles: r.total_miles,
            total_gallons: r.total_gallons,
            total_fuel_cost: r.total_fuel_cost,
            number_of_fill_ups: r.number_of_fill_ups,
            best_mpg: r.best_mpg,
            worst_mpg: r.worst_mpg,
            notes: r.notes.clone(),
        }
    }
}

impl Record for EfficiencyReport {
    const TABLE: &'static str = "efficiency_reports";
    const KIND: &'static str = "efficiency_report";
    const COLUMNS: &'static [&'static str] = &[
        "efficiency_report_id",
        "vehicle_id",
        "start_date",
        "end_date",
        "total_miles",
        "total_gallons",
        "average_mpg",
        "total_fuel_cost",
        "cost_per_mile",
        "number_of_fill_ups",
        "best_mpg",
        "worst_mpg",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "start_date DESC";
    const PARENT: Option<Parent> = Some(VEHICLE_PARENT);

    fn id(&self) -> Uuid {
        self.efficiency_report_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.vehicle_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EfficiencyReport {
            efficiency_report_id: row.get(0)?,
            vehicle_id: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            total_miles: decimal_at(row, 4)?,
            total_gallons: decimal_at(row, 5)?,
            average_mpg: decimal_at(row, 6)?,
            total_fuel_cost: decimal_at(row, 7)?,
            cost_per_mile: decimal_at(row, 8)?,
            number_of_fill_ups: row.get(9)?,
            best_mpg: decimal_opt_at(row, 10)?,
            worst_mpg: decimal_opt_at(row, 11)?,
            notes: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.efficiency_report_id),
            Box::new(self.vehicle_id),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(decimal_param(self.total_miles)),
            Box::new(decimal_param(self.total_gallons)),
            Box::new(decimal_param(self.average_mpg)),
            Box::new(decimal_param(self.total_fuel_cost)),
            Box::new(decimal_param(self.cost_per_mile)),
            Box::new(self.number_of_fill_ups),
            Box::new(decimal_opt_param(self.best_mpg)),
            Box::new(decimal_opt_param(self.worst_mpg)),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for EfficiencyReport {
    type Dto = EfficiencyReportDto;
    type Create = CreateEfficiencyReportCommand;
    type Update = UpdateEfficiencyReportCommand;

    fn from_create(cmd: CreateEfficiencyReportCommand) -> Self {
        let mut report = EfficiencyReport {
            efficiency_report_id: Uuid::new_v4(),
            vehicle_id: cmd.vehicle_id,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            total_miles: cmd.total_miles,
            total_gallons: cmd.total_gallons,
            average_mpg: Decimal::ZERO,
            total_fuel_cost: cmd.total_fuel_cost,
            cost_per_mile: Decimal::ZERO,
            number_of_fill_ups: cmd.number_of_fill_ups,
            best_mpg: cmd.best_mpg,
            worst_mpg: cmd.worst_mpg,
            notes: cmd.notes,
            created_at: Utc::now(),
        };
        report.calculate_average_mpg();
        report.calculate_cost_per_mile();
        report
    }

    fn update_id(cmd: &UpdateEfficiencyReportCommand) -> Uuid {
        cmd.efficiency_report_id
    }

    fn apply_update(&mut self, cmd: UpdateEfficiencyReportCommand) {
        self.start_date = cmd.start_date;
        self.end_date = cmd.end_date;
        self.total_miles = cmd.total_miles;
        self.total_gallons = cmd.total_gallons;
        self.total_fuel_cost = cmd.total_fuel_cost;
        self.number_of_fill_ups = cmd.number_of_fill_ups;
        self.best_mpg = cmd.best_mpg;
        self.worst_mpg = cmd.worst_mpg;
        self.notes = cmd.notes;
        self.calculate_average_mpg();
        self.calculate_cost_per_mile();
    }

    fn to_dto(&self) -> EfficiencyReportDto {
        self.into()
    }
}

// ============================================================================
// GENERATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateReportCommand {
    pub vehicle_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Build and store a report from the vehicle's fill-ups dated within
/// [start_date, end_date]. Miles driven is the odometer span of those fill-ups.
pub fn generate(handlers: &Handlers<'_>, cmd: GenerateReportCommand) -> AppResult<EfficiencyReportDto> {
    if cmd.start_date > cmd.end_date {
        return Err(AppError::invalid("EfficiencyReport", "end_date", "Must not be before start_date"));
    }
    if !store::parent_exists(handlers.conn, &VEHICLE_PARENT, cmd.vehicle_id)? {
        return Err(AppError::NotFound {
            kind: VEHICLE_PARENT.kind,
            id: cmd.vehicle_id,
        });
    }

    let filter = ListFilter {
        user_id: None,
        parent_id: Some(cmd.vehicle_id),
    };
    let fill_ups: Vec<FillUp> = store::list_by::<FillUp>(handlers.conn, &filter)?
        .into_iter()
        .filter(|f| f.fill_up_date >= cmd.start_date && f.fill_up_date <= cmd.end_date)
        .collect();
    if fill_ups.is_empty() {
        return Err(AppError::invalid(
            "EfficiencyReport",
            "fill_ups",
            format!("No fill-ups between {} and {}", cmd.start_date, cmd.end_date),
        ));
    }

    let lowest = fill_ups.iter().map(|f| f.odometer).min().unwrap_or_default();
    let highest = fill_ups.iter().map(|f| f.odometer).max().unwrap_or_default();

    let mut report = EfficiencyReport::from_create(CreateEfficiencyReportCommand {
        vehicle_id: cmd.vehicle_id,
        start_date: cmd.start_date,
        end_date: cmd.end_date,
        total_miles: highest - lowest,
        total_gallons: Decimal::ZERO,
        total_fuel_cost: Decimal::ZERO,
        number_of_fill_ups: 0,
        best_mpg: None,
        worst_mpg: None,
        notes: cmd.notes,
    });
    report.generate_report(&fill_ups)?;

    handlers.create::<EfficiencyReport>((&report).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::fuel::CreateFillUpCommand;
    use rust_decimal_macros::dec;

    fn report(miles: Decimal, gallons: Decimal, cost: Decimal) -> EfficiencyReport {
        EfficiencyReport::from_create(CreateEfficiencyReportCommand {
            vehicle_id: Uuid::nil(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            total_miles: miles,
            total_gallons: gallons,
            total_fuel_cost: cost,
            number_of_fill_ups: 3,
            best_mpg: None,
            worst_mpg: None,
            notes: None,
        })
    }

    #[test]
    fn test_ratios() {
        let r = report(dec!(850), dec!(36.5), dec!(125.81));
        // 850 / 36.5 = 23.287..., 125.81 / 850 = 0.14801...
        assert_eq!(r.average_mpg, dec!(23.29));
        assert_eq!(r.cost_per_mile, dec!(0.1480));
    }

    #[test]
    fn test_ratios_untouched_on_zero_divisor() {
        let mut r = report(dec!(0), dec!(0), dec!(10));
        assert_eq!(r.average_mpg, Decimal::ZERO);
        assert_eq!(r.cost_per_mile, Decimal::ZERO);

        r.average_mpg = dec!(20);
        r.cost_per_mile = dec!(0.15);
        r.calculate_average_mpg();
        r.calculate_cost_per_mile();
        assert_eq!(r.average_mpg, dec!(20));
        assert_eq!(r.cost_per_mile, dec!(0.15));
    }

    #[test]
    fn test_generate_report_from_fill_ups() {
        let fill = |gallons, price, mpg| {
            let mut f = FillUp::from_create(CreateFillUpCommand {
                vehicle_id: Uuid::nil(),
                fill_up_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                odometer: dec!(0),
                gallons,
                price_per_gallon: price,
                is_full_tank: true,
                fuel_grade: None,
                gas_station: None,
                notes: None,
            });
            f.miles_per_gallon = mpg;
            f
        };
        let fill_ups = vec![
            fill(dec!(12.5), dec!(3.45), None),
            fill(dec!(11.2), dec!(3.52), Some(dec!(31.25))),
            fill(dec!(12.8), dec!(3.38), Some(dec!(28.91))),
        ];

        let mut r = report(dec!(720), dec!(0), dec!(0));
        r.generate_report(&fill_ups).unwrap();

        assert_eq!(r.number_of_fill_ups, 3);
        assert_eq!(r.total_gallons, dec!(36.5));
        assert_eq!(r.total_fuel_cost, dec!(125.81));
        assert_eq!(r.best_mpg, Some(dec!(31.25)));
        assert_eq!(r.worst_mpg, Some(dec!(28.91)));
        // 720 / 36.5 = 19.726..., 125.81 / 720 = 0.174736...
        assert_eq!(r.average_mpg, dec!(19.73));
        assert_eq!(r.cost_per_mile, dec!(0.1747));
    }

    #[test]
    fn test_report_without_mpg_has_no_extremes() {
        let mut r = report(dec!(0), dec!(0), dec!(0));
        r.generate_report(&[]).unwrap();
        assert_eq!(r.number_of_fill_ups, 0);
        assert_eq!(r.best_mpg, None);
        assert_eq!(r.worst_mpg, None);
    }
}
