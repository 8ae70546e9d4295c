use chrono::NaiveDate;
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_opt_at, decimal_opt_param, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::Resource;
use crate::store::{self, ListFilter, Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::VEHICLE_PARENT;

#[derive(Debug, Clone, PartialEq)]
pub struct FillUp {
    pub fill_up_id: Uuid,
    pub vehicle_id: Uuid,
    pub fill_up_date: NaiveDate,
    pub odometer: Decimal,
    pub gallons: Decimal,
    pub price_per_gallon: Decimal,
    pub total_cost: Decimal,
    pub is_full_tank: bool,
    pub fuel_grade: Option<String>,
    pub gas_station: Option<String>,
    pub miles_per_gallon: Option<Decimal>,
    pub notes: Option<String>,
}

impl FillUp {
    /// Money rounding: cents, halves away from zero. `None` on overflow.
    pub fn compute_total_cost(gallons: Decimal, price_per_gallon: Decimal) -> Option<Decimal> {
        gallons
            .checked_mul(price_per_gallon)
            .map(|cost| cost.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// MPG since the fill-up at `previous_odometer`. Left unset when no
    /// distance was covered or no fuel was bought.
    pub fn calculate_mpg(&mut self, previous_odometer: Decimal) {
        self.miles_per_gallon = if self.gallons.is_zero() || self.odometer <= previous_odometer {
            None
        } else {
            self.odometer
                .checked_sub(previous_odometer)
                .and_then(|miles| miles.checked_div(self.gallons))
                .map(|mpg| mpg.round_dp(2))
        };
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFillUpCommand {
    pub vehicle_id: Uuid,
    pub fill_up_date: NaiveDate,
    pub odometer: Decimal,
    pub gallons: Decimal,
    pub price_per_gallon: Decimal,
    #[serde(default)]
    pub is_full_tank: bool,
    #[serde(default)]
    pub fuel_grade: Option<String>,
    #[serde(default)]
    pub gas_station: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFillUpCommand {
    pub fill_up_id: Uuid,
    pub fill_up_date: NaiveDate,
    pub odometer: Decimal,
    pub gallons: Decimal,
    pub price_per_gallon: Decimal,
    #[serde(default)]
    pub is_full_tank: bool,
    #[serde(default)]
    pub fuel_grade: Option<String>,
    #[serde(default)]
    pub gas_station: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct FillUpFields<'a> {
    odometer: Decimal,
    gallons: Decimal,
    price_per_gallon: Decimal,
    fuel_grade: Option<&'a str>,
    gas_station: Option<&'a str>,
    notes: Option<&'a str>,
}

impl FillUpFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("FillUp")
            .amount("odometer", self.odometer)
            .amount("gallons", self.gallons)
            .amount("price_per_gallon", self.price_per_gallon)
            .max_len_opt("fuel_grade", self.fuel_grade, 50)
            .max_len_opt("gas_station", self.gas_station, 200)
            .max_len_opt("notes", self.notes, 500)
            .finish()
    }
}

impl Validate for CreateFillUpCommand {
    fn validate(&self) -> ValidationResult {
        FillUpFields {
            odometer: self.odometer,
            gallons: self.gallons,
            price_per_gallon: self.price_per_gallon,
            fuel_grade: self.fuel_grade.as_deref(),
            gas_station: self.gas_station.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateFillUpCommand {
    fn validate(&self) -> ValidationResult {
        FillUpFields {
            odometer: self.odometer,
            gallons: self.gallons,
            price_per_gallon: self.price_per_gallon,
            fuel_grade: self.fuel_grade.as_deref(),
            gas_station: self.gas_station.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillUpDto {
    pub fill_up_id: Uuid,
    pub vehicle_id: Uuid,
    pub fill_up_date: NaiveDate,
    pub odometer: Decimal,
    pub gallons: Decimal,
    pub price_per_gallon: Decimal,
    pub total_cost: Decimal,
    pub is_full_tank: bool,
    pub fuel_grade: Option<String>,
    pub gas_station: Option<String>,
    pub miles_per_gallon: Option<Decimal>,
    pub notes: Option<String>,
}

impl From<&FillUp> for FillUpDto {
    fn from(f: &FillUp) -> Self {
        FillUpDto {
            fill_up_id: f.fill_up_id,
            vehicle_id: f.vehicle_id,
            fill_up_date: f.fill_up_date,
            odometer: f.odometer,
            gallons: f.gallons,
            price_per_gallon: f.price_per_gallon,
            total_cost: f.total_cost,
            is_full_tank: f.is_full_tank,
            fuel_grade: f.fuel_grade.clone(),
            gas_station: f.gas_station.clone(),
            miles_per_gallon: f.miles_per_gallon,
            notes: f.notes.clone(),
        }
    }
}

impl Record for FillUp {
    const TABLE: &'static str = "fill_ups";
    const KIND: &'static str = "fill_up";
    const COLUMNS: &'static [&'static str] = &[
        "fill_up_id",
        "vehicle_id",
        "fill_up_date",
        "odometer",
        "gallons",
        "price_per_gallon",
        "total_cost",
        "is_full_tank",
        "fuel_grade",
        "gas_station",
        "miles_per_gallon",
        "notes",
    ];
    const ORDER_BY: &'static str = "fill_up_date DESC";
    const PARENT: Option<Parent> = Some(VEHICLE_PARENT);

    fn id(&self) -> Uuid {
        self.fill_up_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.vehicle_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FillUp {
            fill_up_id: row.get(0)?,
            vehicle_id: row.get(1)?,
            fill_up_date: row.get(2)?,
            odometer: decimal_at(row, 3)?,
            gallons: decimal_at(row, 4)?,
            price_per_gallon: decimal_at(row, 5)?,
            total_cost: decimal_at(row, 6)?,
            is_full_tank: row.get(7)?,
            fuel_grade: row.get(8)?,
            gas_station: row.get(9)?,
            miles_per_gallon: decimal_opt_at(row, 10)?,
            notes: row.get(11)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.fill_up_id),
            Box::new(self.vehicle_id),
            Box::new(self.fill_up_date),
            Box::new(decimal_param(self.odometer)),
            Box::new(decimal_param(self.gallons)),
            Box::new(decimal_param(self.price_per_gallon)),
            Box::new(decimal_param(self.total_cost)),
            Box::new(self.is_full_tank),
            Box::new(self.fuel_grade.clone()),
            Box::new(self.gas_station.clone()),
            Box::new(decimal_opt_param(self.miles_per_gallon)),
            Box::new(self.notes.clone()),
        ]
    }
}

impl Resource for FillUp {
    type Dto = FillUpDto;
    type Create = CreateFillUpCommand;
    type Update = UpdateFillUpCommand;

    fn from_create(cmd: CreateFillUpCommand) -> Self {
        FillUp {
            fill_up_id: Uuid::new_v4(),
            vehicle_id: cmd.vehicle_id,
            fill_up_date: cmd.fill_up_date,
            odometer: cmd.odometer,
            gallons: cmd.gallons,
            price_per_gallon: cmd.price_per_gallon,
            // Overflow is reported by before_save
            total_cost: FillUp::compute_total_cost(cmd.gallons, cmd.price_per_gallon).unwrap_or_default(),
            is_full_tank: cmd.is_full_tank,
            fuel_grade: cmd.fuel_grade,
            gas_station: cmd.gas_station,
            miles_per_gallon: None,
            notes: cmd.notes,
        }
    }

    fn update_id(cmd: &UpdateFillUpCommand) -> Uuid {
        cmd.fill_up_id
    }

    fn apply_update(&mut self, cmd: UpdateFillUpCommand) {
        self.fill_up_date = cmd.fill_up_date;
        self.odometer = cmd.odometer;
        self.gallons = cmd.gallons;
        self.price_per_gallon = cmd.price_per_gallon;
        self.is_full_tank = cmd.is_full_tank;
        self.fuel_grade = cmd.fuel_grade;
        self.gas_station = cmd.gas_station;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> FillUpDto {
        self.into()
    }

    fn before_save(&mut self, conn: &Connection) -> AppResult<()> {
        self.total_cost = FillUp::compute_total_cost(self.gallons, self.price_per_gallon)
            .ok_or_else(|| AppError::out_of_range("FillUp", "total_cost"))?;
        match previous_odometer(conn, self)? {
            Some(previous) => self.calculate_mpg(previous),
            None => self.miles_per_gallon = None,
        }
        Ok(())
    }
}

/// Greatest odometer below this fill-up's among the vehicle's other fill-ups.
fn previous_odometer(conn: &Connection, fill_up: &FillUp) -> AppResult<Option<Decimal>> {
    let filter = ListFilter {
        user_id: None,
        parent_id: Some(fill_up.vehicle_id),
    };
    Ok(store::list_by::<FillUp>(conn, &filter)?
        .iter()
        .filter(|other| other.fill_up_id != fill_up.fill_up_id && other.odometer < fill_up.odometer)
        .map(|other| other.odometer)
        .max())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::fuel::{CreateVehicleCommand, FuelType, Vehicle};
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use crate::handler::Handlers;
    use rust_decimal_macros::dec;

    fn fill(vehicle_id: Uuid, odometer: Decimal, gallons: Decimal, price: Decimal) -> CreateFillUpCommand {
        CreateFillUpCommand {
            vehicle_id,
            fill_up_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            odometer,
            gallons,
            price_per_gallon: price,
            is_full_tank: true,
            fuel_grade: Some("Regular".to_string()),
            gas_station: None,
            notes: None,
        }
    }

    #[test]
    fn test_calculate_mpg() {
        let mut f = FillUp::from_create(fill(Uuid::nil(), dec!(12345.6), dec!(10.5), dec!(3.00)));
        f.calculate_mpg(dec!(12052.0));
        // 293.6 / 10.5 = 27.9619...
        assert_eq!(f.miles_per_gallon, Some(dec!(27.96)));

        f.calculate_mpg(dec!(12345.6));
        assert_eq!(f.miles_per_gallon, None);

        f.calculate_mpg(dec!(13000));
        assert_eq!(f.miles_per_gallon, None);

        let mut empty = FillUp::from_create(fill(Uuid::nil(), dec!(500), dec!(0), dec!(3.00)));
        empty.calculate_mpg(dec!(100));
        assert_eq!(empty.miles_per_gallon, None);
    }

    #[test]
    fn test_total_cost_rounds_half_up() {
        assert_eq!(FillUp::compute_total_cost(dec!(12.5), dec!(3.45)), Some(dec!(43.13)));
        assert_eq!(FillUp::compute_total_cost(dec!(11.2), dec!(3.52)), Some(dec!(39.42)));
        assert_eq!(FillUp::compute_total_cost(dec!(12.8), dec!(3.38)), Some(dec!(43.26)));
    }

    #[test]
    fn test_mpg_derived_from_previous_fill_up() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");

        let vehicle = handlers
            .create::<Vehicle>(CreateVehicleCommand {
                user_id: Uuid::new_v4(),
                make: "Toyota".to_string(),
                model: "Camry".to_string(),
                year: 2020,
                vin: None,
                license_plate: None,
                fuel_type: FuelType::Gasoline,
                tank_capacity: Some(dec!(15.8)),
                epa_city_mpg: None,
                epa_highway_mpg: None,
            })
            .unwrap();
        let id = vehicle.vehicle_id;

        let first = handlers.create::<FillUp>(fill(id, dec!(25000), dec!(12.5), dec!(3.45))).unwrap();
        let second = handlers.create::<FillUp>(fill(id, dec!(25350), dec!(11.2), dec!(3.52))).unwrap();
        let third = handlers.create::<FillUp>(fill(id, dec!(25720), dec!(12.8), dec!(3.38))).unwrap();

        assert_eq!(first.miles_per_gallon, None);
        assert_eq!(first.total_cost, dec!(43.13));
        assert_eq!(second.miles_per_gallon, Some(dec!(31.25)));
        // 370 / 12.8 = 28.90625
        assert_eq!(third.miles_per_gallon, Some(dec!(28.91)));

        // Updating keeps itself out of the "previous" search
        let updated = handlers
            .update::<FillUp>(
                third.fill_up_id,
                UpdateFillUpCommand {
                    fill_up_id: third.fill_up_id,
                    fill_up_date: third.fill_up_date,
                    odometer: dec!(25720),
                    gallons: dec!(12.8),
                    price_per_gallon: dec!(3.50),
                    is_full_tank: true,
                    fuel_grade: None,
                    gas_station: Some("Gas Station A".to_string()),
                    notes: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.miles_per_gallon, Some(dec!(28.91)));
        assert_eq!(updated.total_cost, dec!(44.80));
    }
}
