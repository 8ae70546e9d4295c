use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_opt_at, decimal_opt_param};
use crate::error::AppResult;
use crate::handler::Resource;
use crate::store::{self, ListFilter, Record};
use crate::text_enum;
use crate::validation::{checked_sum, Validate, ValidationResult, Validator};

use super::fill_up::FillUp;

text_enum! {
    pub enum FuelType {
        Gasoline,
        Diesel,
        Hybrid,
        PlugInHybrid,
        Electric,
        Flex,
    }
}

fn default_fuel_type() -> FuelType {
    FuelType::Gasoline
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub fuel_type: FuelType,
    pub tank_capacity: Option<Decimal>,
    pub epa_city_mpg: Option<Decimal>,
    pub epa_highway_mpg: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn reactivate(&mut self) {
        self.is_active = true;
    }

    /// Mean of the fill-ups that have an MPG figure, to 2 dp.
    pub fn overall_mpg(fill_ups: &[FillUp]) -> Option<Decimal> {
        let values: Vec<Decimal> = fill_ups.iter().filter_map(|f| f.miles_per_gallon).collect();
        if values.is_empty() {
            return None;
        }
        checked_sum(values.iter().copied())?
            .checked_div(Decimal::from(values.len()))
            .map(|mean| mean.round_dp(2))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVehicleCommand {
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default = "default_fuel_type")]
    pub fuel_type: FuelType,
    #[serde(default)]
    pub tank_capacity: Option<Decimal>,
    #[serde(default)]
    pub epa_city_mpg: Option<Decimal>,
    #[serde(default)]
    pub epa_highway_mpg: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVehicleCommand {
    pub vehicle_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
    pub fuel_type: FuelType,
    #[serde(default)]
    pub tank_capacity: Option<Decimal>,
    #[serde(default)]
    pub epa_city_mpg: Option<Decimal>,
    #[serde(default)]
    pub epa_highway_mpg: Option<Decimal>,
    pub is_active: bool,
}

struct VehicleFields<'a> {
    make: &'a str,
    model: &'a str,
    year: i32,
    vin: Option<&'a str>,
    license_plate: Option<&'a str>,
    tank_capacity: Option<Decimal>,
    epa_city_mpg: Option<Decimal>,
    epa_highway_mpg: Option<Decimal>,
}

impl VehicleFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("Vehicle")
            .required("make", self.make)
            .max_len("make", self.make, 100)
            .required("model", self.model)
            .max_len("model", self.model, 100)
            .range("year", self.year, 1886, 2100)
            .max_len_opt("vin", self.vin, 17)
            .max_len_opt("license_plate", self.license_plate, 20)
            .amount_opt("tank_capacity", self.tank_capacity)
            .amount_opt("epa_city_mpg", self.epa_city_mpg)
            .amount_opt("epa_highway_mpg", self.epa_highway_mpg)
            .finish()
    }
}

impl Validate for CreateVehicleCommand {
    fn validate(&self) -> ValidationResult {
        VehicleFields {
            make: &self.make,
            model: &self.model,
            year: self.year,
            vin: self.vin.as_deref(),
            license_plate: self.license_plate.as_deref(),
            tank_capacity: self.tank_capacity,
            epa_city_mpg: self.epa_city_mpg,
            epa_highway_mpg: self.epa_highway_mpg,
        }
        .validate()
    }
}

impl Validate for UpdateVehicleCommand {
    fn validate(&self) -> ValidationResult {
        VehicleFields {
            make: &self.make,
            model: &self.model,
            year: self.year,
            vin: self.vin.as_deref(),
            license_plate: self.license_plate.as_deref(),
            tank_capacity: self.tank_capacity,
            epa_city_mpg: self.epa_city_mpg,
            epa_highway_mpg: self.epa_highway_mpg,
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDto {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub fuel_type: FuelType,
    pub tank_capacity: Option<Decimal>,
    pub epa_city_mpg: Option<Decimal>,
    pub epa_highway_mpg: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Vehicle> for VehicleDto {
    fn from(v: &Vehicle) -> Self {
        VehicleDto {
            vehicle_id: v.vehicle_id,
            user_id: v.user_id,
            make: v.make.clone(),
            model: v.model.clone(),
            year: v.year,
            vin: v.vin.clone(),
            license_plate: v.license_plate.clone(),
            fuel_type: v.fuel_type,
            tank_capacity: v.tank_capacity,
            epa_city_mpg: v.epa_city_mpg,
            epa_highway_mpg: v.epa_highway_mpg,
            is_active: v.is_active,
            created_at: v.created_at,
        }
    }
}

impl Record for Vehicle {
    const TABLE: &'static str = "vehicles";
    const KIND: &'static str = "vehicle";
    const COLUMNS: &'static [&'static str] = &[
        "vehicle_id",
        "user_id",
        "make",
        "model",
        "year",
        "vin",
        "license_plate",
        "fuel_type",
        "tank_capacity",
        "epa_city_mpg",
        "epa_highway_mpg",
        "is_active",
        "created_at",
    ];
    const ORDER_BY: &'static str = "make, model, year";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.vehicle_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Vehicle {
            vehicle_id: row.get(0)?,
            user_id: row.get(1)?,
            make: row.get(2)?,
            model: row.get(3)?,
            year: row.get(4)?,
            vin: row.get(5)?,
            license_plate: row.get(6)?,
            fuel_type: row.get(7)?,
            tank_capacity: decimal_opt_at(row, 8)?,
            epa_city_mpg: decimal_opt_at(row, 9)?,
            epa_highway_mpg: decimal_opt_at(row, 10)?,
            is_active: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.vehicle_id),
            Box::new(self.user_id),
            Box::new(self.make.clone()),
            Box::new(self.model.clone()),
            Box::new(self.year),
            Box::new(self.vin.clone()),
            Box::new(self.license_plate.clone()),
            Box::new(self.fuel_type),
            Box::new(decimal_opt_param(self.tank_capacity)),
            Box::new(decimal_opt_param(self.epa_city_mpg)),
            Box::new(decimal_opt_param(self.epa_highway_mpg)),
            Box::new(self.is_active),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Vehicle {
    type Dto = VehicleDto;
    type Create = CreateVehicleCommand;
    type Update = UpdateVehicleCommand;

    fn from_create(cmd: CreateVehicleCommand) -> Self {
        Vehicle {
            vehicle_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            make: cmd.make,
            model: cmd.model,
            year: cmd.year,
            vin: cmd.vin,
            license_plate: cmd.license_plate,
            fuel_type: cmd.fuel_type,
            tank_capacity: cmd.tank_capacity,
            epa_city_mpg: cmd.epa_city_mpg,
            epa_highway_mpg: cmd.epa_highway_mpg,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateVehicleCommand) -> Uuid {
        cmd.vehicle_id
    }

    fn apply_update(&mut self, cmd: UpdateVehicleCommand) {
        self.make = cmd.make;
        self.model = cmd.model;
        self.year = cmd.year;
        self.vin = cmd.vin;
        self.license_plate = cmd.license_plate;
        self.fuel_type = cmd.fuel_type;
        self.tank_capacity = cmd.tank_capacity;
        self.epa_city_mpg = cmd.epa_city_mpg;
        self.epa_highway_mpg = cmd.epa_highway_mpg;
        if cmd.is_active {
            self.reactivate();
        } else {
            self.deactivate();
        }
    }

    fn to_dto(&self) -> VehicleDto {
        self.into()
    }
}

/// Lifetime fuel economy of one vehicle
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMpgDto {
    pub vehicle_id: Uuid,
    pub fill_up_count: usize,
    pub overall_mpg: Option<Decimal>,
    pub epa_city_mpg: Option<Decimal>,
    pub epa_highway_mpg: Option<Decimal>,
}

/// `Ok(None)` when the vehicle does not exist.
pub fn vehicle_mpg(conn: &Connection, vehicle_id: Uuid) -> AppResult<Option<VehicleMpgDto>> {
    let Some(vehicle) = store::find::<Vehicle>(conn, vehicle_id)? else {
        return Ok(None);
    };
    let filter = ListFilter {
        user_id: None,
        parent_id: Some(vehicle_id),
    };
    let fill_ups = store::list_by::<FillUp>(conn, &filter)?;

    Ok(Some(VehicleMpgDto {
        vehicle_id,
        fill_up_count: fill_ups.len(),
        overall_mpg: Vehicle::overall_mpg(&fill_ups),
        epa_city_mpg: vehicle.epa_city_mpg,
        epa_highway_mpg: vehicle.epa_highway_mpg,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::fuel::CreateFillUpCommand;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn camry() -> CreateVehicleCommand {
        CreateVehicleCommand {
            user_id: Uuid::new_v4(),
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: 2020,
            vin: Some("1HGBH41JXMN109186".to_string()),
            license_plate: Some("ABC1234".to_string()),
            fuel_type: FuelType::Gasoline,
            tank_capacity: Some(dec!(15.8)),
            epa_city_mpg: None,
            epa_highway_mpg: None,
        }
    }

    fn fill_up_with_mpg(mpg: Option<Decimal>) -> FillUp {
        let mut f = FillUp::from_create(CreateFillUpCommand {
            vehicle_id: Uuid::new_v4(),
            fill_up_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            odometer: dec!(1000),
            gallons: dec!(10),
            price_per_gallon: dec!(3),
            is_full_tank: true,
            fuel_grade: None,
            gas_station: None,
            notes: None,
        });
        f.miles_per_gallon = mpg;
        f
    }

    #[test]
    fn test_overall_mpg_skips_missing_values() {
        let fill_ups = vec![
            fill_up_with_mpg(None),
            fill_up_with_mpg(Some(dec!(31.25))),
            fill_up_with_mpg(Some(dec!(28.91))),
            fill_up_with_mpg(Some(dec!(30.00))),
        ];
        // (31.25 + 28.91 + 30.00) / 3 = 30.0533...
        assert_eq!(Vehicle::overall_mpg(&fill_ups), Some(dec!(30.05)));
        assert_eq!(Vehicle::overall_mpg(&[fill_up_with_mpg(None)]), None);
        assert_eq!(Vehicle::overall_mpg(&[]), None);
    }

    #[test]
    fn test_update_toggles_active() {
        let mut v = Vehicle::from_create(camry());
        assert!(v.is_active);

        let mut cmd = UpdateVehicleCommand {
            vehicle_id: v.vehicle_id,
            make: v.make.clone(),
            model: v.model.clone(),
            year: v.year,
            vin: v.vin.clone(),
            license_plate: None,
            fuel_type: FuelType::Hybrid,
            tank_capacity: v.tank_capacity,
            epa_city_mpg: Some(dec!(51)),
            epa_highway_mpg: Some(dec!(53)),
            is_active: false,
        };
        v.apply_update(cmd.clone());
        assert!(!v.is_active);
        assert_eq!(v.fuel_type, FuelType::Hybrid);

        cmd.is_active = true;
        v.apply_update(cmd);
        assert!(v.is_active);
    }

    #[test]
    fn test_validation() {
        let mut cmd = camry();
        cmd.year = 1885;
        cmd.vin = Some("1HGBH41JXMN1091860".to_string());
        cmd.tank_capacity = Some(dec!(-1));

        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["year", "vin", "tank_capacity"]);
    }
}
