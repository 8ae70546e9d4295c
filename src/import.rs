// 📥 CSV import for blood pressure readings and fuel fill-ups
//
// Every row goes through the normal create handler, so it is validated, gets
// its derived fields, and lands in the audit trail. A SHA-256 of the row's
// identifying fields goes into `import_ledger`; rows already in the ledger are
// counted as duplicates and skipped.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::apps::blood_pressure::{CreateReadingCommand, Reading};
use crate::apps::fuel::{CreateFillUpCommand, FillUp};
use crate::db::{ledger_contains, ledger_record};
use crate::handler::Handlers;
use crate::store::Record;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

// ============================================================================
// ROWS
// ============================================================================

/// `measured_at,systolic,diastolic,pulse,position,arm,notes`
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingRow {
    pub measured_at: DateTime<Utc>,
    pub systolic: i32,
    pub diastolic: i32,
    #[serde(default)]
    pub pulse: Option<i32>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub arm: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReadingRow {
    /// Identity for deduplication: who, when, and the two numbers
    pub fn idempotency_hash(&self, user_id: Uuid) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "reading|{}|{}|{}|{}",
            user_id,
            self.measured_at.to_rfc3339(),
            self.systolic,
            self.diastolic
        ));
        format!("{:x}", hasher.finalize())
    }

    fn into_command(self, user_id: Uuid) -> CreateReadingCommand {
        CreateReadingCommand {
            user_id,
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
            measured_at: self.measured_at,
            position: self.position,
            arm: self.arm,
            notes: self.notes,
        }
    }
}

fn default_full_tank() -> bool {
    true
}

/// `fill_up_date,odometer,gallons,price_per_gallon,is_full_tank,fuel_grade,gas_station,notes`
#[derive(Debug, Clone, Deserialize)]
pub struct FillUpRow {
    pub fill_up_date: NaiveDate,
    pub odometer: Decimal,
    pub gallons: Decimal,
    pub price_per_gallon: Decimal,
    #[serde(default = "default_full_tank")]
    pub is_full_tank: bool,
    #[serde(default)]
    pub fuel_grade: Option<String>,
    #[serde(default)]
    pub gas_station: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FillUpRow {
    pub fn idempotency_hash(&self, vehicle_id: Uuid) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "fill_up|{}|{}|{}|{}",
            vehicle_id,
            self.fill_up_date,
            self.odometer.normalize(),
            self.gallons.normalize()
        ));
        format!("{:x}", hasher.finalize())
    }

    fn into_command(self, vehicle_id: Uuid) -> CreateFillUpCommand {
        CreateFillUpCommand {
            vehicle_id,
            fill_up_date: self.fill_up_date,
            odometer: self.odometer,
            gallons: self.gallons,
            price_per_gallon: self.price_per_gallon,
            is_full_tank: self.is_full_tank,
            fuel_grade: self.fuel_grade,
            gas_station: self.gas_station,
            notes: self.notes,
        }
    }
}

fn load_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let row: T = result.with_context(|| format!("Failed to parse row on line {}", i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// IMPORTERS
// ============================================================================

pub fn import_readings(handlers: &Handlers<'_>, path: &Path, user_id: Uuid) -> Result<ImportSummary> {
    let rows: Vec<ReadingRow> = load_rows(path)?;
    let mut summary = ImportSummary::default();

    for (i, row) in rows.into_iter().enumerate() {
        let hash = row.idempotency_hash(user_id);
        if ledger_contains(handlers.conn, &hash)? {
            debug!(row = i + 1, "Reading already imported");
            summary.duplicates += 1;
            continue;
        }

        let dto = handlers
            .create::<Reading>(row.into_command(user_id))
            .with_context(|| format!("Failed to import reading row {}", i + 1))?;
        ledger_record(handlers.conn, &hash, Reading::KIND, dto.reading_id)?;
        summary.inserted += 1;
    }

    info!(
        path = %path.display(),
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "Imported readings"
    );
    Ok(summary)
}

/// Rows are inserted in ascending odometer order so each fill-up's MPG is
/// computed against the one before it.
pub fn import_fill_ups(handlers: &Handlers<'_>, path: &Path, vehicle_id: Uuid) -> Result<ImportSummary> {
    let mut rows: Vec<FillUpRow> = load_rows(path)?;
    rows.sort_by(|a, b| a.odometer.cmp(&b.odometer));
    let mut summary = ImportSummary::default();

    for row in rows {
        let hash = row.idempotency_hash(vehicle_id);
        if ledger_contains(handlers.conn, &hash)? {
            debug!(odometer = %row.odometer, "Fill-up already imported");
            summary.duplicates += 1;
            continue;
        }

        let odometer = row.odometer;
        let dto = handlers
            .create::<FillUp>(row.into_command(vehicle_id))
            .with_context(|| format!("Failed to import fill-up at odometer {}", odometer))?;
        ledger_record(handlers.conn, &hash, FillUp::KIND, dto.fill_up_id)?;
        summary.inserted += 1;
    }

    info!(
        path = %path.display(),
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "Imported fill-ups"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::fuel::{CreateVehicleCommand, FuelType, Vehicle};
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use crate::store;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_reimport_inserts_nothing() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "import");
        let user = Uuid::new_v4();
        let file = csv_file(
            "measured_at,systolic,diastolic,pulse,position,arm,notes\n\
             2024-03-01T07:30:00Z,128,82,70,Sitting,Left,\n\
             2024-03-02T07:30:00Z,185,110,,Sitting,Left,after coffee\n",
        );

        let first = import_readings(&handlers, file.path(), user).unwrap();
        assert_eq!(first, ImportSummary { inserted: 2, duplicates: 0 });

        let second = import_readings(&handlers, file.path(), user).unwrap();
        assert_eq!(second, ImportSummary { inserted: 0, duplicates: 2 });
        assert_eq!(store::count::<Reading>(&conn).unwrap(), 2);

        let readings = store::list::<Reading>(&conn).unwrap();
        assert!(readings.iter().any(|r| r.is_critical()));
        assert!(readings.iter().any(|r| r.pulse.is_none()));
    }

    #[test]
    fn test_same_rows_for_another_user_are_new() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "import");
        let file = csv_file("measured_at,systolic,diastolic\n2024-03-01T07:30:00Z,120,78\n");

        import_readings(&handlers, file.path(), Uuid::new_v4()).unwrap();
        let other = import_readings(&handlers, file.path(), Uuid::new_v4()).unwrap();
        assert_eq!(other.inserted, 1);
    }

    #[test]
    fn test_invalid_row_reports_its_position() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "import");
        let file = csv_file("measured_at,systolic,diastolic\n2024-03-01T07:30:00Z,500,78\n");

        let err = import_readings(&handlers, file.path(), Uuid::new_v4()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn test_fill_ups_import_in_odometer_order() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "import");
        let vehicle = handlers
            .create::<Vehicle>(CreateVehicleCommand {
                user_id: Uuid::new_v4(),
                make: "Toyota".to_string(),
                model: "Camry".to_string(),
                year: 2020,
                vin: None,
                license_plate: None,
                fuel_type: FuelType::Gasoline,
                tank_capacity: None,
                epa_city_mpg: None,
                epa_highway_mpg: None,
            })
            .unwrap();

        // Out of order on purpose
        let file = csv_file(
            "fill_up_date,odometer,gallons,price_per_gallon,is_full_tank,fuel_grade,gas_station,notes\n\
             2024-05-08,25350,11.2,3.52,true,Regular,Gas Station B,\n\
             2024-05-01,25000,12.5,3.45,true,Regular,Gas Station A,Regular unleaded\n\
             2024-05-15,25720,12.8,3.38,true,Regular,Gas Station A,\n",
        );

        let summary = import_fill_ups(&handlers, file.path(), vehicle.vehicle_id).unwrap();
        assert_eq!(summary.inserted, 3);

        let mut fill_ups = store::list::<FillUp>(&conn).unwrap();
        fill_ups.sort_by(|a, b| a.odometer.cmp(&b.odometer));
        let mpgs: Vec<Option<Decimal>> = fill_ups.iter().map(|f| f.miles_per_gallon).collect();
        assert_eq!(mpgs, vec![None, Some(dec!(31.25)), Some(dec!(28.91))]);
        assert_eq!(fill_ups[0].total_cost, dec!(43.13));

        let again = import_fill_ups(&handlers, file.path(), vehicle.vehicle_id).unwrap();
        assert_eq!(again, ImportSummary { inserted: 0, duplicates: 3 });
    }
}
