use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Every table created by [`setup_database`], parents before children.
pub const TABLES: &[&str] = &[
    "important_dates",
    "gifts",
    "celebrations",
    "reminders",
    "payees",
    "bills",
    "payments",
    "readings",
    "trends",
    "vehicles",
    "fill_ups",
    "efficiency_reports",
    "trips",
    "wines",
    "tasting_notes",
    "drinking_windows",
    "properties",
    "expenses",
    "leases",
    "cash_flows",
    "campsites",
    "camping_trips",
    "gear_checklists",
    "reviews",
    "events",
    "import_ledger",
];

/// Open (or create) the database file and make sure the schema exists.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    info!(path = %path.display(), "Database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Cascade deletes depend on this; it is per-connection in SQLite
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // AnniversaryBirthdayReminder
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS important_dates (
            important_date_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            person_name TEXT NOT NULL,
            date_type TEXT NOT NULL,
            date_value TEXT NOT NULL,
            recurrence_pattern TEXT NOT NULL,
            relationship TEXT,
            notes TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS gifts (
            gift_id BLOB PRIMARY KEY,
            important_date_id BLOB NOT NULL
                REFERENCES important_dates(important_date_id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            estimated_price TEXT NOT NULL,
            actual_price TEXT,
            purchase_url TEXT,
            status TEXT NOT NULL,
            purchased_at TEXT,
            delivered_at TEXT
        );
        CREATE TABLE IF NOT EXISTS celebrations (
            celebration_id BLOB PRIMARY KEY,
            important_date_id BLOB NOT NULL
                REFERENCES important_dates(important_date_id) ON DELETE CASCADE,
            celebration_date TEXT NOT NULL,
            notes TEXT,
            photos TEXT NOT NULL DEFAULT '',
            attendees TEXT NOT NULL DEFAULT '',
            rating INTEGER,
            status TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS reminders (
            reminder_id BLOB PRIMARY KEY,
            important_date_id BLOB NOT NULL
                REFERENCES important_dates(important_date_id) ON DELETE CASCADE,
            scheduled_time TEXT NOT NULL,
            advance_notice_days INTEGER NOT NULL,
            delivery_channel TEXT NOT NULL,
            status TEXT NOT NULL,
            sent_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_important_dates_user ON important_dates(user_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_important_dates_date ON important_dates(date_value);
        CREATE INDEX IF NOT EXISTS idx_gifts_parent ON gifts(important_date_id);
        CREATE INDEX IF NOT EXISTS idx_celebrations_parent ON celebrations(important_date_id);
        CREATE INDEX IF NOT EXISTS idx_reminders_parent ON reminders(important_date_id);
        CREATE INDEX IF NOT EXISTS idx_reminders_time ON reminders(scheduled_time);",
    )?;

    // ==========================================================================
    // BillPaymentScheduler
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS payees (
            payee_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            name TEXT NOT NULL,
            category TEXT,
            account_number TEXT,
            website TEXT,
            phone TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS bills (
            bill_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            payee_id BLOB NOT NULL REFERENCES payees(payee_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            amount TEXT NOT NULL,
            due_date TEXT NOT NULL,
            billing_frequency TEXT NOT NULL,
            status TEXT NOT NULL,
            is_autopay INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS payments (
            payment_id BLOB PRIMARY KEY,
            bill_id BLOB NOT NULL REFERENCES bills(bill_id) ON DELETE CASCADE,
            amount TEXT NOT NULL,
            payment_date TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            confirmation_number TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payees_user ON payees(user_id);
        CREATE INDEX IF NOT EXISTS idx_bills_payee ON bills(payee_id);
        CREATE INDEX IF NOT EXISTS idx_bills_user ON bills(user_id);
        CREATE INDEX IF NOT EXISTS idx_bills_due ON bills(due_date);
        CREATE INDEX IF NOT EXISTS idx_payments_bill ON payments(bill_id);",
    )?;

    // ==========================================================================
    // BloodPressureMonitor
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS readings (
            reading_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            systolic INTEGER NOT NULL,
            diastolic INTEGER NOT NULL,
            pulse INTEGER,
            category TEXT NOT NULL,
            measured_at TEXT NOT NULL,
            position TEXT,
            arm TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS trends (
            trend_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            average_systolic TEXT NOT NULL,
            average_diastolic TEXT NOT NULL,
            highest_systolic INTEGER NOT NULL,
            highest_diastolic INTEGER NOT NULL,
            lowest_systolic INTEGER NOT NULL,
            lowest_diastolic INTEGER NOT NULL,
            reading_count INTEGER NOT NULL,
            trend_direction TEXT NOT NULL,
            insights TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_readings_user ON readings(user_id, measured_at);
        CREATE INDEX IF NOT EXISTS idx_trends_user ON trends(user_id);",
    )?;

    // ==========================================================================
    // FuelEconomyTracker
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS vehicles (
            vehicle_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER NOT NULL,
            vin TEXT,
            license_plate TEXT,
            fuel_type TEXT NOT NULL,
            tank_capacity TEXT,
            epa_city_mpg TEXT,
            epa_highway_mpg TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS fill_ups (
            fill_up_id BLOB PRIMARY KEY,
            vehicle_id BLOB NOT NULL REFERENCES vehicles(vehicle_id) ON DELETE CASCADE,
            fill_up_date TEXT NOT NULL,
            odometer TEXT NOT NULL,
            gallons TEXT NOT NULL,
            price_per_gallon TEXT NOT NULL,
            total_cost TEXT NOT NULL,
            is_full_tank INTEGER NOT NULL DEFAULT 0,
            fuel_grade TEXT,
            gas_station TEXT,
            miles_per_gallon TEXT,
            notes TEXT
        );
        CREATE TABLE IF NOT EXISTS efficiency_reports (
            efficiency_report_id BLOB PRIMARY KEY,
            vehicle_id BLOB NOT NULL REFERENCES vehicles(vehicle_id) ON DELETE CASCADE,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            total_miles TEXT NOT NULL,
            total_gallons TEXT NOT NULL,
            average_mpg TEXT NOT NULL,
            total_fuel_cost TEXT NOT NULL,
            cost_per_mile TEXT NOT NULL,
            number_of_fill_ups INTEGER NOT NULL,
            best_mpg TEXT,
            worst_mpg TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS trips (
            trip_id BLOB PRIMARY KEY,
            vehicle_id BLOB NOT NULL REFERENCES vehicles(vehicle_id) ON DELETE CASCADE,
            user_id BLOB NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            start_odometer TEXT NOT NULL,
            end_odometer TEXT,
            trip_type TEXT NOT NULL,
            purpose TEXT,
            start_location TEXT,
            end_location TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_vehicles_user ON vehicles(user_id);
        CREATE INDEX IF NOT EXISTS idx_fill_ups_vehicle ON fill_ups(vehicle_id, fill_up_date);
        CREATE INDEX IF NOT EXISTS idx_reports_vehicle ON efficiency_reports(vehicle_id);
        CREATE INDEX IF NOT EXISTS idx_trips_vehicle ON trips(vehicle_id, start_date);
        CREATE INDEX IF NOT EXISTS idx_trips_user ON trips(user_id);",
    )?;

    // ==========================================================================
    // WineCellarInventory
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wines (
            wine_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            name TEXT NOT NULL,
            wine_type TEXT NOT NULL,
            region TEXT NOT NULL,
            vintage INTEGER,
            producer TEXT,
            purchase_price TEXT,
            bottle_count INTEGER NOT NULL DEFAULT 1,
            storage_location TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tasting_notes (
            tasting_note_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            wine_id BLOB NOT NULL REFERENCES wines(wine_id) ON DELETE CASCADE,
            tasting_date TEXT NOT NULL,
            rating INTEGER NOT NULL,
            appearance TEXT,
            aroma TEXT,
            taste TEXT,
            finish TEXT,
            overall_impression TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS drinking_windows (
            drinking_window_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            wine_id BLOB NOT NULL REFERENCES wines(wine_id) ON DELETE CASCADE,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_wines_user ON wines(user_id);
        CREATE INDEX IF NOT EXISTS idx_tasting_notes_wine ON tasting_notes(wine_id);
        CREATE INDEX IF NOT EXISTS idx_drinking_windows_wine ON drinking_windows(wine_id);",
    )?;

    // ==========================================================================
    // RealEstateInvestmentAnalyzer
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS properties (
            property_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            address TEXT NOT NULL,
            property_type TEXT NOT NULL,
            purchase_price TEXT NOT NULL,
            purchase_date TEXT NOT NULL,
            current_value TEXT NOT NULL,
            square_feet INTEGER NOT NULL DEFAULT 0,
            bedrooms INTEGER NOT NULL DEFAULT 0,
            bathrooms INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS expenses (
            expense_id BLOB PRIMARY KEY,
            property_id BLOB NOT NULL REFERENCES properties(property_id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            notes TEXT
        );
        CREATE TABLE IF NOT EXISTS leases (
            lease_id BLOB PRIMARY KEY,
            property_id BLOB NOT NULL REFERENCES properties(property_id) ON DELETE CASCADE,
            tenant_name TEXT NOT NULL,
            monthly_rent TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            security_deposit TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            notes TEXT
        );
        CREATE TABLE IF NOT EXISTS cash_flows (
            cash_flow_id BLOB PRIMARY KEY,
            property_id BLOB NOT NULL REFERENCES properties(property_id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            income TEXT NOT NULL,
            expenses TEXT NOT NULL,
            net_cash_flow TEXT NOT NULL,
            notes TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_properties_user ON properties(user_id);
        CREATE INDEX IF NOT EXISTS idx_expenses_property ON expenses(property_id);
        CREATE INDEX IF NOT EXISTS idx_leases_property ON leases(property_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_cash_flows_property ON cash_flows(property_id, date);",
    )?;

    // ==========================================================================
    // CampingTripPlanner
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS campsites (
            campsite_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            name TEXT NOT NULL,
            location TEXT,
            campsite_type TEXT NOT NULL,
            description TEXT,
            has_electricity INTEGER NOT NULL DEFAULT 0,
            has_water INTEGER NOT NULL DEFAULT 0,
            cost_per_night TEXT,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS camping_trips (
            trip_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            campsite_id BLOB NOT NULL REFERENCES campsites(campsite_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            number_of_people INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS gear_checklists (
            gear_checklist_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            trip_id BLOB NOT NULL REFERENCES camping_trips(trip_id) ON DELETE CASCADE,
            item_name TEXT NOT NULL,
            is_packed INTEGER NOT NULL DEFAULT 0,
            quantity INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS reviews (
            review_id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            campsite_id BLOB NOT NULL REFERENCES campsites(campsite_id) ON DELETE CASCADE,
            rating INTEGER NOT NULL,
            review_text TEXT,
            review_date TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_campsites_user ON campsites(user_id);
        CREATE INDEX IF NOT EXISTS idx_camping_trips_campsite ON camping_trips(campsite_id);
        CREATE INDEX IF NOT EXISTS idx_camping_trips_user ON camping_trips(user_id, start_date);
        CREATE INDEX IF NOT EXISTS idx_gear_checklists_trip ON gear_checklists(trip_id);
        CREATE INDEX IF NOT EXISTS idx_reviews_campsite ON reviews(campsite_id);",
    )?;

    // ==========================================================================
    // Events Table (audit trail) + import ledger
    // ==========================================================================
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS import_ledger (
            idempotency_hash TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            entity_id BLOB NOT NULL,
            imported_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    debug!(tables = TABLES.len(), "Schema verified");
    Ok(())
}

/// Row counts for every table, in [`TABLES`] order.
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>> {
    TABLES
        .iter()
        .map(|table| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok((*table, count))
        })
        .collect()
}

// ============================================================================
// IMPORT LEDGER
// ============================================================================

pub fn ledger_contains(conn: &Connection, hash: &str) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM import_ledger WHERE idempotency_hash = ?1",
        [hash],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

pub fn ledger_record(conn: &Connection, hash: &str, kind: &str, entity_id: uuid::Uuid) -> Result<()> {
    conn.execute(
        "INSERT INTO import_ledger (idempotency_hash, kind, entity_id, imported_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![hash, kind, entity_id, chrono::Utc::now()],
    )?;
    Ok(())
}

// ============================================================================
// COLUMN HELPERS
// Decimals are stored as TEXT so no precision is lost to REAL.
// ============================================================================

fn parse_decimal(idx: usize, text: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    parse_decimal(idx, &text)
}

pub fn decimal_opt_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_decimal(idx, &t)).transpose()
}

pub fn decimal_param(value: Decimal) -> String {
    value.to_string()
}

pub fn decimal_opt_param(value: Option<Decimal>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Separator for list-valued columns
pub const LIST_DELIMITER: char = ',';

/// Encode a list column: entries trimmed, blanks dropped.
pub fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(&LIST_DELIMITER.to_string())
}

pub fn split_list(encoded: &str) -> Vec<String> {
    encoded
        .split(LIST_DELIMITER)
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn list_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let encoded: String = row.get(idx)?;
    Ok(split_list(&encoded))
}

/// Declares a fieldless enum stored as its variant name in a TEXT column
/// and serialized the same way in JSON.
#[macro_export]
macro_rules! text_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    other => Err(format!("unknown {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    text_enum! {
        pub enum Colour { Red, Green }
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.len(), TABLES.len());
        assert!(counts.iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_list_encoding() {
        let items = vec![
            " photo1.jpg ".to_string(),
            "".to_string(),
            "photo2.jpg".to_string(),
        ];
        let encoded = join_list(&items);
        assert_eq!(encoded, "photo1.jpg,photo2.jpg");
        assert_eq!(split_list(&encoded), vec!["photo1.jpg", "photo2.jpg"]);

        assert_eq!(join_list(&[]), "");
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_decimal_column_keeps_precision() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v TEXT, o TEXT)", []).unwrap();
        conn.execute(
            "INSERT INTO t (v, o) VALUES (?1, ?2)",
            params![decimal_param(dec!(46.771605)), decimal_opt_param(None)],
        )
        .unwrap();

        let (v, o) = conn
            .query_row("SELECT v, o FROM t", [], |row| {
                Ok((decimal_at(row, 0)?, decimal_opt_at(row, 1)?))
            })
            .unwrap();
        assert_eq!(v, dec!(46.771605));
        assert_eq!(o, None);
    }

    #[test]
    fn test_text_enum_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (c TEXT)", []).unwrap();
        conn.execute("INSERT INTO t (c) VALUES (?1)", [Colour::Green]).unwrap();

        let stored: String = conn.query_row("SELECT c FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(stored, "Green");

        let back: Colour = conn.query_row("SELECT c FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(back, Colour::Green);

        assert!("Blue".parse::<Colour>().is_err());
        assert_eq!(Colour::ALL.len(), 2);
    }

    #[test]
    fn test_import_ledger() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(!ledger_contains(&conn, "abc").unwrap());
        ledger_record(&conn, "abc", "reading", uuid::Uuid::new_v4()).unwrap();
        assert!(ledger_contains(&conn, "abc").unwrap());
    }
}
