use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::db::{decimal_opt_at, decimal_opt_param};
use crate::error::{AppError, AppResult};
use crate::handler::{Handlers, Resource};
use crate::store::{self, ListFilter, Record};
use crate::text_enum;
use crate::validation::{checked_sum, Validate, ValidationResult, Validator};

text_enum! {
    pub enum WineType { Red, White, Rose, Sparkling, Dessert, Fortified }
}

text_enum! {
    pub enum Region {
        Bordeaux,
        Burgundy,
        Champagne,
        RhoneValley,
        Napa,
        Sonoma,
        Tuscany,
        Barolo,
        Rioja,
        Mosel,
        Other,
    }
}

fn default_bottle_count() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wine {
    pub wine_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub wine_type: WineType,
    pub region: Region,
    pub vintage: Option<i32>,
    pub producer: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub bottle_count: i32,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Wine {
    /// Purchase price times bottles on hand; zero when the price is unknown.
    /// Validated prices and counts keep this far below `Decimal::MAX`.
    pub fn cellar_value(&self) -> Decimal {
        self.purchase_price
            .unwrap_or_default()
            .saturating_mul(Decimal::from(self.bottle_count))
    }

    /// Take up to `bottles` out of the cellar; returns how many were actually taken.
    pub fn consume(&mut self, bottles: i32) -> i32 {
        let taken = bottles.clamp(0, self.bottle_count);
        self.bottle_count -= taken;
        taken
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWineCommand {
    pub user_id: Uuid,
    pub name: String,
    pub wine_type: WineType,
    pub region: Region,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default = "default_bottle_count")]
    pub bottle_count: i32,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWineCommand {
    pub wine_id: Uuid,
    pub name: String,
    pub wine_type: WineType,
    pub region: Region,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    pub bottle_count: i32,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct WineFields<'a> {
    name: &'a str,
    vintage: Option<i32>,
    producer: Option<&'a str>,
    purchase_price: Option<Decimal>,
    bottle_count: i32,
    storage_location: Option<&'a str>,
    notes: Option<&'a str>,
}

impl WineFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("Wine")
            .required("name", self.name)
            .max_len("name", self.name, 200)
            .range_opt("vintage", self.vintage, 1800, 2100)
            .max_len_opt("producer", self.producer, 200)
            .amount_opt("purchase_price", self.purchase_price)
            .check(self.bottle_count >= 0, "bottle_count", "Must not be negative")
            .max_len_opt("storage_location", self.storage_location, 200)
            .max_len_opt("notes", self.notes, 2000)
            .finish()
    }
}

impl Validate for CreateWineCommand {
    fn validate(&self) -> ValidationResult {
        WineFields {
            name: &self.name,
            vintage: self.vintage,
            producer: self.producer.as_deref(),
            purchase_price: self.purchase_price,
            bottle_count: self.bottle_count,
            storage_location: self.storage_location.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateWineCommand {
    fn validate(&self) -> ValidationResult {
        WineFields {
            name: &self.name,
            vintage: self.vintage,
            producer: self.producer.as_deref(),
            purchase_price: self.purchase_price,
            bottle_count: self.bottle_count,
            storage_location: self.storage_location.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WineDto {
    pub wine_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub wine_type: WineType,
    pub region: Region,
    pub vintage: Option<i32>,
    pub producer: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub bottle_count: i32,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cellar_value: Decimal,
}

impl From<&Wine> for WineDto {
    fn from(w: &Wine) -> Self {
        WineDto {
            wine_id: w.wine_id,
            user_id: w.user_id,
            name: w.name.clone(),
            wine_type: w.wine_type,
            region: w.region,
            vintage: w.vintage,
            producer: w.producer.clone(),
            purchase_price: w.purchase_price,
            bottle_count: w.bottle_count,
            storage_location: w.storage_location.clone(),
            notes: w.notes.clone(),
            created_at: w.created_at,
            cellar_value: w.cellar_value(),
        }
    }
}

impl Record for Wine {
    const TABLE: &'static str = "wines";
    const KIND: &'static str = "wine";
    const COLUMNS: &'static [&'static str] = &[
        "wine_id",
        "user_id",
        "name",
        "wine_type",
        "region",
        "vintage",
        "producer",
        "purchase_price",
        "bottle_count",
        "storage_location",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "name, vintage";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.wine_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Wine {
            wine_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            wine_type: row.get(3)?,
            region: row.get(4)?,
            vintage: row.get(5)?,
            producer: row.get(6)?,
            purchase_price: decimal_opt_at(row, 7)?,
            bottle_count: row.get(8)?,
            storage_location: row.get(9)?,
            notes: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.wine_id),
            Box::new(self.user_id),
            Box::new(self.name.clone()),
            Box::new(self.wine_type),
            Box::new(self.region),
            Box::new(self.vintage),
            Box::new(self.producer.clone()),
            Box::new(decimal_opt_param(self.purchase_price)),
            Box::new(self.bottle_count),
            Box::new(self.storage_location.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Wine {
    type Dto = WineDto;
    type Create = CreateWineCommand;
    type Update = UpdateWineCommand;

    const CREATED_TOPIC: Option<&'static str> = Some("wine.created");

    fn from_create(cmd: CreateWineCommand) -> Self {
        Wine {
            wine_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name: cmd.name,
            wine_type: cmd.wine_type,
            region: cmd.region,
            vintage: cmd.vintage,
            producer: cmd.producer,
            purchase_price: cmd.purchase_price,
            bottle_count: cmd.bottle_count,
            storage_location: cmd.storage_location,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateWineCommand) -> Uuid {
        cmd.wine_id
    }

    fn apply_update(&mut self, cmd: UpdateWineCommand) {
        self.name = cmd.name;
        self.wine_type = cmd.wine_type;
        self.region = cmd.region;
        self.vintage = cmd.vintage;
        self.producer = cmd.producer;
        self.purchase_price = cmd.purchase_price;
        self.bottle_count = cmd.bottle_count;
        self.storage_location = cmd.storage_location;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> WineDto {
        self.into()
    }
}

// ============================================================================
// QUERIES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeWineCommand {
    pub bottles: i32,
}

/// Take bottles out of the cellar. `Ok(None)` when the wine does not exist.
pub fn consume(handlers: &Handlers<'_>, wine_id: Uuid, cmd: ConsumeWineCommand) -> AppResult<Option<WineDto>> {
    if cmd.bottles < 1 {
        return Err(AppError::invalid("Wine", "bottles", "Must be at least 1"));
    }
    let Some(mut wine) = store::find::<Wine>(handlers.conn, wine_id)? else {
        return Ok(None);
    };
    wine.consume(cmd.bottles);

    let update = UpdateWineCommand {
        wine_id,
        name: wine.name,
        wine_type: wine.wine_type,
        region: wine.region,
        vintage: wine.vintage,
        producer: wine.producer,
        purchase_price: wine.purchase_price,
        bottle_count: wine.bottle_count,
        storage_location: wine.storage_location,
        notes: wine.notes,
    };
    handlers.update::<Wine>(wine_id, update)
}

/// Bottles and value across a cellar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellarSummary {
    pub user_id: Option<Uuid>,
    pub wine_count: usize,
    pub total_bottles: i64,
    pub total_value: Decimal,
    pub bottles_by_type: BTreeMap<String, i64>,
}

pub fn cellar_summary(conn: &Connection, user_id: Option<Uuid>) -> AppResult<CellarSummary> {
    let filter = ListFilter {
        user_id,
        parent_id: None,
    };
    let wines = store::list_by::<Wine>(conn, &filter)?;

    let mut bottles_by_type = BTreeMap::new();
    for wine in &wines {
        *bottles_by_type.entry(wine.wine_type.to_string()).or_insert(0) += wine.bottle_count as i64;
    }

    Ok(CellarSummary {
        user_id,
        wine_count: wines.len(),
        total_bottles: wines.iter().map(|w| w.bottle_count as i64).sum(),
        total_value: checked_sum(wines.iter().map(Wine::cellar_value))
            .ok_or_else(|| AppError::out_of_range("Wine", "total_value"))?,
        bottles_by_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use rust_decimal_macros::dec;

    fn margaux(user_id: Uuid) -> CreateWineCommand {
        CreateWineCommand {
            user_id,
            name: "Château Margaux".to_string(),
            wine_type: WineType::Red,
            region: Region::Bordeaux,
            vintage: Some(2015),
            producer: Some("Château Margaux".to_string()),
            purchase_price: Some(dec!(450.00)),
            bottle_count: 3,
            storage_location: Some("Rack A".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_cellar_value_and_consume() {
        let mut wine = Wine::from_create(margaux(Uuid::nil()));
        assert_eq!(wine.cellar_value(), dec!(1350.00));

        assert_eq!(wine.consume(2), 2);
        assert_eq!(wine.bottle_count, 1);
        assert_eq!(wine.consume(5), 1);
        assert_eq!(wine.bottle_count, 0);
        assert_eq!(wine.cellar_value(), Decimal::ZERO);

        wine.purchase_price = None;
        wine.bottle_count = 4;
        assert_eq!(wine.cellar_value(), Decimal::ZERO);
    }

    #[test]
    fn test_bottle_count_defaults_to_one() {
        let json = serde_json::json!({
            "user_id": Uuid::nil(),
            "name": "Cloudy Bay",
            "wine_type": "White",
            "region": "Other"
        });
        let cmd: CreateWineCommand = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.bottle_count, 1);
    }

    #[test]
    fn test_validation() {
        let mut cmd = margaux(Uuid::nil());
        cmd.vintage = Some(1799);
        cmd.bottle_count = -1;
        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["vintage", "bottle_count"]);
    }

    #[test]
    fn test_consume_through_handlers() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let wine = handlers.create::<Wine>(margaux(Uuid::new_v4())).unwrap();

        let after = consume(&handlers, wine.wine_id, ConsumeWineCommand { bottles: 2 })
            .unwrap()
            .unwrap();
        assert_eq!(after.bottle_count, 1);
        assert_eq!(after.cellar_value, dec!(450.00));

        assert!(consume(&handlers, Uuid::new_v4(), ConsumeWineCommand { bottles: 1 })
            .unwrap()
            .is_none());
        assert!(consume(&handlers, wine.wine_id, ConsumeWineCommand { bottles: 0 }).is_err());
    }

    #[test]
    fn test_cellar_summary() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let user = Uuid::new_v4();

        handlers.create::<Wine>(margaux(user)).unwrap();
        let mut bubbly = margaux(user);
        bubbly.name = "Dom Pérignon".to_string();
        bubbly.wine_type = WineType::Sparkling;
        bubbly.region = Region::Champagne;
        bubbly.purchase_price = Some(dec!(200));
        bubbly.bottle_count = 2;
        handlers.create::<Wine>(bubbly).unwrap();
        handlers.create::<Wine>(margaux(Uuid::new_v4())).unwrap();

        let summary = cellar_summary(&conn, Some(user)).unwrap();
        assert_eq!(summary.wine_count, 2);
        assert_eq!(summary.total_bottles, 5);
        assert_eq!(summary.total_value, dec!(1750.00));
        assert_eq!(summary.bottles_by_type.get("Red"), Some(&3));
        assert_eq!(summary.bottles_by_type.get("Sparkling"), Some(&2));

        assert_eq!(cellar_summary(&conn, None).unwrap().wine_count, 3);
    }
}
