use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::Resource;
use crate::store::{self, ListFilter, Record};
use crate::text_enum;
use crate::validation::{checked_sum, Validate, ValidationResult, Validator};

use super::{CashFlow, Expense, Lease};

text_enum! {
    pub enum PropertyType { SingleFamily, MultiFamily, Condo, Townhouse, Commercial, Land }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub property_type: PropertyType,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
    pub current_value: Decimal,
    pub square_feet: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    /// Both values are validated amounts, so the difference always fits.
    pub fn equity(&self) -> Decimal {
        self.current_value.saturating_sub(self.purchase_price)
    }

    /// Return on investment as a percentage of the purchase price, 2 dp.
    /// Zero when there is no purchase price to measure against.
    pub fn roi(&self) -> Decimal {
        if self.purchase_price.is_zero() {
            return Decimal::ZERO;
        }
        self.equity()
            .checked_div(self.purchase_price)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| pct.round_dp(2))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePropertyCommand {
    pub user_id: Uuid,
    pub address: String,
    pub property_type: PropertyType,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
    pub current_value: Decimal,
    #[serde(default)]
    pub square_feet: i32,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePropertyCommand {
    pub property_id: Uuid,
    pub address: String,
    pub property_type: PropertyType,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
    pub current_value: Decimal,
    #[serde(default)]
    pub square_feet: i32,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[allow(clippy::too_many_arguments)]
fn validate_property(
    address: &str,
    purchase_price: Decimal,
    current_value: Decimal,
    square_feet: i32,
    bedrooms: i32,
    bathrooms: i32,
    notes: Option<&str>,
) -> ValidationResult {
    Validator::new("Property")
        .required("address", address)
        .max_len("address", address, 500)
        .amount("purchase_price", purchase_price)
        .amount("current_value", current_value)
        .check(square_feet >= 0, "square_feet", "Must not be negative")
        .check(bedrooms >= 0, "bedrooms", "Must not be negative")
        .check(bathrooms >= 0, "bathrooms", "Must not be negative")
        .max_len_opt("notes", notes, 2000)
        .finish()
}

impl Validate for CreatePropertyCommand {
    fn validate(&self) -> ValidationResult {
        validate_property(
            &self.address,
            self.purchase_price,
            self.current_value,
            self.square_feet,
            self.bedrooms,
            self.bathrooms,
            self.notes.as_deref(),
        )
    }
}

impl Validate for UpdatePropertyCommand {
    fn validate(&self) -> ValidationResult {
        validate_property(
            &self.address,
            self.purchase_price,
            self.current_value,
            self.square_feet,
            self.bedrooms,
            self.bathrooms,
            self.notes.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDto {
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub property_type: PropertyType,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
    pub current_value: Decimal,
    pub square_feet: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub equity: Decimal,
    pub roi: Decimal,
}

impl From<&Property> for PropertyDto {
    fn from(p: &Property) -> Self {
        PropertyDto {
            property_id: p.property_id,
            user_id: p.user_id,
            address: p.address.clone(),
            property_type: p.property_type,
            purchase_price: p.purchase_price,
            purchase_date: p.purchase_date,
            current_value: p.current_value,
            square_feet: p.square_feet,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            notes: p.notes.clone(),
            created_at: p.created_at,
            equity: p.equity(),
            roi: p.roi(),
        }
    }
}

impl Record for Property {
    const TABLE: &'static str = "properties";
    const KIND: &'static str = "property";
    const COLUMNS: &'static [&'static str] = &[
        "property_id",
        "user_id",
        "address",
        "property_type",
        "purchase_price",
        "purchase_date",
        "current_value",
        "square_feet",
        "bedrooms",
        "bathrooms",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "purchase_date";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.property_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Property {
            property_id: row.get(0)?,
            user_id: row.get(1)?,
            address: row.get(2)?,
            property_type: row.get(3)?,
            purchase_price: decimal_at(row, 4)?,
            purchase_date: row.get(5)?,
            current_value: decimal_at(row, 6)?,
            square_feet: row.get(7)?,
            bedrooms: row.get(8)?,
            bathrooms: row.get(9)?,
            notes: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.property_id),
            Box::new(self.user_id),
            Box::new(self.address.clone()),
            Box::new(self.property_type),
            Box::new(decimal_param(self.purchase_price)),
            Box::new(self.purchase_date),
            Box::new(decimal_param(self.current_value)),
            Box::new(self.square_feet),
            Box::new(self.bedrooms),
            Box::new(self.bathrooms),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Property {
    type Dto = PropertyDto;
    type Create = CreatePropertyCommand;
    type Update = UpdatePropertyCommand;

    fn from_create(cmd: CreatePropertyCommand) -> Self {
        Property {
            property_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            address: cmd.address,
            property_type: cmd.property_type,
            purchase_price: cmd.purchase_price,
            purchase_date: cmd.purchase_date,
            current_value: cmd.current_value,
            square_feet: cmd.square_feet,
            bedrooms: cmd.bedrooms,
            bathrooms: cmd.bathrooms,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdatePropertyCommand) -> Uuid {
        cmd.property_id
    }

    fn apply_update(&mut self, cmd: UpdatePropertyCommand) {
        self.address = cmd.address;
        self.property_type = cmd.property_type;
        self.purchase_price = cmd.purchase_price;
        self.purchase_date = cmd.purchase_date;
        self.current_value = cmd.current_value;
        self.square_feet = cmd.square_feet;
        self.bedrooms = cmd.bedrooms;
        self.bathrooms = cmd.bathrooms;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> PropertyDto {
        self.into()
    }
}

// ============================================================================
// ANALYSIS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyAnalysis {
    pub property_id: Uuid,
    pub address: String,
    pub equity: Decimal,
    pub roi: Decimal,
    pub total_expenses: Decimal,
    pub recurring_expenses: Decimal,
    pub expense_count: usize,
    /// Rent across leases current on the analysis date
    pub monthly_rent: Decimal,
    pub annual_rent: Decimal,
    pub active_leases: usize,
    /// Sum of recorded cash flow periods
    pub net_cash_flow: Decimal,
    /// Equity plus net cash flow, minus everything spent on the property
    pub net_gain: Decimal,
}

/// Everything recorded against one property
pub struct PropertyLedger<'a> {
    pub expenses: &'a [Expense],
    pub leases: &'a [Lease],
    pub cash_flows: &'a [CashFlow],
}

fn total(field: &str, values: impl IntoIterator<Item = Decimal>) -> AppResult<Decimal> {
    checked_sum(values).ok_or_else(|| AppError::out_of_range("PropertyAnalysis", field))
}

impl PropertyAnalysis {
    pub fn new(property: &Property, ledger: &PropertyLedger<'_>, today: NaiveDate) -> AppResult<Self> {
        let total_expenses = total("total_expenses", ledger.expenses.iter().map(|e| e.amount))?;
        let recurring_expenses = total(
            "recurring_expenses",
            ledger.expenses.iter().filter(|e| e.is_recurring).map(|e| e.amount),
        )?;

        let current: Vec<&Lease> = ledger.leases.iter().filter(|l| l.is_current(today)).collect();
        let monthly_rent = total("monthly_rent", current.iter().map(|l| l.monthly_rent))?;
        let annual_rent = monthly_rent
            .checked_mul(Decimal::from(12))
            .ok_or_else(|| AppError::out_of_range("PropertyAnalysis", "annual_rent"))?;

        let net_cash_flow = total("net_cash_flow", ledger.cash_flows.iter().map(|c| c.net_cash_flow))?;
        let equity = property.equity();
        let net_gain = equity
            .checked_add(net_cash_flow)
            .and_then(|gain| gain.checked_sub(total_expenses))
            .ok_or_else(|| AppError::out_of_range("PropertyAnalysis", "net_gain"))?;

        Ok(PropertyAnalysis {
            property_id: property.property_id,
            address: property.address.clone(),
            equity,
            roi: property.roi(),
            total_expenses,
            recurring_expenses,
            expense_count: ledger.expenses.len(),
            monthly_rent,
            annual_rent,
            active_leases: current.len(),
            net_cash_flow,
            net_gain,
        })
    }
}

/// `Ok(None)` when the property does not exist.
pub fn analyze(conn: &Connection, property_id: Uuid, today: NaiveDate) -> AppResult<Option<PropertyAnalysis>> {
    let Some(property) = store::find::<Property>(conn, property_id)? else {
        return Ok(None);
    };
    let filter = ListFilter {
        user_id: None,
        parent_id: Some(property_id),
    };
    let expenses = store::list_by::<Expense>(conn, &filter)?;
    let leases = store::list_by::<Lease>(conn, &filter)?;
    let cash_flows = store::list_by::<CashFlow>(conn, &filter)?;

    let ledger = PropertyLedger {
        expenses: &expenses,
        leases: &leases,
        cash_flows: &cash_flows,
    };
    PropertyAnalysis::new(&property, &ledger, today).map(Some)
}
