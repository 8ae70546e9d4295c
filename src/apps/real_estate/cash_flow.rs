use chrono::NaiveDate;
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::PROPERTY_PARENT;

/// Money in and out of a property for one period
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlow {
    pub cash_flow_id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    /// Derived: income minus expenses
    pub net_cash_flow: Decimal,
    pub notes: Option<String>,
}

impl CashFlow {
    /// `None` on overflow
    pub fn calculate_net_cash_flow(&mut self) -> Option<Decimal> {
        let net = self.income.checked_sub(self.expenses)?;
        self.net_cash_flow = net;
        Some(net)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCashFlowCommand {
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCashFlowCommand {
    pub cash_flow_id: Uuid,
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(income: Decimal, expenses: Decimal, notes: Option<&str>) -> ValidationResult {
    Validator::new("CashFlow")
        .amount("income", income)
        .amount("expenses", expenses)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateCashFlowCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.income, self.expenses, self.notes.as_deref())
    }
}

impl Validate for UpdateCashFlowCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.income, self.expenses, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowDto {
    pub cash_flow_id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_cash_flow: Decimal,
    pub notes: Option<String>,
}

impl From<&CashFlow> for CashFlowDto {
    fn from(c: &CashFlow) -> Self {
        CashFlowDto {
            cash_flow_id: c.cash_flow_id,
            property_id: c.property_id,
            date: c.date,
            income: c.income,
            expenses: c.expenses,
            net_cash_flow: c.net_cash_flow,
            notes: c.notes.clone(),
        }
    }
}

impl Record for CashFlow {
    const TABLE: &'static str = "cash_flows";
    const KIND: &'static str = "cash_flow";
    const COLUMNS: &'static [&'static str] = &[
        "cash_flow_id",
        "property_id",
        "date",
        "income",
        "expenses",
        "net_cash_flow",
        "notes",
    ];
    const ORDER_BY: &'static str = "date DESC";
    const PARENT: Option<Parent> = Some(PROPERTY_PARENT);

    fn id(&self) -> Uuid {
        self.cash_flow_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.property_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CashFlow {
            cash_flow_id: row.get(0)?,
            property_id: row.get(1)?,
            date: row.get(2)?,
            income: decimal_at(row, 3)?,
            expenses: decimal_at(row, 4)?,
            net_cash_flow: decimal_at(row, 5)?,
            notes: row.get(6)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.cash_flow_id),
            Box::new(self.property_id),
            Box::new(self.date),
            Box::new(decimal_param(self.income)),
            Box::new(decimal_param(self.expenses)),
            Box::new(decimal_param(self.net_cash_flow)),
            Box::new(self.notes.clone()),
        ]
    }
}

impl Resource for CashFlow {
    type Dto = CashFlowDto;
    type Create = CreateCashFlowCommand;
    type Update = UpdateCashFlowCommand;

    fn from_create(cmd: CreateCashFlowCommand) -> Self {
        CashFlow {
            cash_flow_id: Uuid::new_v4(),
            property_id: cmd.property_id,
            date: cmd.date,
            income: cmd.income,
            expenses: cmd.expenses,
            net_cash_flow: Decimal::ZERO,
            notes: cmd.notes,
        }
    }

    fn update_id(cmd: &UpdateCashFlowCommand) -> Uuid {
        cmd.cash_flow_id
    }

    fn apply_update(&mut self, cmd: UpdateCashFlowCommand) {
        self.date = cmd.date;
        self.income = cmd.income;
        self.expenses = cmd.expenses;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> CashFlowDto {
        self.into()
    }

    fn before_save(&mut self, _conn: &Connection) -> AppResult<()> {
        self.calculate_net_cash_flow()
            .ok_or_else(|| AppError::out_of_range("CashFlow", "net_cash_flow"))?;
        Ok(())
    }
}
