use chrono::NaiveDate;
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::PROPERTY_PARENT;

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub expense_id: Uuid,
    pub property_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub is_recurring: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenseCommand {
    pub property_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateExpenseCommand {
    pub expense_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(description: &str, amount: Decimal, category: &str, notes: Option<&str>) -> ValidationResult {
    Validator::new("Expense")
        .required("description", description)
        .max_len("description", description, 500)
        .amount("amount", amount)
        .required("category", category)
        .max_len("category", category, 100)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateExpenseCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.description, self.amount, &self.category, self.notes.as_deref())
    }
}

impl Validate for UpdateExpenseCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.description, self.amount, &self.category, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDto {
    pub expense_id: Uuid,
    pub property_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub is_recurring: bool,
    pub notes: Option<String>,
}

impl From<&Expense> for ExpenseDto {
    fn from(e: &Expense) -> Self {
        ExpenseDto {
            expense_id: e.expense_id,
            property_id: e.property_id,
            description: e.description.clone(),
            amount: e.amount,
            date: e.date,
            category: e.category.clone(),
            is_recurring: e.is_recurring,
            notes: e.notes.clone(),
        }
    }
}

impl Record for Expense {
    const TABLE: &'static str = "expenses";
    const KIND: &'static str = "expense";
    const COLUMNS: &'static [&'static str] = &[
        "expense_id",
        "property_id",
        "description",
        "amount",
        "date",
        "category",
        "is_recurring",
        "notes",
    ];
    const ORDER_BY: &'static str = "date DESC";
    const PARENT: Option<Parent> = Some(PROPERTY_PARENT);

    fn id(&self) -> Uuid {
        self.expense_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.property_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Expense {
            expense_id: row.get(0)?,
            property_id: row.get(1)?,
            description: row.get(2)?,
            amount: decimal_at(row, 3)?,
            date: row.get(4)?,
            category: row.get(5)?,
            is_recurring: row.get(6)?,
            notes: row.get(7)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.expense_id),
            Box::new(self.property_id),
            Box::new(self.description.clone()),
            Box::new(decimal_param(self.amount)),
            Box::new(self.date),
            Box::new(self.category.clone()),
            Box::new(self.is_recurring),
            Box::new(self.notes.clone()),
        ]
    }
}

impl Resource for Expense {
    type Dto = ExpenseDto;
    type Create = CreateExpenseCommand;
    type Update = UpdateExpenseCommand;

    fn from_create(cmd: CreateExpenseCommand) -> Self {
        Expense {
            expense_id: Uuid::new_v4(),
            property_id: cmd.property_id,
            description: cmd.description,
            amount: cmd.amount,
            date: cmd.date,
            category: cmd.category,
            is_recurring: cmd.is_recurring,
            notes: cmd.notes,
        }
    }

    fn update_id(cmd: &UpdateExpenseCommand) -> Uuid {
        cmd.expense_id
    }

    fn apply_update(&mut self, cmd: UpdateExpenseCommand) {
        self.description = cmd.description;
        self.amount = cmd.amount;
        self.date = cmd.date;
        self.category = cmd.category;
        self.is_recurring = cmd.is_recurring;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> ExpenseDto {
        self.into()
    }
}
