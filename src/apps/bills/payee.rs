use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::Resource;
use crate::store::Record;
use crate::validation::{Validate, ValidationResult, Validator};

/// Someone bills are paid to
#[derive(Debug, Clone, PartialEq)]
pub struct Payee {
    pub payee_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub account_number: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayeeCommand {
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePayeeCommand {
    pub payee_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct PayeeFields<'a> {
    name: &'a str,
    category: Option<&'a str>,
    account_number: Option<&'a str>,
    website: Option<&'a str>,
    phone: Option<&'a str>,
    notes: Option<&'a str>,
}

impl PayeeFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("Payee")
            .required("name", self.name)
            .max_len("name", self.name, 200)
            .max_len_opt("category", self.category, 100)
            .max_len_opt("account_number", self.account_number, 100)
            .max_len_opt("website", self.website, 500)
            .max_len_opt("phone", self.phone, 50)
            .max_len_opt("notes", self.notes, 1000)
            .finish()
    }
}

impl Validate for CreatePayeeCommand {
    fn validate(&self) -> ValidationResult {
        PayeeFields {
            name: &self.name,
            category: self.category.as_deref(),
            account_number: self.account_number.as_deref(),
            website: self.website.as_deref(),
            phone: self.phone.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdatePayeeCommand {
    fn validate(&self) -> ValidationResult {
        PayeeFields {
            name: &self.name,
            category: self.category.as_deref(),
            account_number: self.account_number.as_deref(),
            website: self.website.as_deref(),
            phone: self.phone.as_deref(),
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayeeDto {
    pub payee_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub account_number: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payee> for PayeeDto {
    fn from(p: &Payee) -> Self {
        PayeeDto {
            payee_id: p.payee_id,
            user_id: p.user_id,
            name: p.name.clone(),
            category: p.category.clone(),
            account_number: p.account_number.clone(),
            website: p.website.clone(),
            phone: p.phone.clone(),
            notes: p.notes.clone(),
            created_at: p.created_at,
        }
    }
}

impl Record for Payee {
    const TABLE: &'static str = "payees";
    const KIND: &'static str = "payee";
    const COLUMNS: &'static [&'static str] = &[
        "payee_id",
        "user_id",
        "name",
        "category",
        "account_number",
        "website",
        "phone",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "name";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.payee_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Payee {
            payee_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            account_number: row.get(4)?,
            website: row.get(5)?,
            phone: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.payee_id),
            Box::new(self.user_id),
            Box::new(self.name.clone()),
            Box::new(self.category.clone()),
            Box::new(self.account_number.clone()),
            Box::new(self.website.clone()),
            Box::new(self.phone.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Payee {
    type Dto = PayeeDto;
    type Create = CreatePayeeCommand;
    type Update = UpdatePayeeCommand;

    fn from_create(cmd: CreatePayeeCommand) -> Self {
        Payee {
            payee_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name: cmd.name,
            category: cmd.category,
            account_number: cmd.account_number,
            website: cmd.website,
            phone: cmd.phone,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdatePayeeCommand) -> Uuid {
        cmd.payee_id
    }

    fn apply_update(&mut self, cmd: UpdatePayeeCommand) {
        self.name = cmd.name;
        self.category = cmd.category;
        self.account_number = cmd.account_number;
        self.website = cmd.website;
        self.phone = cmd.phone;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> PayeeDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_limits() {
        let cmd = CreatePayeeCommand {
            user_id: Uuid::new_v4(),
            name: "City Water".to_string(),
            category: Some("Utilities".to_string()),
            account_number: None,
            website: None,
            phone: Some("5".repeat(51)),
            notes: None,
        };
        let errors = cmd.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "phone");
        assert_eq!(errors[0].context, "Payee");
    }

    #[test]
    fn test_update_keeps_owner_and_created_at() {
        let mut payee = Payee::from_create(CreatePayeeCommand {
            user_id: Uuid::new_v4(),
            name: "City Water".to_string(),
            category: None,
            account_number: None,
            website: None,
            phone: None,
            notes: None,
        });
        let before = payee.clone();

        payee.apply_update(UpdatePayeeCommand {
            payee_id: payee.payee_id,
            name: "Metro Water".to_string(),
            category: Some("Utilities".to_string()),
            account_number: Some("WTR-001".to_string()),
            website: None,
            phone: None,
            notes: None,
        });

        assert_eq!(payee.name, "Metro Water");
        assert_eq!(payee.user_id, before.user_id);
        assert_eq!(payee.created_at, before.created_at);
        assert_eq!(payee.to_dto().account_number.as_deref(), Some("WTR-001"));
    }
}
