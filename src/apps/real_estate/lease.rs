use chrono::NaiveDate;
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::error::{AppError, AppResult};
use crate::handler::{Handlers, Resource};
use crate::store::{self, Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::PROPERTY_PARENT;

/// A tenant's rental agreement on a property
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub lease_id: Uuid,
    pub property_id: Uuid,
    pub tenant_name: String,
    pub monthly_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub security_deposit: Decimal,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl Lease {
    pub fn terminate(&mut self) {
        self.is_active = false;
    }

    /// Active and `today` falls within the term, both ends inclusive
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.is_active && self.start_date <= today && today <= self.end_date
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeaseCommand {
    pub property_id: Uuid,
    pub tenant_name: String,
    pub monthly_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub security_deposit: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLeaseCommand {
    pub lease_id: Uuid,
    pub tenant_name: String,
    pub monthly_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub security_deposit: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

struct LeaseFields<'a> {
    tenant_name: &'a str,
    monthly_rent: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    security_deposit: Decimal,
    notes: Option<&'a str>,
}

impl LeaseFields<'_> {
    fn validate(&self) -> ValidationResult {
        Validator::new("Lease")
            .required("tenant_name", self.tenant_name)
            .max_len("tenant_name", self.tenant_name, 200)
            .amount("monthly_rent", self.monthly_rent)
            .amount("security_deposit", self.security_deposit)
            .check(self.start_date <= self.end_date, "end_date", "Must not be before start_date")
            .max_len_opt("notes", self.notes, 1000)
            .finish()
    }
}

impl Validate for CreateLeaseCommand {
    fn validate(&self) -> ValidationResult {
        LeaseFields {
            tenant_name: &self.tenant_name,
            monthly_rent: self.monthly_rent,
            start_date: self.start_date,
            end_date: self.end_date,
            security_deposit: self.security_deposit,
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

impl Validate for UpdateLeaseCommand {
    fn validate(&self) -> ValidationResult {
        LeaseFields {
            tenant_name: &self.tenant_name,
            monthly_rent: self.monthly_rent,
            start_date: self.start_date,
            end_date: self.end_date,
            security_deposit: self.security_deposit,
            notes: self.notes.as_deref(),
        }
        .validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseDto {
    pub lease_id: Uuid,
    pub property_id: Uuid,
    pub tenant_name: String,
    pub monthly_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub security_deposit: Decimal,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl From<&Lease> for LeaseDto {
    fn from(l: &Lease) -> Self {
        LeaseDto {
            lease_id: l.lease_id,
            property_id: l.property_id,
            tenant_name: l.tenant_name.clone(),
            monthly_rent: l.monthly_rent,
            start_date: l.start_date,
            end_date: l.end_date,
            security_deposit: l.security_deposit,
            is_active: l.is_active,
            notes: l.notes.clone(),
        }
    }
}

impl Record for Lease {
    const TABLE: &'static str = "leases";
    const KIND: &'static str = "lease";
    const COLUMNS: &'static [&'static str] = &[
        "lease_id",
        "property_id",
        "tenant_name",
        "monthly_rent",
        "start_date",
        "end_date",
        "security_deposit",
        "is_active",
        "notes",
    ];
    const ORDER_BY: &'static str = "start_date DESC";
    const PARENT: Option<Parent> = Some(PROPERTY_PARENT);

    fn id(&self) -> Uuid {
        self.lease_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.property_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Lease {
            lease_id: row.get(0)?,
            property_id: row.get(1)?,
            tenant_name: row.get(2)?,
            monthly_rent: decimal_at(row, 3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            security_deposit: decimal_at(row, 6)?,
            is_active: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.lease_id),
            Box::new(self.property_id),
            Box::new(self.tenant_name.clone()),
            Box::new(decimal_param(self.monthly_rent)),
            Box::new(self.start_date),
            Box::new(self.end_date),
            Box::new(decimal_param(self.security_deposit)),
            Box::new(self.is_active),
            Box::new(self.notes.clone()),
        ]
    }
}

impl Resource for Lease {
    type Dto = LeaseDto;
    type Create = CreateLeaseCommand;
    type Update = UpdateLeaseCommand;

    fn from_create(cmd: CreateLeaseCommand) -> Self {
        Lease {
            lease_id: Uuid::new_v4(),
            property_id: cmd.property_id,
            tenant_name: cmd.tenant_name,
            monthly_rent: cmd.monthly_rent,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            security_deposit: cmd.security_deposit,
            is_active: cmd.is_active,
            notes: cmd.notes,
        }
    }

    fn update_id(cmd: &UpdateLeaseCommand) -> Uuid {
        cmd.lease_id
    }

    fn apply_update(&mut self, cmd: UpdateLeaseCommand) {
        self.tenant_name = cmd.tenant_name;
        self.monthly_rent = cmd.monthly_rent;
        self.start_date = cmd.start_date;
        self.end_date = cmd.end_date;
        self.security_deposit = cmd.security_deposit;
        self.is_active = cmd.is_active;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> LeaseDto {
        self.into()
    }
}

/// End a lease early. `Ok(None)` when the lease does not exist.
pub fn terminate(handlers: &Handlers<'_>, lease_id: Uuid) -> AppResult<Option<LeaseDto>> {
    let Some(mut lease) = store::find::<Lease>(handlers.conn, lease_id)? else {
        return Ok(None);
    };
    if !lease.is_active {
        return Err(AppError::invalid("Lease", "is_active", "Lease is already terminated"));
    }
    lease.terminate();

    let update = UpdateLeaseCommand {
        lease_id,
        tenant_name: lease.tenant_name,
        monthly_rent: lease.monthly_rent,
        start_date: lease.start_date,
        end_date: lease.end_date,
        security_deposit: lease.security_deposit,
        is_active: lease.is_active,
        notes: lease.notes,
    };
    handlers.update::<Lease>(lease_id, update)
}
