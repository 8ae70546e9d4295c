use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use rusqlite::{Connection, Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::error::AppResult;
use crate::handler::Resource;
use crate::store::{self, ListFilter, Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

text_enum! {
    pub enum BillingFrequency {
        OneTime,
        Weekly,
        BiWeekly,
        Monthly,
        Quarterly,
        SemiAnnually,
        Annually,
    }
}

text_enum! {
    pub enum BillStatus { Pending, Paid, Overdue, Cancelled }
}

fn default_frequency() -> BillingFrequency {
    BillingFrequency::Monthly
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    pub bill_id: Uuid,
    pub user_id: Uuid,
    pub payee_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub billing_frequency: BillingFrequency,
    pub status: BillStatus,
    pub is_autopay: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Unpaid and past its due date
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.status, BillStatus::Pending | BillStatus::Overdue) && self.due_date < today
    }

    /// Due date one billing period later. Month steps clamp to the last day
    /// of a shorter month (Jan 31 + 1 month = Feb 28/29).
    pub fn next_due_date(&self) -> Option<NaiveDate> {
        let due = self.due_date;
        match self.billing_frequency {
            BillingFrequency::OneTime => None,
            BillingFrequency::Weekly => due.checked_add_days(Days::new(7)),
            BillingFrequency::BiWeekly => due.checked_add_days(Days::new(14)),
            BillingFrequency::Monthly => due.checked_add_months(Months::new(1)),
            BillingFrequency::Quarterly => due.checked_add_months(Months::new(3)),
            BillingFrequency::SemiAnnually => due.checked_add_months(Months::new(6)),
            BillingFrequency::Annually => due.checked_add_months(Months::new(12)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBillCommand {
    pub user_id: Uuid,
    pub payee_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[serde(default = "default_frequency")]
    pub billing_frequency: BillingFrequency,
    #[serde(default)]
    pub is_autopay: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBillCommand {
    pub bill_id: Uuid,
    pub payee_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub billing_frequency: BillingFrequency,
    pub status: BillStatus,
    #[serde(default)]
    pub is_autopay: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(name: &str, amount: Decimal, notes: Option<&str>) -> ValidationResult {
    Validator::new("Bill")
        .required("name", name)
        .max_len("name", name, 200)
        .amount("amount", amount)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreateBillCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.name, self.amount, self.notes.as_deref())
    }
}

impl Validate for UpdateBillCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.name, self.amount, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDto {
    pub bill_id: Uuid,
    pub user_id: Uuid,
    pub payee_id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub billing_frequency: BillingFrequency,
    pub status: BillStatus,
    pub is_autopay: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Bill> for BillDto {
    fn from(b: &Bill) -> Self {
        BillDto {
            bill_id: b.bill_id,
            user_id: b.user_id,
            payee_id: b.payee_id,
            name: b.name.clone(),
            amount: b.amount,
            due_date: b.due_date,
            billing_frequency: b.billing_frequency,
            status: b.status,
            is_autopay: b.is_autopay,
            notes: b.notes.clone(),
            created_at: b.created_at,
        }
    }
}

impl Record for Bill {
    const TABLE: &'static str = "bills";
    const KIND: &'static str = "bill";
    const COLUMNS: &'static [&'static str] = &[
        "bill_id",
        "user_id",
        "payee_id",
        "name",
        "amount",
        "due_date",
        "billing_frequency",
        "status",
        "is_autopay",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "due_date, name";
    const PARENT: Option<Parent> = Some(Parent {
        column: "payee_id",
        table: "payees",
        id_column: "payee_id",
        kind: "payee",
    });
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.bill_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.payee_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Bill {
            bill_id: row.get(0)?,
            user_id: row.get(1)?,
            payee_id: row.get(2)?,
            name: row.get(3)?,
            amount: decimal_at(row, 4)?,
            due_date: row.get(5)?,
            billing_frequency: row.get(6)?,
            status: row.get(7)?,
            is_autopay: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.bill_id),
            Box::new(self.user_id),
            Box::new(self.payee_id),
            Box::new(self.name.clone()),
            Box::new(decimal_param(self.amount)),
            Box::new(self.due_date),
            Box::new(self.billing_frequency),
            Box::new(self.status),
            Box::new(self.is_autopay),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Bill {
    type Dto = BillDto;
    type Create = CreateBillCommand;
    type Update = UpdateBillCommand;

    const CREATED_TOPIC: Option<&'static str> = Some("bill.created");

    fn from_create(cmd: CreateBillCommand) -> Self {
        Bill {
            bill_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            payee_id: cmd.payee_id,
            name: cmd.name,
            amount: cmd.amount,
            due_date: cmd.due_date,
            billing_frequency: cmd.billing_frequency,
            status: BillStatus::Pending,
            is_autopay: cmd.is_autopay,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateBillCommand) -> Uuid {
        cmd.bill_id
    }

    fn apply_update(&mut self, cmd: UpdateBillCommand) {
        self.payee_id = cmd.payee_id;
        self.name = cmd.name;
        self.amount = cmd.amount;
        self.due_date = cmd.due_date;
        self.billing_frequency = cmd.billing_frequency;
        self.status = cmd.status;
        self.is_autopay = cmd.is_autopay;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> BillDto {
        self.into()
    }
}

/// A bill with the date its next period falls due
#[derive(Debug, Clone, Serialize)]
pub struct OverdueBillDto {
    #[serde(flatten)]
    pub bill: BillDto,
    pub days_overdue: i64,
    pub next_due_date: Option<NaiveDate>,
}

/// Bills overdue as of `today`, oldest due date first.
pub fn overdue_bills(
    conn: &Connection,
    user_id: Option<Uuid>,
    today: NaiveDate,
) -> AppResult<Vec<OverdueBillDto>> {
    let filter = ListFilter {
        user_id,
        parent_id: None,
    };
    Ok(store::list_by::<Bill>(conn, &filter)?
        .iter()
        .filter(|bill| bill.is_overdue(today))
        .map(|bill| OverdueBillDto {
            bill: bill.into(),
            days_overdue: (today - bill.due_date).num_days(),
            next_due_date: bill.next_due_date(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bill(due: NaiveDate, frequency: BillingFrequency) -> Bill {
        Bill::from_create(CreateBillCommand {
            user_id: Uuid::new_v4(),
            payee_id: Uuid::new_v4(),
            name: "Electric".to_string(),
            amount: rust_decimal_macros::dec!(120.50),
            due_date: due,
            billing_frequency: frequency,
            is_autopay: false,
            notes: None,
        })
    }

    #[test]
    fn test_is_overdue() {
        let mut b = bill(ymd(2024, 5, 1), BillingFrequency::Monthly);
        assert!(!b.is_overdue(ymd(2024, 5, 1)));
        assert!(b.is_overdue(ymd(2024, 5, 2)));

        b.status = BillStatus::Overdue;
        assert!(b.is_overdue(ymd(2024, 5, 2)));

        b.status = BillStatus::Paid;
        assert!(!b.is_overdue(ymd(2024, 5, 2)));

        b.status = BillStatus::Cancelled;
        assert!(!b.is_overdue(ymd(2024, 5, 2)));
    }

    #[test]
    fn test_next_due_date_per_frequency() {
        let due = ymd(2024, 1, 31);
        let next = |f| bill(due, f).next_due_date();

        assert_eq!(next(BillingFrequency::OneTime), None);
        assert_eq!(next(BillingFrequency::Weekly), Some(ymd(2024, 2, 7)));
        assert_eq!(next(BillingFrequency::BiWeekly), Some(ymd(2024, 2, 14)));
        assert_eq!(next(BillingFrequency::Monthly), Some(ymd(2024, 2, 29)));
        assert_eq!(next(BillingFrequency::Quarterly), Some(ymd(2024, 4, 30)));
        assert_eq!(next(BillingFrequency::SemiAnnually), Some(ymd(2024, 7, 31)));
        assert_eq!(next(BillingFrequency::Annually), Some(ymd(2025, 1, 31)));
    }

    #[test]
    fn test_new_bill_is_pending() {
        let b = bill(ymd(2024, 5, 1), BillingFrequency::Monthly);
        assert_eq!(b.status, BillStatus::Pending);
        assert_eq!(b.to_dto().amount, rust_decimal_macros::dec!(120.50));
    }
}
