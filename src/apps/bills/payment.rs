use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_param};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

text_enum! {
    pub enum PaymentMethod {
        Cash,
        Check,
        CreditCard,
        DebitCard,
        BankTransfer,
        PayPal,
        DigitalWallet,
        Other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub payment_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub confirmation_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentCommand {
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub confirmation_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentCommand {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub confirmation_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(amount: Decimal, confirmation: Option<&str>, notes: Option<&str>) -> ValidationResult {
    Validator::new("Payment")
        .amount("amount", amount)
        .max_len_opt("confirmation_number", confirmation, 100)
        .max_len_opt("notes", notes, 1000)
        .finish()
}

impl Validate for CreatePaymentCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.amount, self.confirmation_number.as_deref(), self.notes.as_deref())
    }
}

impl Validate for UpdatePaymentCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.amount, self.confirmation_number.as_deref(), self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDto {
    pub payment_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub confirmation_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentDto {
    fn from(p: &Payment) -> Self {
        PaymentDto {
            payment_id: p.payment_id,
            bill_id: p.bill_id,
            amount: p.amount,
            payment_date: p.payment_date,
            payment_method: p.payment_method,
            confirmation_number: p.confirmation_number.clone(),
            notes: p.notes.clone(),
            created_at: p.created_at,
        }
    }
}

impl Record for Payment {
    const TABLE: &'static str = "payments";
    const KIND: &'static str = "payment";
    const COLUMNS: &'static [&'static str] = &[
        "payment_id",
        "bill_id",
        "amount",
        "payment_date",
        "payment_method",
        "confirmation_number",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "payment_date DESC";
    const PARENT: Option<Parent> = Some(Parent {
        column: "bill_id",
        table: "bills",
        id_column: "bill_id",
        kind: "bill",
    });

    fn id(&self) -> Uuid {
        self.payment_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.bill_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Payment {
            payment_id: row.get(0)?,
            bill_id: row.get(1)?,
            amount: decimal_at(row, 2)?,
            payment_date: row.get(3)?,
            payment_method: row.get(4)?,
            confirmation_number: row.get(5)?,
            notes: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.payment_id),
            Box::new(self.bill_id),
            Box::new(decimal_param(self.amount)),
            Box::new(self.payment_date),
            Box::new(self.payment_method),
            Box::new(self.confirmation_number.clone()),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Payment {
    type Dto = PaymentDto;
    type Create = CreatePaymentCommand;
    type Update = UpdatePaymentCommand;

    fn from_create(cmd: CreatePaymentCommand) -> Self {
        Payment {
            payment_id: Uuid::new_v4(),
            bill_id: cmd.bill_id,
            amount: cmd.amount,
            payment_date: cmd.payment_date,
            payment_method: cmd.payment_method,
            confirmation_number: cmd.confirmation_number,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdatePaymentCommand) -> Uuid {
        cmd.payment_id
    }

    fn apply_update(&mut self, cmd: UpdatePaymentCommand) {
        self.amount = cmd.amount;
        self.payment_date = cmd.payment_date;
        self.payment_method = cmd.payment_method;
        self.confirmation_number = cmd.confirmation_number;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> PaymentDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::bills::{Bill, CreateBillCommand, CreatePayeeCommand, Payee};
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use crate::handler::Handlers;
    use crate::store::ListFilter;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payments_follow_their_bill() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let user_id = Uuid::new_v4();

        let payee = handlers
            .create::<Payee>(CreatePayeeCommand {
                user_id,
                name: "Power Co".to_string(),
                category: Some("Utilities".to_string()),
                account_number: None,
                website: None,
                phone: None,
                notes: None,
            })
            .unwrap();
        let bill = handlers
            .create::<Bill>(CreateBillCommand {
                user_id,
                payee_id: payee.payee_id,
                name: "Electric".to_string(),
                amount: dec!(98.40),
                due_date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
                billing_frequency: crate::apps::bills::BillingFrequency::Monthly,
                is_autopay: true,
                notes: None,
            })
            .unwrap();
        let payment = handlers
            .create::<Payment>(CreatePaymentCommand {
                bill_id: bill.bill_id,
                amount: dec!(98.40),
                payment_date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
                payment_method: PaymentMethod::BankTransfer,
                confirmation_number: Some("CONF-123".to_string()),
                notes: None,
            })
            .unwrap();

        let for_bill = handlers
            .get_all::<Payment>(&ListFilter {
                user_id: None,
                parent_id: Some(bill.bill_id),
            })
            .unwrap();
        assert_eq!(for_bill, vec![payment.clone()]);

        // Deleting the payee takes its bills and their payments with it
        handlers.delete::<Payee>(payee.payee_id).unwrap();
        assert!(handlers.get_by_id::<Bill>(bill.bill_id).unwrap().is_none());
        assert!(handlers.get_by_id::<Payment>(payment.payment_id).unwrap().is_none());
    }
}
