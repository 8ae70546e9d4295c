use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_at, decimal_opt_at, decimal_opt_param, decimal_param};
use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

use super::IMPORTANT_DATE_PARENT;

text_enum! {
    pub enum GiftStatus { Idea, Purchased, Wrapped, Delivered }
}

fn default_status() -> GiftStatus {
    GiftStatus::Idea
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gift {
    pub gift_id: Uuid,
    pub important_date_id: Uuid,
    pub description: String,
    pub estimated_price: Decimal,
    pub actual_price: Option<Decimal>,
    pub purchase_url: Option<String>,
    pub status: GiftStatus,
    pub purchased_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Gift {
    pub fn mark_purchased(&mut self, price: Decimal, at: DateTime<Utc>) {
        self.actual_price = Some(price);
        self.status = GiftStatus::Purchased;
        self.purchased_at = Some(at);
    }

    pub fn mark_delivered(&mut self, at: DateTime<Utc>) {
        self.status = GiftStatus::Delivered;
        self.delivered_at = Some(at);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGiftCommand {
    pub important_date_id: Uuid,
    pub description: String,
    pub estimated_price: Decimal,
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default = "default_status")]
    pub status: GiftStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGiftCommand {
    pub gift_id: Uuid,
    pub description: String,
    pub estimated_price: Decimal,
    #[serde(default)]
    pub actual_price: Option<Decimal>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    pub status: GiftStatus,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Validate for CreateGiftCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Gift")
            .required("description", &self.description)
            .max_len("description", &self.description, 500)
            .amount("estimated_price", self.estimated_price)
            .max_len_opt("purchase_url", self.purchase_url.as_deref(), 2000)
            .finish()
    }
}

impl Validate for UpdateGiftCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Gift")
            .required("description", &self.description)
            .max_len("description", &self.description, 500)
            .amount("estimated_price", self.estimated_price)
            .amount_opt("actual_price", self.actual_price)
            .max_len_opt("purchase_url", self.purchase_url.as_deref(), 2000)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftDto {
    pub gift_id: Uuid,
    pub important_date_id: Uuid,
    pub description: String,
    pub estimated_price: Decimal,
    pub actual_price: Option<Decimal>,
    pub purchase_url: Option<String>,
    pub status: GiftStatus,
    pub purchased_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&Gift> for GiftDto {
    fn from(g: &Gift) -> Self {
        GiftDto {
            gift_id: g.gift_id,
            important_date_id: g.important_date_id,
            description: g.description.clone(),
            estimated_price: g.estimated_price,
            actual_price: g.actual_price,
            purchase_url: g.purchase_url.clone(),
            status: g.status,
            purchased_at: g.purchased_at,
            delivered_at: g.delivered_at,
        }
    }
}

impl Record for Gift {
    const TABLE: &'static str = "gifts";
    const KIND: &'static str = "gift";
    const COLUMNS: &'static [&'static str] = &[
        "gift_id",
        "important_date_id",
        "description",
        "estimated_price",
        "actual_price",
        "purchase_url",
        "status",
        "purchased_at",
        "delivered_at",
    ];
    const ORDER_BY: &'static str = "description";
    const PARENT: Option<Parent> = Some(IMPORTANT_DATE_PARENT);

    fn id(&self) -> Uuid {
        self.gift_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.important_date_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Gift {
            gift_id: row.get(0)?,
            important_date_id: row.get(1)?,
            description: row.get(2)?,
            estimated_price: decimal_at(row, 3)?,
            actual_price: decimal_opt_at(row, 4)?,
            purchase_url: row.get(5)?,
            status: row.get(6)?,
            purchased_at: row.get(7)?,
            delivered_at: row.get(8)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.gift_id),
            Box::new(self.important_date_id),
            Box::new(self.description.clone()),
            Box::new(decimal_param(self.estimated_price)),
            Box::new(decimal_opt_param(self.actual_price)),
            Box::new(self.purchase_url.clone()),
            Box::new(self.status),
            Box::new(self.purchased_at),
            Box::new(self.delivered_at),
        ]
    }
}

impl Resource for Gift {
    type Dto = GiftDto;
    type Create = CreateGiftCommand;
    type Update = UpdateGiftCommand;

    fn from_create(cmd: CreateGiftCommand) -> Self {
        Gift {
            gift_id: Uuid::new_v4(),
            important_date_id: cmd.important_date_id,
            description: cmd.description,
            estimated_price: cmd.estimated_price,
            actual_price: None,
            purchase_url: cmd.purchase_url,
            status: cmd.status,
            purchased_at: None,
            delivered_at: None,
        }
    }

    fn update_id(cmd: &UpdateGiftCommand) -> Uuid {
        cmd.gift_id
    }

    fn apply_update(&mut self, cmd: UpdateGiftCommand) {
        self.description = cmd.description;
        self.estimated_price = cmd.estimated_price;
        self.actual_price = cmd.actual_price;
        self.purchase_url = cmd.purchase_url;
        self.status = cmd.status;
        self.purchased_at = cmd.purchased_at;
        self.delivered_at = cmd.delivered_at;

        // Stamp status changes that arrive without a timestamp
        let now = Utc::now();
        match self.status {
            GiftStatus::Purchased if self.purchased_at.is_none() => {
                let price = self.actual_price.unwrap_or(self.estimated_price);
                self.mark_purchased(price, now);
            }
            GiftStatus::Delivered if self.delivered_at.is_none() => self.mark_delivered(now),
            _ => {}
        }
    }

    fn to_dto(&self) -> GiftDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn headphones() -> Gift {
        Gift::from_create(CreateGiftCommand {
            important_date_id: Uuid::new_v4(),
            description: "Wireless Bluetooth Headphones".to_string(),
            estimated_price: dec!(79.99),
            purchase_url: Some("https://example.com/headphones".to_string()),
            status: GiftStatus::Idea,
        })
    }

    fn update_for(gift: &Gift, status: GiftStatus) -> UpdateGiftCommand {
        UpdateGiftCommand {
            gift_id: gift.gift_id,
            description: gift.description.clone(),
            estimated_price: gift.estimated_price,
            actual_price: None,
            purchase_url: gift.purchase_url.clone(),
            status,
            purchased_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn test_mark_purchased_and_delivered() {
        let mut gift = headphones();
        let at = Utc::now();

        gift.mark_purchased(dec!(74.50), at);
        assert_eq!(gift.status, GiftStatus::Purchased);
        assert_eq!(gift.actual_price, Some(dec!(74.50)));
        assert_eq!(gift.purchased_at, Some(at));

        gift.mark_delivered(at);
        assert_eq!(gift.status, GiftStatus::Delivered);
        assert_eq!(gift.delivered_at, Some(at));
    }

    #[test]
    fn test_update_to_purchased_stamps_time_and_price() {
        let mut gift = headphones();
        let cmd = update_for(&gift, GiftStatus::Purchased);
        gift.apply_update(cmd);

        assert!(gift.purchased_at.is_some());
        assert_eq!(gift.actual_price, Some(dec!(79.99)));
        assert!(gift.delivered_at.is_none());
    }

    #[test]
    fn test_update_keeps_explicit_timestamps() {
        let mut gift = headphones();
        let at = "2024-06-10T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut cmd = update_for(&gift, GiftStatus::Delivered);
        cmd.delivered_at = Some(at);
        gift.apply_update(cmd);

        assert_eq!(gift.delivered_at, Some(at));
    }

    #[test]
    fn test_negative_prices_rejected() {
        let mut cmd = update_for(&headphones(), GiftStatus::Idea);
        cmd.estimated_price = dec!(-1);
        cmd.actual_price = Some(dec!(-5));

        let errors = cmd.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_dto_carries_every_field() {
        let gift = headphones();
        let dto = gift.to_dto();
        assert_eq!(dto.gift_id, gift.gift_id);
        assert_eq!(dto.important_date_id, gift.important_date_id);
        assert_eq!(dto.description, gift.description);
        assert_eq!(dto.estimated_price, gift.estimated_price);
        assert_eq!(dto.purchase_url, gift.purchase_url);
        assert_eq!(dto.status, GiftStatus::Idea);
    }
}
