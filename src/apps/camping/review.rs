use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::Resource;
use crate::store::{Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::CAMPSITE_PARENT;

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    /// 1-5 stars
    pub rating: i32,
    pub review_text: Option<String>,
    pub review_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Mean star rating to one decimal place; `None` with no reviews.
pub fn average_rating(reviews: &[Review]) -> Option<Decimal> {
    if reviews.is_empty() {
        return None;
    }
    let total: i64 = reviews.iter().map(|r| r.rating as i64).sum();
    Some((Decimal::from(total) / Decimal::from(reviews.len())).round_dp(1))
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewCommand {
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub review_text: Option<String>,
    pub review_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewCommand {
    pub review_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub review_text: Option<String>,
    pub review_date: NaiveDate,
}

fn validate_fields(rating: i32, review_text: Option<&str>) -> ValidationResult {
    Validator::new("Review")
        .range("rating", rating, 1, 5)
        .max_len_opt("review_text", review_text, 2000)
        .finish()
}

impl Validate for CreateReviewCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.rating, self.review_text.as_deref())
    }
}

impl Validate for UpdateReviewCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(self.rating, self.review_text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDto {
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub campsite_id: Uuid,
    pub rating: i32,
    pub review_text: Option<String>,
    pub review_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewDto {
    fn from(r: &Review) -> Self {
        ReviewDto {
            review_id: r.review_id,
            user_id: r.user_id,
            campsite_id: r.campsite_id,
            rating: r.rating,
            review_text: r.review_text.clone(),
            review_date: r.review_date,
            created_at: r.created_at,
        }
    }
}

impl Record for Review {
    const TABLE: &'static str = "reviews";
    const KIND: &'static str = "review";
    const COLUMNS: &'static [&'static str] = &[
        "review_id",
        "user_id",
        "campsite_id",
        "rating",
        "review_text",
        "review_date",
        "created_at",
    ];
    const ORDER_BY: &'static str = "review_date DESC";
    const PARENT: Option<Parent> = Some(CAMPSITE_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.review_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.campsite_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Review {
            review_id: row.get(0)?,
            user_id: row.get(1)?,
            campsite_id: row.get(2)?,
            rating: row.get(3)?,
            review_text: row.get(4)?,
            review_date: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.review_id),
            Box::new(self.user_id),
            Box::new(self.campsite_id),
            Box::new(self.rating),
            Box::new(self.review_text.clone()),
            Box::new(self.review_date),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Review {
    type Dto = ReviewDto;
    type Create = CreateReviewCommand;
    type Update = UpdateReviewCommand;

    fn from_create(cmd: CreateReviewCommand) -> Self {
        Review {
            review_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            campsite_id: cmd.campsite_id,
            rating: cmd.rating,
            review_text: cmd.review_text,
            review_date: cmd.review_date,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateReviewCommand) -> Uuid {
        cmd.review_id
    }

    fn apply_update(&mut self, cmd: UpdateReviewCommand) {
        self.rating = cmd.rating;
        self.review_text = cmd.review_text;
        self.review_date = cmd.review_date;
    }

    fn to_dto(&self) -> ReviewDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn review(rating: i32) -> Review {
        Review::from_create(CreateReviewCommand {
            user_id: Uuid::nil(),
            campsite_id: Uuid::nil(),
            rating,
            review_text: None,
            review_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        })
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(5), review(4)]), Some(dec!(4.5)));
        assert_eq!(average_rating(&[review(5), review(4), review(4)]), Some(dec!(4.3)));
    }

    #[test]
    fn test_rating_range() {
        for rating in [0, 6] {
            let cmd = CreateReviewCommand {
                user_id: Uuid::nil(),
                campsite_id: Uuid::nil(),
                rating,
                review_text: None,
                review_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            };
            assert_eq!(cmd.validate().unwrap_err()[0].field, "rating");
        }
    }
}
