use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{decimal_opt_at, decimal_opt_param};
use crate::handler::Resource;
use crate::store::Record;
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

text_enum! {
    pub enum CampsiteType { Tent, Rv, Cabin, Primitive, Glamping }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Campsite {
    pub campsite_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub campsite_type: CampsiteType,
    pub description: Option<String>,
    pub has_electricity: bool,
    pub has_water: bool,
    /// `None` for free sites
    pub cost_per_night: Option<Decimal>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampsiteCommand {
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub campsite_type: CampsiteType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub has_electricity: bool,
    #[serde(default)]
    pub has_water: bool,
    #[serde(default)]
    pub cost_per_night: Option<Decimal>,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCampsiteCommand {
    pub campsite_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub campsite_type: CampsiteType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub has_electricity: bool,
    #[serde(default)]
    pub has_water: bool,
    #[serde(default)]
    pub cost_per_night: Option<Decimal>,
    #[serde(default)]
    pub is_favorite: bool,
}

fn validate_fields(
    name: &str,
    location: Option<&str>,
    description: Option<&str>,
    cost_per_night: Option<Decimal>,
) -> ValidationResult {
    Validator::new("Campsite")
        .required("name", name)
        .max_len("name", name, 200)
        .max_len_opt("location", location, 500)
        .max_len_opt("description", description, 1000)
        .amount_opt("cost_per_night", cost_per_night)
        .finish()
}

impl Validate for CreateCampsiteCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.location.as_deref(),
            self.description.as_deref(),
            self.cost_per_night,
        )
    }
}

impl Validate for UpdateCampsiteCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(
            &self.name,
            self.location.as_deref(),
            self.description.as_deref(),
            self.cost_per_night,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampsiteDto {
    pub campsite_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub campsite_type: CampsiteType,
    pub description: Option<String>,
    pub has_electricity: bool,
    pub has_water: bool,
    pub cost_per_night: Option<Decimal>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Campsite> for CampsiteDto {
    fn from(c: &Campsite) -> Self {
        CampsiteDto {
            campsite_id: c.campsite_id,
            user_id: c.user_id,
            name: c.name.clone(),
            location: c.location.clone(),
            campsite_type: c.campsite_type,
            description: c.description.clone(),
            has_electricity: c.has_electricity,
            has_water: c.has_water,
            cost_per_night: c.cost_per_night,
            is_favorite: c.is_favorite,
            created_at: c.created_at,
        }
    }
}

impl Record for Campsite {
    const TABLE: &'static str = "campsites";
    const KIND: &'static str = "campsite";
    const COLUMNS: &'static [&'static str] = &[
        "campsite_id",
        "user_id",
        "name",
        "location",
        "campsite_type",
        "description",
        "has_electricity",
        "has_water",
        "cost_per_night",
        "is_favorite",
        "created_at",
    ];
    const ORDER_BY: &'static str = "name";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.campsite_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Campsite {
            campsite_id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            location: row.get(3)?,
            campsite_type: row.get(4)?,
            description: row.get(5)?,
            has_electricity: row.get(6)?,
            has_water: row.get(7)?,
            cost_per_night: decimal_opt_at(row, 8)?,
            is_favorite: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.campsite_id),
            Box::new(self.user_id),
            Box::new(self.name.clone()),
            Box::new(self.location.clone()),
            Box::new(self.campsite_type),
            Box::new(self.description.clone()),
            Box::new(self.has_electricity),
            Box::new(self.has_water),
            Box::new(decimal_opt_param(self.cost_per_night)),
            Box::new(self.is_favorite),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for Campsite {
    type Dto = CampsiteDto;
    type Create = CreateCampsiteCommand;
    type Update = UpdateCampsiteCommand;

    fn from_create(cmd: CreateCampsiteCommand) -> Self {
        Campsite {
            campsite_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name: cmd.name,
            location: cmd.location,
            campsite_type: cmd.campsite_type,
            description: cmd.description,
            has_electricity: cmd.has_electricity,
            has_water: cmd.has_water,
            cost_per_night: cmd.cost_per_night,
            is_favorite: cmd.is_favorite,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateCampsiteCommand) -> Uuid {
        cmd.campsite_id
    }

    fn apply_update(&mut self, cmd: UpdateCampsiteCommand) {
        self.name = cmd.name;
        self.location = cmd.location;
        self.campsite_type = cmd.campsite_type;
        self.description = cmd.description;
        self.has_electricity = cmd.has_electricity;
        self.has_water = cmd.has_water;
        self.cost_per_night = cmd.cost_per_night;
        self.is_favorite = cmd.is_favorite;
    }

    fn to_dto(&self) -> CampsiteDto {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mountain_view() -> CreateCampsiteCommand {
        CreateCampsiteCommand {
            user_id: Uuid::nil(),
            name: "Mountain View Campground".to_string(),
            location: Some("Rocky Mountain National Park, Colorado".to_string()),
            campsite_type: CampsiteType::Tent,
            description: None,
            has_electricity: false,
            has_water: true,
            cost_per_night: Some(dec!(25.00)),
            is_favorite: true,
        }
    }

    #[test]
    fn test_valid_campsite() {
        assert!(mountain_view().validate().is_ok());
        let site = Campsite::from_create(mountain_view());
        assert_eq!(site.to_dto().campsite_type, CampsiteType::Tent);
    }

    #[test]
    fn test_name_and_cost_are_validated() {
        let mut cmd = mountain_view();
        cmd.name = "".to_string();
        cmd.cost_per_night = Some(dec!(-25));

        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "cost_per_night"]);
    }

    #[test]
    fn test_campsite_type_wire_names() {
        assert_eq!(serde_json::to_value(CampsiteType::Rv).unwrap(), "Rv");
        assert_eq!("Glamping".parse::<CampsiteType>(), Ok(CampsiteType::Glamping));
    }
}
