use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handler::{Handlers, Resource};
use crate::store::{self, Parent, Record};
use crate::validation::{Validate, ValidationResult, Validator};

use super::CAMPING_TRIP_PARENT;

/// One item to pack for a trip
#[derive(Debug, Clone, PartialEq)]
pub struct GearChecklist {
    pub gear_checklist_id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub item_name: String,
    pub is_packed: bool,
    pub quantity: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GearChecklist {
    pub fn toggle_packed(&mut self) -> bool {
        self.is_packed = !self.is_packed;
        self.is_packed
    }
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGearChecklistCommand {
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub item_name: String,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGearChecklistCommand {
    pub gear_checklist_id: Uuid,
    pub item_name: String,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_fields(item_name: &str, quantity: i32, notes: Option<&str>) -> ValidationResult {
    Validator::new("GearChecklist")
        .required("item_name", item_name)
        .max_len("item_name", item_name, 200)
        .range("quantity", quantity, 1, 1000)
        .max_len_opt("notes", notes, 500)
        .finish()
}

impl Validate for CreateGearChecklistCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.item_name, self.quantity, self.notes.as_deref())
    }
}

impl Validate for UpdateGearChecklistCommand {
    fn validate(&self) -> ValidationResult {
        validate_fields(&self.item_name, self.quantity, self.notes.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearChecklistDto {
    pub gear_checklist_id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub item_name: String,
    pub is_packed: bool,
    pub quantity: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&GearChecklist> for GearChecklistDto {
    fn from(g: &GearChecklist) -> Self {
        GearChecklistDto {
            gear_checklist_id: g.gear_checklist_id,
            user_id: g.user_id,
            trip_id: g.trip_id,
            item_name: g.item_name.clone(),
            is_packed: g.is_packed,
            quantity: g.quantity,
            notes: g.notes.clone(),
            created_at: g.created_at,
        }
    }
}

impl Record for GearChecklist {
    const TABLE: &'static str = "gear_checklists";
    const KIND: &'static str = "gear_checklist";
    const COLUMNS: &'static [&'static str] = &[
        "gear_checklist_id",
        "user_id",
        "trip_id",
        "item_name",
        "is_packed",
        "quantity",
        "notes",
        "created_at",
    ];
    const ORDER_BY: &'static str = "item_name";
    const PARENT: Option<Parent> = Some(CAMPING_TRIP_PARENT);
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");

    fn id(&self) -> Uuid {
        self.gear_checklist_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.trip_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(GearChecklist {
            gear_checklist_id: row.get(0)?,
            user_id: row.get(1)?,
            trip_id: row.get(2)?,
            item_name: row.get(3)?,
            is_packed: row.get(4)?,
            quantity: row.get(5)?,
            notes: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.gear_checklist_id),
            Box::new(self.user_id),
            Box::new(self.trip_id),
            Box::new(self.item_name.clone()),
            Box::new(self.is_packed),
            Box::new(self.quantity),
            Box::new(self.notes.clone()),
            Box::new(self.created_at),
        ]
    }
}

impl Resource for GearChecklist {
    type Dto = GearChecklistDto;
    type Create = CreateGearChecklistCommand;
    type Update = UpdateGearChecklistCommand;

    fn from_create(cmd: CreateGearChecklistCommand) -> Self {
        GearChecklist {
            gear_checklist_id: Uuid::new_v4(),
            user_id: cmd.user_id,
            trip_id: cmd.trip_id,
            item_name: cmd.item_name,
            is_packed: cmd.is_packed,
            quantity: cmd.quantity,
            notes: cmd.notes,
            created_at: Utc::now(),
        }
    }

    fn update_id(cmd: &UpdateGearChecklistCommand) -> Uuid {
        cmd.gear_checklist_id
    }

    fn apply_update(&mut self, cmd: UpdateGearChecklistCommand) {
        self.item_name = cmd.item_name;
        self.is_packed = cmd.is_packed;
        self.quantity = cmd.quantity;
        self.notes = cmd.notes;
    }

    fn to_dto(&self) -> GearChecklistDto {
        self.into()
    }
}

/// Flip an item between packed and unpacked. `Ok(None)` when it does not exist.
pub fn toggle_packed(handlers: &Handlers<'_>, gear_checklist_id: Uuid) -> AppResult<Option<GearChecklistDto>> {
    let Some(mut item) = store::find::<GearChecklist>(handlers.conn, gear_checklist_id)? else {
        return Ok(None);
    };
    item.toggle_packed();

    let update = UpdateGearChecklistCommand {
        gear_checklist_id,
        item_name: item.item_name,
        is_packed: item.is_packed,
        quantity: item.quantity,
        notes: item.notes,
    };
    handlers.update::<GearChecklist>(gear_checklist_id, update)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tent() -> CreateGearChecklistCommand {
        CreateGearChecklistCommand {
            user_id: Uuid::nil(),
            trip_id: Uuid::nil(),
            item_name: "Tent".to_string(),
            is_packed: false,
            quantity: 1,
            notes: Some("4-person tent".to_string()),
        }
    }

    #[test]
    fn test_toggle_packed() {
        let mut item = GearChecklist::from_create(tent());
        assert!(item.toggle_packed());
        assert!(!item.toggle_packed());
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let json = serde_json::json!({
            "user_id": Uuid::nil(),
            "trip_id": Uuid::nil(),
            "item_name": "Lantern"
        });
        let cmd: CreateGearChecklistCommand = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.quantity, 1);
        assert!(!cmd.is_packed);
    }

    #[test]
    fn test_validation() {
        let mut cmd = tent();
        cmd.item_name = "  ".to_string();
        cmd.quantity = 0;

        let errors = cmd.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["item_name", "quantity"]);
    }
}
