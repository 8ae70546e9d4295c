// 🧭 Handlers - one command or query, one unit of work
//
// Every resource shares the same five handlers. A resource only declares how
// its commands become an entity and how the entity becomes a DTO.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{get_events_for_entity, insert_event, Event, EventPublisher};
use crate::store::{self, ListFilter, Record};
use crate::validation::Validate;

/// An entity exposed through the CRUD handlers.
pub trait Resource: Record {
    type Dto: Serialize;
    type Create: Validate + DeserializeOwned;
    type Update: Validate + DeserializeOwned;

    /// Routing key published after a successful create
    const CREATED_TOPIC: Option<&'static str> = None;

    fn from_create(cmd: Self::Create) -> Self;

    fn update_id(cmd: &Self::Update) -> Uuid;

    fn apply_update(&mut self, cmd: Self::Update);

    fn to_dto(&self) -> Self::Dto;

    /// Recompute derived fields right before insert/update.
    fn before_save(&mut self, _conn: &Connection) -> AppResult<()> {
        Ok(())
    }
}

/// Store handle, publisher, and who is acting, for one request.
pub struct Handlers<'a> {
    pub conn: &'a Connection,
    pub publisher: &'a dyn EventPublisher,
    pub actor: &'a str,
}

impl<'a> Handlers<'a> {
    pub fn new(conn: &'a Connection, publisher: &'a dyn EventPublisher, actor: &'a str) -> Self {
        Handlers {
            conn,
            publisher,
            actor,
        }
    }

    pub fn get_all<R: Resource>(&self, filter: &ListFilter) -> AppResult<Vec<R::Dto>> {
        if filter.user_id.is_some() && R::OWNER_COLUMN.is_none() {
            return Err(AppError::invalid(R::KIND, "user_id", "Not filterable by user"));
        }
        if filter.parent_id.is_some() && R::PARENT.is_none() {
            return Err(AppError::invalid(R::KIND, "parent_id", "Not filterable by parent"));
        }

        let records = store::list_by::<R>(self.conn, filter)?;
        Ok(records.iter().map(R::to_dto).collect())
    }

    pub fn get_by_id<R: Resource>(&self, id: Uuid) -> AppResult<Option<R::Dto>> {
        Ok(store::find::<R>(self.conn, id)?.map(|record| record.to_dto()))
    }

    pub fn create<R: Resource>(&self, cmd: R::Create) -> AppResult<R::Dto> {
        self.create_record::<R>(cmd).map(|record| record.to_dto())
    }

    /// `create`, returning the stored entity instead of its DTO
    pub fn create_record<R: Resource>(&self, cmd: R::Create) -> AppResult<R> {
        cmd.validate()?;
        let mut record = R::from_create(cmd);

        let tx = self.conn.unchecked_transaction()?;
        self.require_parent(&record)?;
        record.before_save(&tx)?;
        store::insert(&tx, &record)?;

        let dto = record.to_dto();
        let payload = serde_json::to_value(&dto).map_err(anyhow::Error::from)?;
        self.audit::<R>(&tx, "created", record.id(), payload.clone())?;
        tx.commit()?;

        info!(kind = R::KIND, id = %record.id(), "Created");

        if let Some(topic) = R::CREATED_TOPIC {
            // Fire and forget: the record is already committed
            if let Err(e) = self.publisher.publish(topic, &payload) {
                warn!(topic, id = %record.id(), error = %e, "Failed to publish event");
            }
        }

        Ok(record)
    }

    /// `Ok(None)` when no entity has `id`.
    pub fn update<R: Resource>(&self, id: Uuid, cmd: R::Update) -> AppResult<Option<R::Dto>> {
        let body_id = R::update_id(&cmd);
        if body_id != id {
            return Err(AppError::IdMismatch { route: id, body: body_id });
        }
        cmd.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let Some(mut record) = store::find::<R>(&tx, id)? else {
            debug!(kind = R::KIND, %id, "Update target not found");
            return Ok(None);
        };

        record.apply_update(cmd);
        self.require_parent(&record)?;
        record.before_save(&tx)?;
        store::update(&tx, &record)?;

        let dto = record.to_dto();
        let payload = serde_json::to_value(&dto).map_err(anyhow::Error::from)?;
        self.audit::<R>(&tx, "updated", id, payload)?;
        tx.commit()?;

        info!(kind = R::KIND, %id, "Updated");
        Ok(Some(dto))
    }

    /// `Ok(false)` when nothing was deleted.
    pub fn delete<R: Resource>(&self, id: Uuid) -> AppResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = store::delete::<R>(&tx, id)?;
        if removed {
            self.audit::<R>(&tx, "deleted", id, serde_json::Value::Null)?;
        }
        tx.commit()?;

        if removed {
            info!(kind = R::KIND, %id, "Deleted");
        }
        Ok(removed)
    }

    /// Audit trail for any entity kind, newest first
    pub fn history(&self, kind: &str, id: Uuid) -> AppResult<Vec<Event>> {
        Ok(get_events_for_entity(self.conn, kind, &id.to_string())?)
    }

    fn require_parent<R: Resource>(&self, record: &R) -> AppResult<()> {
        if let (Some(parent), Some(parent_id)) = (R::PARENT, record.parent_id()) {
            if !store::parent_exists(self.conn, &parent, parent_id)? {
                return Err(AppError::NotFound {
                    kind: parent.kind,
                    id: parent_id,
                });
            }
        }
        Ok(())
    }

    fn audit<R: Resource>(
        &self,
        conn: &Connection,
        event_type: &str,
        id: Uuid,
        data: serde_json::Value,
    ) -> AppResult<()> {
        let event = Event::new(event_type, R::KIND, &id.to_string(), data, self.actor);
        insert_event(conn, &event)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::real_estate::{
        CreateExpenseCommand, CreatePropertyCommand, Expense, Property, PropertyType,
        UpdatePropertyCommand,
    };
    use crate::apps::wine::{CreateWineCommand, Region, Wine, WineType};
    use crate::db::setup_database;
    use crate::events::TopicExchange;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn property_cmd(user_id: Uuid) -> CreatePropertyCommand {
        CreatePropertyCommand {
            user_id,
            address: "123 Main St".to_string(),
            property_type: PropertyType::SingleFamily,
            purchase_price: dec!(250000),
            purchase_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            current_value: dec!(310000),
            square_feet: 1800,
            bedrooms: 3,
            bathrooms: 2,
            notes: None,
        }
    }

    #[test]
    fn test_create_then_get_returns_same_values() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");

        let created = handlers.create::<Property>(property_cmd(Uuid::new_v4())).unwrap();
        let fetched = handlers.get_by_id::<Property>(created.property_id).unwrap().unwrap();

        assert_eq!(fetched.address, "123 Main St");
        assert_eq!(fetched.purchase_price, dec!(250000));
        assert_eq!(fetched.equity, dec!(60000));
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[test]
    fn test_create_rejects_invalid_command() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");

        let mut cmd = property_cmd(Uuid::new_v4());
        cmd.address = "  ".to_string();
        let err = handlers.create::<Property>(cmd).unwrap_err();

        assert!(matches!(err, AppError::Validation(ref errors) if errors[0].field == "address"));
        assert_eq!(store::count::<Property>(&conn).unwrap(), 0);
    }

    #[test]
    fn test_create_child_requires_parent() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");

        let missing = Uuid::new_v4();
        let err = handlers
            .create::<Expense>(CreateExpenseCommand {
                property_id: missing,
                description: "Roof repair".to_string(),
                amount: dec!(8000),
                date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
                category: "Repairs".to_string(),
                is_recurring: false,
                notes: None,
            })
            .unwrap_err();

        match err {
            AppError::NotFound { kind, id } => {
                assert_eq!(kind, "property");
                assert_eq!(id, missing);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_update_checks_route_id_and_existence() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let created = handlers.create::<Property>(property_cmd(Uuid::new_v4())).unwrap();

        let update = |property_id| UpdatePropertyCommand {
            property_id,
            address: "9 Elm St".to_string(),
            property_type: PropertyType::Condo,
            purchase_price: dec!(250000),
            purchase_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            current_value: dec!(240000),
            square_feet: 900,
            bedrooms: 2,
            bathrooms: 1,
            notes: Some("Converted".to_string()),
        };

        let mismatch = handlers
            .update::<Property>(created.property_id, update(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(mismatch, AppError::IdMismatch { .. }));

        let absent = Uuid::new_v4();
        assert!(handlers.update::<Property>(absent, update(absent)).unwrap().is_none());

        let updated = handlers
            .update::<Property>(created.property_id, update(created.property_id))
            .unwrap()
            .unwrap();
        assert_eq!(updated.address, "9 Elm St");
        assert_eq!(updated.equity, dec!(-10000));
        assert_eq!(updated.user_id, created.user_id);
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let created = handlers.create::<Property>(property_cmd(Uuid::new_v4())).unwrap();

        assert!(handlers.delete::<Property>(created.property_id).unwrap());
        assert!(handlers.get_by_id::<Property>(created.property_id).unwrap().is_none());
        assert!(!handlers.delete::<Property>(created.property_id).unwrap());
    }

    #[test]
    fn test_get_all_filters_by_owner() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let alice = Uuid::new_v4();
        handlers.create::<Property>(property_cmd(alice)).unwrap();
        handlers.create::<Property>(property_cmd(Uuid::new_v4())).unwrap();

        let all = handlers.get_all::<Property>(&ListFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let mine = handlers
            .get_all::<Property>(&ListFilter {
                user_id: Some(alice),
                parent_id: None,
            })
            .unwrap();
        assert_eq!(mine.len(), 1);

        let err = handlers
            .get_all::<Property>(&ListFilter {
                user_id: None,
                parent_id: Some(alice),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_every_change_is_audited() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let handlers = Handlers::new(&conn, &exchange, "test");
        let created = handlers.create::<Property>(property_cmd(Uuid::new_v4())).unwrap();
        handlers.delete::<Property>(created.property_id).unwrap();

        let history = handlers.history("property", created.property_id).unwrap();
        let types: Vec<&str> = history.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["deleted", "created"]);
        assert_eq!(history[1].actor, "test");
        assert_eq!(history[1].data["address"], "123 Main St");
    }

    #[test]
    fn test_create_publishes_topic_once() {
        let conn = setup();
        let exchange = TopicExchange::new();
        let receiver = exchange.bind("wine.created");
        let handlers = Handlers::new(&conn, &exchange, "test");

        let dto = handlers
            .create::<Wine>(CreateWineCommand {
                user_id: Uuid::new_v4(),
                name: "Château Margaux".to_string(),
                wine_type: WineType::Red,
                region: Region::Bordeaux,
                vintage: Some(2015),
                producer: None,
                purchase_price: Some(dec!(450)),
                bottle_count: 2,
                storage_location: None,
                notes: None,
            })
            .unwrap();

        let messages: Vec<_> = receiver.try_iter().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload["wine_id"], dto.wine_id.to_string());
    }

    #[test]
    fn test_publish_failure_does_not_fail_create() {
        let conn = setup();
        let exchange = TopicExchange::new();
        drop(exchange.bind("#"));
        let handlers = Handlers::new(&conn, &exchange, "test");

        let result = handlers.create::<Wine>(CreateWineCommand {
            user_id: Uuid::new_v4(),
            name: "Barolo Riserva".to_string(),
            wine_type: WineType::Red,
            region: Region::Barolo,
            vintage: None,
            producer: None,
            purchase_price: None,
            bottle_count: 1,
            storage_location: None,
            notes: None,
        });

        assert!(result.is_ok());
        assert_eq!(store::count::<Wine>(&conn).unwrap(), 1);
    }
}
