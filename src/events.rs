// 📣 Events - audit trail and topic publishing
//
// Two separate concerns share this module:
// - `Event` rows in the `events` table: every create/update/delete
// - `TopicExchange`: fire-and-forget messages for `<kind>.created`

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::debug;

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// One row of the audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let rows = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| {
            Ok(Event {
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .with_context(|| format!("Bad timestamp on event {}", event_id))?
                    .with_timezone(&Utc),
                data: serde_json::from_str(&data)
                    .with_context(|| format!("Bad payload on event {}", event_id))?,
                event_id,
                event_type,
                entity_type,
                entity_id,
                actor,
            })
        })
        .collect()
}

// ============================================================================
// TOPIC PUBLISHING
// ============================================================================

/// Where handlers send `<kind>.created` messages.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, routing_key: &str, payload: &serde_json::Value) -> Result<()>;
}

/// A message delivered to a bound receiver
#[derive(Debug, Clone)]
pub struct Message {
    pub routing_key: String,
    pub payload: serde_json::Value,
}

struct Binding {
    pattern: String,
    sender: Sender<Message>,
}

/// In-process topic exchange.
///
/// Routing keys are dot-separated words. In a binding pattern `*` matches
/// exactly one word and `#` matches zero or more words.
#[derive(Default)]
pub struct TopicExchange {
    bindings: RwLock<Vec<Binding>>,
}

impl TopicExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a pattern; every matching message is delivered to the returned receiver.
    pub fn bind(&self, pattern: &str) -> Receiver<Message> {
        let (sender, receiver) = channel();
        self.bindings.write().push(Binding {
            pattern: pattern.to_string(),
            sender,
        });
        receiver
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }
}

impl EventPublisher for TopicExchange {
    fn publish(&self, routing_key: &str, payload: &serde_json::Value) -> Result<()> {
        let mut bindings = self.bindings.write();

        let before = bindings.len();
        let mut delivered = 0;
        bindings.retain(|binding| {
            if !topic_matches(&binding.pattern, routing_key) {
                return true;
            }
            let message = Message {
                routing_key: routing_key.to_string(),
                payload: payload.clone(),
            };
            match binding.sender.send(message) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        let pruned = before - bindings.len();

        debug!(routing_key, delivered, pruned, "Published");

        if pruned > 0 {
            return Err(anyhow!(
                "{} subscriber(s) for {} disconnected",
                pruned,
                routing_key
            ));
        }
        Ok(())
    }
}

/// Match a routing key against a binding pattern (`*` = one word, `#` = any number).
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = if routing_key.is_empty() {
        Vec::new()
    } else {
        routing_key.split('.').collect()
    };
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((first, key_rest)) => (word == "*" || word == *first) && match_words(rest, key_rest),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use serde_json::json;

    #[test]
    fn test_event_log() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let event = Event::new(
            "created",
            "wine",
            "test_id_123",
            json!({"name": "Opus One"}),
            "api",
        );
        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "wine", "test_id_123").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "created");
        assert_eq!(events[0].actor, "api");
        assert_eq!(events[0].data["name"], "Opus One");

        assert!(get_events_for_entity(&conn, "wine", "other").unwrap().is_empty());
    }

    #[test]
    fn test_topic_patterns() {
        assert!(topic_matches("bill.created", "bill.created"));
        assert!(!topic_matches("bill.created", "wine.created"));

        assert!(topic_matches("*.created", "wine.created"));
        assert!(!topic_matches("*.created", "wine.red.created"));

        assert!(topic_matches("#", "reading.created"));
        assert!(topic_matches("wine.#", "wine"));
        assert!(topic_matches("wine.#", "wine.red.created"));
        assert!(topic_matches("#.created", "created"));
        assert!(!topic_matches("bill.*", "bill"));
    }

    #[test]
    fn test_publish_delivers_to_matching_bindings() {
        let exchange = TopicExchange::new();
        let all = exchange.bind("#");
        let wines = exchange.bind("wine.*");

        exchange.publish("bill.created", &json!({"id": 1})).unwrap();
        exchange.publish("wine.created", &json!({"id": 2})).unwrap();

        assert_eq!(all.try_iter().count(), 2);
        let wine_messages: Vec<Message> = wines.try_iter().collect();
        assert_eq!(wine_messages.len(), 1);
        assert_eq!(wine_messages[0].routing_key, "wine.created");
        assert_eq!(wine_messages[0].payload["id"], 2);
    }

    #[test]
    fn test_unrouted_message_is_dropped_silently() {
        let exchange = TopicExchange::new();
        assert!(exchange.publish("reading.created", &json!({})).is_ok());

        let _bills = exchange.bind("bill.*");
        assert!(exchange.publish("reading.created", &json!({})).is_ok());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let exchange = TopicExchange::new();
        let receiver = exchange.bind("#");
        drop(receiver);

        assert!(exchange.publish("wine.created", &json!({})).is_err());
        assert_eq!(exchange.binding_count(), 0);
        assert!(exchange.publish("wine.created", &json!({})).is_ok());
    }

    #[test]
    fn test_bindings_survive_a_panic_under_the_lock() {
        let exchange = TopicExchange::new();
        let before = exchange.bind("#");

        std::thread::scope(|scope| {
            let crashed = scope.spawn(|| {
                let _guard = exchange.bindings.write();
                panic!("subscriber crashed while holding the lock");
            });
            assert!(crashed.join().is_err());
        });

        let after = exchange.bind("wine.*");
        assert_eq!(exchange.binding_count(), 2);
        exchange.publish("wine.created", &json!({"id": 3})).unwrap();
        assert_eq!(before.try_iter().count(), 1);
        assert_eq!(after.try_iter().count(), 1);
    }
}
