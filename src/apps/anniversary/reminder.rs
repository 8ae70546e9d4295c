use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handler::Resource;
use crate::store::{self, Parent, Record};
use crate::text_enum;
use crate::validation::{Validate, ValidationResult, Validator};

use super::IMPORTANT_DATE_PARENT;

text_enum! {
    pub enum DeliveryChannel { Email, Sms, Push }
}

text_enum! {
    pub enum ReminderStatus { Scheduled, Sent, Dismissed }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub reminder_id: Uuid,
    pub important_date_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub advance_notice_days: i32,
    pub delivery_channel: DeliveryChannel,
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.status = ReminderStatus::Sent;
        self.sent_at = Some(at);
    }

    /// Still scheduled and its time has come
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Scheduled && self.scheduled_time <= now
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderCommand {
    pub important_date_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub advance_notice_days: i32,
    pub delivery_channel: DeliveryChannel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReminderCommand {
    pub reminder_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub advance_notice_days: i32,
    pub delivery_channel: DeliveryChannel,
    pub status: ReminderStatus,
}

impl Validate for CreateReminderCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Reminder")
            .range("advance_notice_days", self.advance_notice_days, 0, 365)
            .finish()
    }
}

impl Validate for UpdateReminderCommand {
    fn validate(&self) -> ValidationResult {
        Validator::new("Reminder")
            .range("advance_notice_days", self.advance_notice_days, 0, 365)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderDto {
    pub reminder_id: Uuid,
    pub important_date_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub advance_notice_days: i32,
    pub delivery_channel: DeliveryChannel,
    pub status: ReminderStatus,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<&Reminder> for ReminderDto {
    fn from(r: &Reminder) -> Self {
        ReminderDto {
            reminder_id: r.reminder_id,
            important_date_id: r.important_date_id,
            scheduled_time: r.scheduled_time,
            advance_notice_days: r.advance_notice_days,
            delivery_channel: r.delivery_channel,
            status: r.status,
            sent_at: r.sent_at,
        }
    }
}

impl Record for Reminder {
    const TABLE: &'static str = "reminders";
    const KIND: &'static str = "reminder";
    const COLUMNS: &'static [&'static str] = &[
        "reminder_id",
        "important_date_id",
        "scheduled_time",
        "advance_notice_days",
        "delivery_channel",
        "status",
        "sent_at",
    ];
    const ORDER_BY: &'static str = "scheduled_time";
    const PARENT: Option<Parent> = Some(IMPORTANT_DATE_PARENT);

    fn id(&self) -> Uuid {
        self.reminder_id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.important_date_id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Reminder {
            reminder_id: row.get(0)?,
            important_date_id: row.get(1)?,
            scheduled_time: row.get(2)?,
            advance_notice_days: row.get(3)?,
            delivery_channel: row.get(4)?,
            status: row.get(5)?,
            sent_at: row.get(6)?,
        })
    }

    fn to_params(&self) -> Vec<Box<dyn ToSql>> {
        vec![
            Box::new(self.reminder_id),
            Box::new(self.important_date_id),
            Box::new(self.scheduled_time),
            Box::new(self.advance_notice_days),
            Box::new(self.delivery_channel),
            Box::new(self.status),
            Box::new(self.sent_at),
        ]
    }
}

impl Resource for Reminder {
    type Dto = ReminderDto;
    type Create = CreateReminderCommand;
    type Update = UpdateReminderCommand;

    fn from_create(cmd: CreateReminderCommand) -> Self {
        Reminder {
            reminder_id: Uuid::new_v4(),
            important_date_id: cmd.important_date_id,
            scheduled_time: cmd.scheduled_time,
            advance_notice_days: cmd.advance_notice_days,
            delivery_channel: cmd.delivery_channel,
            status: ReminderStatus::Scheduled,
            sent_at: None,
        }
    }

    fn update_id(cmd: &UpdateReminderCommand) -> Uuid {
        cmd.reminder_id
    }

    fn apply_update(&mut self, cmd: UpdateReminderCommand) {
        self.scheduled_time = cmd.scheduled_time;
        self.advance_notice_days = cmd.advance_notice_days;
        self.delivery_channel = cmd.delivery_channel;

        match cmd.status {
            ReminderStatus::Sent if self.status != ReminderStatus::Sent => self.mark_sent(Utc::now()),
            ReminderStatus::Sent => {}
            status => {
                self.status = status;
                self.sent_at = None;
            }
        }
    }

    fn to_dto(&self) -> ReminderDto {
        self.into()
    }
}

/// Scheduled reminders whose time has come, earliest first.
pub fn due_reminders(conn: &Connection, now: DateTime<Utc>) -> AppResult<Vec<ReminderDto>> {
    Ok(store::list::<Reminder>(conn)?
        .iter()
        .filter(|r| r.is_due(now))
        .map(ReminderDto::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reminder(at: DateTime<Utc>) -> Reminder {
        Reminder::from_create(CreateReminderCommand {
            important_date_id: Uuid::new_v4(),
            scheduled_time: at,
            advance_notice_days: 7,
            delivery_channel: DeliveryChannel::Email,
        })
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        assert!(reminder(now - Duration::hours(1)).is_due(now));
        assert!(reminder(now).is_due(now));
        assert!(!reminder(now + Duration::hours(1)).is_due(now));

        let mut sent = reminder(now - Duration::hours(1));
        sent.mark_sent(now);
        assert!(!sent.is_due(now));
        assert_eq!(sent.sent_at, Some(now));
    }

    #[test]
    fn test_update_to_sent_stamps_once() {
        let mut r = reminder(Utc::now());
        let cmd = |status| UpdateReminderCommand {
            reminder_id: r.reminder_id,
            scheduled_time: r.scheduled_time,
            advance_notice_days: 7,
            delivery_channel: DeliveryChannel::Push,
            status,
        };
        let first = cmd(ReminderStatus::Sent);
        let again = cmd(ReminderStatus::Sent);
        let back = cmd(ReminderStatus::Scheduled);

        r.apply_update(first);
        let stamped = r.sent_at;
        assert!(stamped.is_some());
        assert_eq!(r.delivery_channel, DeliveryChannel::Push);

        r.apply_update(again);
        assert_eq!(r.sent_at, stamped);

        r.apply_update(back);
        assert_eq!(r.status, ReminderStatus::Scheduled);
        assert!(r.sent_at.is_none());
    }

    #[test]
    fn test_advance_notice_range() {
        let cmd = CreateReminderCommand {
            important_date_id: Uuid::new_v4(),
            scheduled_time: Utc::now(),
            advance_notice_days: 400,
            delivery_channel: DeliveryChannel::Sms,
        };
        assert_eq!(cmd.validate().unwrap_err()[0].field, "advance_notice_days");
    }

    #[test]
    fn test_due_reminders_query() {
        use crate::apps::anniversary::{CreateImportantDateCommand, DateType, ImportantDate, RecurrencePattern};
        use crate::db::setup_database;
        use crate::events::TopicExchange;
        use crate::handler::Handlers;

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let exchange = TopicExchange::new();
        let h = Handlers::new(&conn, &exchange, "test");
        let date = h
            .create::<ImportantDate>(CreateImportantDateCommand {
                user_id: Uuid::new_v4(),
                person_name: "John Smith".to_string(),
                date_type: DateType::Birthday,
                date_value: chrono::NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
                recurrence_pattern: RecurrencePattern::Annual,
                relationship: None,
                notes: None,
            })
            .unwrap();

        let now = Utc::now();
        let schedule = |at| CreateReminderCommand {
            important_date_id: date.important_date_id,
            scheduled_time: at,
            advance_notice_days: 7,
            delivery_channel: DeliveryChannel::Email,
        };
        let overdue = h.create::<Reminder>(schedule(now - Duration::days(2))).unwrap();
        let due = h.create::<Reminder>(schedule(now - Duration::hours(1))).unwrap();
        h.create::<Reminder>(schedule(now + Duration::days(3))).unwrap();

        let found = due_reminders(&conn, now).unwrap();
        let ids: Vec<Uuid> = found.iter().map(|r| r.reminder_id).collect();
        assert_eq!(ids, vec![overdue.reminder_id, due.reminder_id]);
    }
}
