// Homebase - Core Library
// Personal tracker apps sharing one store, one handler layer, and one API

pub mod apps;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handler;
pub mod import;
pub mod logging;
pub mod seed;
pub mod store;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{open_database, setup_database, table_counts};
pub use error::{AppError, AppResult, ConfigError};
pub use events::{get_events_for_entity, insert_event, Event, EventPublisher, Message, TopicExchange};
pub use handler::{Handlers, Resource};
pub use import::{import_fill_ups, import_readings, ImportSummary};
pub use logging::LogFormat;
pub use seed::{seed_all, SeedSummary, SAMPLE_USER_ID};
pub use store::{ListFilter, Record};
pub use validation::{Validate, ValidationError, ValidationResult, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
