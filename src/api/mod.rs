// 🌐 REST API - one router for every app
//
// `/api/<resource>` CRUD routes come from `crud::resource_routes`; the
// queries that are not plain CRUD live in `insights`.

mod crud;
mod error;
mod insights;

use std::sync::Arc;

use axum::Router;
use parking_lot::Mutex;
use rusqlite::Connection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::apps::anniversary::{Celebration, Gift, ImportantDate, Reminder};
use crate::apps::bills::{Bill, Payee, Payment};
use crate::apps::blood_pressure::{Reading, Trend};
use crate::apps::camping::{CampingTrip, Campsite, GearChecklist, Review};
use crate::apps::fuel::{EfficiencyReport, FillUp, Trip, Vehicle};
use crate::apps::real_estate::{CashFlow, Expense, Lease, Property};
use crate::apps::wine::{DrinkingWindow, TastingNote, Wine};
use crate::error::AppResult;
use crate::events::TopicExchange;
use crate::handler::Handlers;

pub use crud::resource_routes;

/// Recorded as the actor on audit events written through the API
pub const API_ACTOR: &str = "api";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub exchange: Arc<TopicExchange>,
}

impl AppState {
    pub fn new(conn: Connection, exchange: Arc<TopicExchange>) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            exchange,
        }
    }

    /// Run one unit of work against the store. The lock does not poison, so a
    /// panic inside `f` leaves the connection usable for the next request.
    pub fn run<T>(&self, f: impl FnOnce(&Handlers<'_>) -> AppResult<T>) -> AppResult<T> {
        let conn = self.db.lock();
        let handlers = Handlers::new(&conn, self.exchange.as_ref(), API_ACTOR);
        f(&handlers)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(insights::routes())
        // AnniversaryBirthdayReminder
        .merge(resource_routes::<ImportantDate>("/api/important-dates"))
        .merge(resource_routes::<Gift>("/api/gifts"))
        .merge(resource_routes::<Celebration>("/api/celebrations"))
        .merge(resource_routes::<Reminder>("/api/reminders"))
        // BillPaymentScheduler
        .merge(resource_routes::<Payee>("/api/payees"))
        .merge(resource_routes::<Bill>("/api/bills"))
        .merge(resource_routes::<Payment>("/api/payments"))
        // BloodPressureMonitor
        .merge(resource_routes::<Reading>("/api/readings"))
        .merge(resource_routes::<Trend>("/api/trends"))
        // FuelEconomyTracker
        .merge(resource_routes::<Vehicle>("/api/vehicles"))
        .merge(resource_routes::<FillUp>("/api/fill-ups"))
        .merge(resource_routes::<EfficiencyReport>("/api/efficiency-reports"))
        .merge(resource_routes::<Trip>("/api/trips"))
        // WineCellarInventory
        .merge(resource_routes::<Wine>("/api/wines"))
        .merge(resource_routes::<TastingNote>("/api/tasting-notes"))
        .merge(resource_routes::<DrinkingWindow>("/api/drinking-windows"))
        // RealEstateInvestmentAnalyzer
        .merge(resource_routes::<Property>("/api/properties"))
        .merge(resource_routes::<Expense>("/api/expenses"))
        .merge(resource_routes::<Lease>("/api/leases"))
        .merge(resource_routes::<CashFlow>("/api/cash-flows"))
        // CampingTripPlanner
        .merge(resource_routes::<Campsite>("/api/campsites"))
        .merge(resource_routes::<CampingTrip>("/api/camping-trips"))
        .merge(resource_routes::<GearChecklist>("/api/gear-checklists"))
        .merge(resource_routes::<Review>("/api/reviews"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
