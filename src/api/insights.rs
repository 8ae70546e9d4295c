// Queries and actions beyond plain CRUD

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::apps::anniversary::{self, ReminderDto, UpcomingDateDto};
use crate::apps::bills::{self, OverdueBillDto};
use crate::apps::blood_pressure::{self, GenerateTrendCommand};
use crate::apps::camping::{self, GearChecklistDto, TripPlan};
use crate::apps::fuel::{self, GenerateReportCommand, VehicleMpgDto};
use crate::apps::real_estate::{self, LeaseDto, PropertyAnalysis};
use crate::apps::wine::{self, CellarSummary, ConsumeWineCommand, WineDto};
use crate::error::{AppError, AppResult};
use crate::events::Event;

const DEFAULT_UPCOMING_DAYS: i64 = 30;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/important-dates/upcoming", get(upcoming_dates))
        .route("/api/reminders/due", get(due_reminders))
        .route("/api/bills/overdue", get(overdue_bills))
        .route("/api/trends/generate", post(generate_trend))
        .route("/api/vehicles/:id/mpg", get(vehicle_mpg))
        .route("/api/efficiency-reports/generate", post(generate_report))
        .route("/api/wines/summary", get(cellar_summary))
        .route("/api/wines/:id/consume", post(consume_wine))
        .route("/api/properties/:id/analysis", get(property_analysis))
        .route("/api/leases/:id/terminate", post(terminate_lease))
        .route("/api/camping-trips/:id/plan", get(trip_plan))
        .route("/api/gear-checklists/:id/toggle", post(toggle_gear))
        .route("/api/events/:kind/:id", get(history))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}

fn current_date() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Deserialize)]
struct UpcomingQuery {
    user_id: Option<Uuid>,
    days: Option<i64>,
    today: Option<NaiveDate>,
}

async fn upcoming_dates(
    State(state): State<AppState>,
    Query(q): Query<UpcomingQuery>,
) -> AppResult<Json<Vec<UpcomingDateDto>>> {
    let days = q.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    if days < 0 {
        return Err(AppError::invalid("ImportantDate", "days", "Must not be negative"));
    }
    let today = q.today.unwrap_or_else(current_date);
    state
        .run(|h| anniversary::upcoming(h.conn, q.user_id, today, days))
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct DueQuery {
    now: Option<DateTime<Utc>>,
}

async fn due_reminders(
    State(state): State<AppState>,
    Query(q): Query<DueQuery>,
) -> AppResult<Json<Vec<ReminderDto>>> {
    let now = q.now.unwrap_or_else(Utc::now);
    state.run(|h| anniversary::due_reminders(h.conn, now)).map(Json)
}

#[derive(Debug, Deserialize)]
struct OverdueQuery {
    user_id: Option<Uuid>,
    today: Option<NaiveDate>,
}

async fn overdue_bills(
    State(state): State<AppState>,
    Query(q): Query<OverdueQuery>,
) -> AppResult<Json<Vec<OverdueBillDto>>> {
    let today = q.today.unwrap_or_else(current_date);
    state
        .run(|h| bills::overdue_bills(h.conn, q.user_id, today))
        .map(Json)
}

async fn generate_trend(
    State(state): State<AppState>,
    Json(cmd): Json<GenerateTrendCommand>,
) -> AppResult<impl IntoResponse> {
    let trend = state.run(|h| blood_pressure::generate(h, cmd))?;
    let location = format!("/api/trends/{}", trend.trend_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(trend)))
}

async fn vehicle_mpg(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<VehicleMpgDto>> {
    state
        .run(|h| fuel::vehicle_mpg(h.conn, id))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "vehicle", id })
}

async fn generate_report(
    State(state): State<AppState>,
    Json(cmd): Json<GenerateReportCommand>,
) -> AppResult<impl IntoResponse> {
    let report = state.run(|h| fuel::generate(h, cmd))?;
    let location = format!("/api/efficiency-reports/{}", report.efficiency_report_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(report)))
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    user_id: Option<Uuid>,
}

async fn cellar_summary(
    State(state): State<AppState>,
    Query(q): Query<OwnerQuery>,
) -> AppResult<Json<CellarSummary>> {
    state.run(|h| wine::cellar_summary(h.conn, q.user_id)).map(Json)
}

async fn consume_wine(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(cmd): Json<ConsumeWineCommand>,
) -> AppResult<Json<WineDto>> {
    state
        .run(|h| wine::consume(h, id, cmd))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "wine", id })
}

#[derive(Debug, Deserialize)]
struct AsOfQuery {
    today: Option<NaiveDate>,
}

async fn property_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<AsOfQuery>,
) -> AppResult<Json<PropertyAnalysis>> {
    let today = q.today.unwrap_or_else(current_date);
    state
        .run(|h| real_estate::analyze(h.conn, id, today))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "property", id })
}

async fn terminate_lease(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<LeaseDto>> {
    state
        .run(|h| real_estate::terminate(h, id))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "lease", id })
}

async fn trip_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<AsOfQuery>,
) -> AppResult<Json<TripPlan>> {
    let today = q.today.unwrap_or_else(current_date);
    state
        .run(|h| camping::trip_plan(h.conn, id, today))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "camping_trip", id })
}

async fn toggle_gear(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<GearChecklistDto>> {
    state
        .run(|h| camping::toggle_packed(h, id))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: "gear_checklist", id })
}

/// Audit trail of one entity, newest first
async fn history(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> AppResult<Json<Vec<Event>>> {
    state.run(|h| h.history(&kind, id)).map(Json)
}
