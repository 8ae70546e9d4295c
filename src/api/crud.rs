// Generic list/get/create/update/delete routes for any `Resource`

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::handler::Resource;
use crate::store::ListFilter;

/// `GET/POST {base}` and `GET/PUT/DELETE {base}/:id`
pub fn resource_routes<R>(base: &'static str) -> axum::Router<AppState>
where
    R: Resource + Send + 'static,
    R::Dto: Send,
    R::Create: Send,
    R::Update: Send,
{
    Router::new()
        .route(
            base,
            get(list::<R>).post(move |state: State<AppState>, body: Json<R::Create>| {
                create::<R>(state, body, base)
            }),
        )
        .route(
            &format!("{}/:id", base),
            get(get_one::<R>).put(update::<R>).delete(delete::<R>),
        )
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Json<Vec<R::Dto>>> {
    state.run(|h| h.get_all::<R>(&filter)).map(Json)
}

async fn get_one<R: Resource>(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<R::Dto>> {
    state
        .run(|h| h.get_by_id::<R>(id))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: R::KIND, id })
}

async fn create<R: Resource>(
    State(state): State<AppState>,
    Json(cmd): Json<R::Create>,
    base: &'static str,
) -> AppResult<impl IntoResponse> {
    let record = state.run(|h| h.create_record::<R>(cmd))?;
    let location = format!("{}/{}", base, record.id());
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(record.to_dto())))
}

async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(cmd): Json<R::Update>,
) -> AppResult<Json<R::Dto>> {
    state
        .run(|h| h.update::<R>(id, cmd))?
        .map(Json)
        .ok_or(AppError::NotFound { kind: R::KIND, id })
}

async fn delete<R: Resource>(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.run(|h| h.delete::<R>(id))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound { kind: R::KIND, id })
    }
}
