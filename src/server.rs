use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, error, info};
use std::sync::Arc;

use crate::config::{SchedulerSettings, ServerSettings};
use crate::error::TimetableError;
use crate::pipeline::{self, RegenerationSummary, Snapshot};
use crate::projector::{EntityTimetable, FullTimetable};
use crate::store::TimetableStore;
use crate::validator::{BatchReport, ClassroomReport, FacultyReport, ValidationReport};

pub struct AppState {
    pub store: Arc<dyn TimetableStore>,
    pub settings: SchedulerSettings,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn error_response(e: TimetableError) -> (StatusCode, String) {
    let status = match &e {
        TimetableError::Fetch(_) => StatusCode::SERVICE_UNAVAILABLE,
        TimetableError::NotFound { .. } => StatusCode::NOT_FOUND,
        TimetableError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status != StatusCode::NOT_FOUND {
        error!("Request failed: {}", e);
    }
    (status, e.to_string())
}

fn snapshot(state: &AppState) -> Result<Snapshot, (StatusCode, String)> {
    let mut rng = rand::rng();
    let snapshot =
        Snapshot::load(state.store.as_ref(), &state.settings, &mut rng).map_err(error_response)?;
    debug!(
        "Serving {} slots ({}).",
        snapshot.slots.len(),
        if snapshot.persisted { "persisted" } else { "ephemeral" }
    );
    Ok(snapshot)
}

async fn regenerate_handler(State(state): State<Arc<AppState>>) -> ApiResult<RegenerationSummary> {
    let mut rng = rand::rng();
    pipeline::regenerate(state.store.as_ref(), &state.settings, &mut rng)
        .map(Json)
        .map_err(error_response)
}

async fn validate_handler(State(state): State<Arc<AppState>>) -> ApiResult<ValidationReport> {
    pipeline::validate_persisted(state.store.as_ref(), &state.settings)
        .map(Json)
        .map_err(error_response)
}

async fn timetable_handler(State(state): State<Arc<AppState>>) -> ApiResult<FullTimetable> {
    let snapshot = snapshot(&state)?;
    snapshot
        .projector(&state.settings)
        .all()
        .map(Json)
        .map_err(error_response)
}

async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<EntityTimetable<BatchReport>> {
    let snapshot = snapshot(&state)?;
    snapshot
        .projector(&state.settings)
        .batch(&id)
        .map(Json)
        .map_err(error_response)
}

async fn faculty_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<EntityTimetable<FacultyReport>> {
    let snapshot = snapshot(&state)?;
    snapshot
        .projector(&state.settings)
        .faculty(&id)
        .map(Json)
        .map_err(error_response)
}

async fn classroom_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<EntityTimetable<ClassroomReport>> {
    let snapshot = snapshot(&state)?;
    snapshot
        .projector(&state.settings)
        .classroom(&id)
        .map(Json)
        .map_err(error_response)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/timetable", get(timetable_handler))
        .route("/v1/timetable/regenerate", post(regenerate_handler))
        .route("/v1/timetable/validate", get(validate_handler))
        .route("/v1/timetable/batches/:id", get(batch_handler))
        .route("/v1/timetable/faculty/:id", get(faculty_handler))
        .route("/v1/timetable/classrooms/:id", get(classroom_handler))
        .with_state(state)
}

pub async fn run_server(settings: &ServerSettings, state: Arc<AppState>) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
