use crate::data::{TimetableEntry, Weekday};
use crate::engine::{self, GenerateOutcome};
use crate::store::ScheduleStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post, routing::put};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared state of the façade: the collaborator dataset plus one exclusive
/// lock per semester so concurrent generation requests for the same
/// semester serialize (their venue snapshots would otherwise go stale).
#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<ScheduleStore>>,
    semester_locks: Arc<Mutex<HashMap<u8, Arc<Mutex<()>>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub department_code: String,
    pub semester: u8,
    pub mentor_day: String,
    #[serde(default)]
    pub mentor_period: Option<u8>,
}

type ApiError = (StatusCode, String);

async fn put_dataset(
    State(state): State<AppState>,
    Json(dataset): Json<ScheduleStore>,
) -> Json<serde_json::Value> {
    let summary = serde_json::json!({
        "courses": dataset.courses.len(),
        "faculty": dataset.faculty.len(),
        "slots": dataset.slots.len(),
        "venues": dataset.venues.len(),
        "entries": dataset.entries.len(),
    });
    *state.store.write().await = dataset;
    Json(summary)
}

async fn get_timetable(
    State(state): State<AppState>,
    Path((department, semester)): Path<(String, u8)>,
) -> Json<Vec<TimetableEntry>> {
    let store = state.store.read().await;
    Json(
        store
            .entries_for(&department, semester)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateOutcome>, ApiError> {
    let mentor_day = Weekday::parse(&req.mentor_day).ok_or((
        StatusCode::BAD_REQUEST,
        format!("unknown weekday: {:?}", req.mentor_day),
    ))?;
    let mentor_period = req.mentor_period.unwrap_or(8);

    // One generation at a time per semester; the dataset snapshot below is
    // only trustworthy while no sibling request is writing this semester.
    let lock = {
        let mut locks = state.semester_locks.lock().await;
        locks.entry(req.semester).or_default().clone()
    };
    let _guard = lock.lock().await;

    let snapshot = state.store.read().await.clone();
    let department = req.department_code.clone();
    let semester = req.semester;
    let outcome =
        tokio::task::spawn_blocking(move || {
            engine::generate(&snapshot, &department, semester, mentor_day, mentor_period)
        })
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .store
        .write()
        .await
        .replace_entries(&req.department_code, req.semester, outcome.entries.clone());
    Ok(Json(outcome))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/v1/dataset", put(put_dataset))
        .route("/v1/timetable/generate", post(generate_handler))
        .route("/v1/timetable/:department/:semester", get(get_timetable))
        .with_state(state)
}

pub async fn run_server() {
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app(AppState::default())).await.unwrap();
}
