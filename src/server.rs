use axum::{
    extract::{Path as AxumPath, Query, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::bracket::{compute_bracket, BracketGraph};
use crate::projection::{project_view, ViewKind};
use crate::store::StoreSnapshot;
use crate::topology::BattleGraph;
use crate::types::{
    AssignmentPayload, BulkCreateResult, CountPayload, NodeAssignment, Peserta, PesertaForm,
    SharedAssignmentStore, SharedPesertaStore, DEFAULT_BAGAN_ID,
};

#[derive(Clone)]
pub struct ServerState {
    pub graph: Arc<BattleGraph>,
    pub peserta: SharedPesertaStore,
    pub assignments: SharedAssignmentStore,
    pub data_path: PathBuf,
}

pub fn router(state: ServerState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route("/api/peserta", get(list_peserta).post(create_peserta))
        .route("/api/peserta/count", get(count_peserta))
        .route("/api/peserta/search", get(search_peserta))
        .route("/api/peserta/bulk", post(bulk_create_peserta))
        .route(
            "/api/peserta/:id",
            get(get_peserta).put(update_peserta).delete(delete_peserta),
        )
        .route(
            "/api/node-assignments",
            get(list_assignments)
                .post(upsert_assignment)
                .put(upsert_assignment),
        )
        .route("/api/node-assignments/:nodeId", axum::routing::delete(delete_assignment))
        .route("/api/bagan/:baganId", get(get_bracket))
        .route("/api/bagan/:baganId/view/:kind", get(get_view))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.nest_service("/", ServeDir::new(dir));
    }
    app
}

type ApiError = (StatusCode, String);

fn internal(message: String) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn not_found(message: String) -> ApiError {
    (StatusCode::NOT_FOUND, message)
}

/// Both stores share one data file; persist after every mutation. A failed
/// write is logged but never fails the request that mutated memory.
fn persist(state: &ServerState) {
    let snapshot = {
        let peserta = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        let assignments = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
        StoreSnapshot {
            peserta: peserta.list(),
            assignments: assignments.records(),
        }
    };
    if let Err(e) = snapshot.save(&state.data_path) {
        warn!("failed to persist data file: {e}");
    }
}

fn no_store_json(body: String) -> impl IntoResponse {
    (
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
            ("Expires", "0"),
        ],
        body,
    )
}

// ── Participant handlers ───────────────────────────────────────────────

async fn list_peserta(AxumState(state): AxumState<ServerState>) -> Json<Vec<Peserta>> {
    let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
    Json(store.list())
}

async fn get_peserta(
    AxumState(state): AxumState<ServerState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Peserta>, ApiError> {
    let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
    store
        .get(&id)
        .map(Json)
        .ok_or_else(|| not_found(format!("no participant with id {id}")))
}

async fn create_peserta(
    AxumState(state): AxumState<ServerState>,
    Json(form): Json<PesertaForm>,
) -> (StatusCode, Json<Peserta>) {
    let created = {
        let mut store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.create(form)
    };
    persist(&state);
    (StatusCode::CREATED, Json(created))
}

async fn update_peserta(
    AxumState(state): AxumState<ServerState>,
    AxumPath(id): AxumPath<String>,
    Json(form): Json<PesertaForm>,
) -> Result<Json<Peserta>, ApiError> {
    let updated = {
        let mut store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.update(&id, form).map_err(not_found)?
    };
    persist(&state);
    Ok(Json(updated))
}

async fn delete_peserta(
    AxumState(state): AxumState<ServerState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Peserta>, ApiError> {
    let removed = {
        let mut store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.delete(&id).map_err(not_found)?
    };
    persist(&state);
    Ok(Json(removed))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_peserta(
    AxumState(state): AxumState<ServerState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Peserta>> {
    let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
    Json(store.search(&params.q))
}

async fn count_peserta(AxumState(state): AxumState<ServerState>) -> Json<CountPayload> {
    let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
    Json(CountPayload { count: store.count() })
}

async fn bulk_create_peserta(
    AxumState(state): AxumState<ServerState>,
    Json(items): Json<Vec<Peserta>>,
) -> (StatusCode, Json<BulkCreateResult>) {
    let (inserted, skipped) = {
        let mut store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.bulk_create(items)
    };
    persist(&state);
    (
        StatusCode::CREATED,
        Json(BulkCreateResult { inserted, skipped }),
    )
}

// ── Assignment handlers ────────────────────────────────────────────────

async fn list_assignments(
    AxumState(state): AxumState<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<NodeAssignment>> {
    let store = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
    Json(store.list(params.get("baganId").map(String::as_str)))
}

async fn upsert_assignment(
    AxumState(state): AxumState<ServerState>,
    Json(payload): Json<AssignmentPayload>,
) -> Json<NodeAssignment> {
    let assignment = NodeAssignment {
        node_id: payload.node_id,
        peserta_id: payload.peserta_id,
        bagan_id: payload
            .bagan_id
            .unwrap_or_else(|| DEFAULT_BAGAN_ID.to_string()),
        assigned_at: payload.assigned_at.unwrap_or_else(Utc::now),
    };
    let stored = {
        let mut store = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
        store.upsert(assignment)
    };
    persist(&state);
    Json(stored)
}

async fn delete_assignment(
    AxumState(state): AxumState<ServerState>,
    AxumPath(node_id): AxumPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<NodeAssignment>, ApiError> {
    let bagan_id = params
        .get("baganId")
        .map(String::as_str)
        .unwrap_or(DEFAULT_BAGAN_ID);
    let removed = {
        let mut store = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
        store.delete(&node_id, bagan_id).map_err(not_found)?
    };
    persist(&state);
    Ok(Json(removed))
}

// ── Bracket handlers ───────────────────────────────────────────────────

fn current_bracket(state: &ServerState, bagan_id: &str) -> BracketGraph {
    let peserta = {
        let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.list()
    };
    let assignments = {
        let store = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
        store.list(Some(bagan_id))
    };
    compute_bracket(&state.graph, bagan_id, &peserta, &assignments)
}

async fn get_bracket(
    AxumState(state): AxumState<ServerState>,
    AxumPath(bagan_id): AxumPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bracket = current_bracket(&state, &bagan_id);
    let body = serde_json::to_string(&bracket).map_err(|e| internal(e.to_string()))?;
    Ok(no_store_json(body))
}

async fn get_view(
    AxumState(state): AxumState<ServerState>,
    AxumPath((bagan_id, kind)): AxumPath<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ViewKind::from_slug(&kind)
        .ok_or_else(|| not_found(format!("unknown view {kind}")))?;
    let peserta = {
        let store = state.peserta.lock().unwrap_or_else(|e| e.into_inner());
        store.list()
    };
    let assignments = {
        let store = state.assignments.lock().unwrap_or_else(|e| e.into_inner());
        store.list(Some(&bagan_id))
    };
    let view = project_view(&state.graph, kind, &bagan_id, &peserta, &assignments)
        .map_err(internal)?;
    let body = serde_json::to_string(&view).map_err(|e| internal(e.to_string()))?;
    Ok(no_store_json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssignmentStore, PesertaStore};
    use crate::types::PesertaStatus;
    use std::sync::Mutex;

    fn test_state() -> ServerState {
        ServerState {
            graph: Arc::new(BattleGraph::new().unwrap()),
            peserta: Arc::new(Mutex::new(PesertaStore::new())),
            assignments: Arc::new(Mutex::new(AssignmentStore::new())),
            data_path: std::env::temp_dir().join("bagan-server-test.json"),
        }
    }

    fn form(name: &str, group: &str, status: PesertaStatus) -> PesertaForm {
        PesertaForm {
            name: name.to_string(),
            group: group.to_string(),
            photo: String::new(),
            status,
        }
    }

    #[test]
    fn bracket_reflects_store_contents() {
        let state = test_state();
        {
            let mut store = state.peserta.lock().unwrap();
            store.create(form("Andi", "A", PesertaStatus::Winner));
        }

        let bracket = current_bracket(&state, DEFAULT_BAGAN_ID);
        let winner = bracket
            .nodes
            .iter()
            .find(|n| n.id == "round_2_person_1")
            .unwrap();
        assert_eq!(winner.slot.label, "Andi");
    }

    #[test]
    fn bracket_scopes_assignments_to_the_requested_bagan() {
        let state = test_state();
        let peserta = {
            let mut store = state.peserta.lock().unwrap();
            store.create(form("Budi", "B", PesertaStatus::Active))
        };
        {
            let mut store = state.assignments.lock().unwrap();
            store.upsert(NodeAssignment {
                node_id: "quarter_final_1".to_string(),
                peserta_id: peserta.id,
                bagan_id: "bagan-2".to_string(),
                assigned_at: Utc::now(),
            });
        }

        let bracket = current_bracket(&state, DEFAULT_BAGAN_ID);
        let qf1 = bracket.nodes.iter().find(|n| n.id == "quarter_final_1").unwrap();
        assert!(qf1.slot.is_placeholder);

        let other = current_bracket(&state, "bagan-2");
        let qf1 = other.nodes.iter().find(|n| n.id == "quarter_final_1").unwrap();
        assert_eq!(qf1.slot.label, "Budi");
    }

    #[test]
    fn router_builds_with_and_without_static_dir() {
        let state = test_state();
        let _ = router(state.clone(), None);
        let _ = router(state, Some(std::env::temp_dir()));
    }
}
