use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::store::{AssignmentStore, PesertaStore};

// ── Constants ──────────────────────────────────────────────────────────

pub const GROUP_LABELS: [&str; 15] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
];
pub const GROUP_COUNT: usize = 15;
pub const PERSONS_PER_GROUP: usize = 3;
pub const WILDCARD_COUNT: usize = 9;
pub const DEFAULT_BAGAN_ID: &str = "bagan-1";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedPesertaStore = Arc<Mutex<PesertaStore>>;
pub type SharedAssignmentStore = Arc<Mutex<AssignmentStore>>;

// ── Participant domain types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PesertaStatus {
    Active,
    Eliminated,
    Winner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peserta {
    pub id: String,
    pub name: String,
    pub group: String,
    pub photo: String,
    pub status: PesertaStatus,
    pub created_at: DateTime<Utc>,
}

/// Create/update payload: everything but the store-assigned id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PesertaForm {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub photo: String,
    pub status: PesertaStatus,
}

// ── Assignment domain types ────────────────────────────────────────────

/// Manual slot override. `node_id` is serialized as `id` to match the
/// node-assignment records the operator UI reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAssignment {
    #[serde(rename = "id")]
    pub node_id: String,
    pub peserta_id: String,
    pub bagan_id: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPayload {
    #[serde(rename = "id")]
    pub node_id: String,
    pub peserta_id: String,
    #[serde(default)]
    pub bagan_id: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

// ── Wire payloads ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CountPayload {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResult {
    pub inserted: Vec<Peserta>,
    pub skipped: usize,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub static_dir: String,
    pub data_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8970".to_string(),
            static_dir: String::new(),
            data_path: "bagan_data.json".to_string(),
        }
    }
}
