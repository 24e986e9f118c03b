use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::types::{NodeAssignment, Peserta, PesertaForm};

// ── Participant store ──────────────────────────────────────────────────

/// In-memory participant registry. Ids are store-assigned (`peserta-<n>`)
/// and stable for the life of the data file.
#[derive(Debug)]
pub struct PesertaStore {
    records: HashMap<String, Peserta>,
    next_id: u64,
}

impl Default for PesertaStore {
    fn default() -> Self {
        PesertaStore {
            records: HashMap::new(),
            next_id: 1,
        }
    }
}

impl PesertaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Peserta>) -> Self {
        let mut next_id = 1;
        for record in &records {
            if let Some(n) = record
                .id
                .strip_prefix("peserta-")
                .and_then(|s| s.parse::<u64>().ok())
            {
                next_id = next_id.max(n + 1);
            }
        }
        let records = records.into_iter().map(|p| (p.id.clone(), p)).collect();
        PesertaStore { records, next_id }
    }

    /// All participants, oldest first. Ties on the timestamp break on id so
    /// the order never shifts between reads.
    pub fn list(&self) -> Vec<Peserta> {
        let mut all: Vec<Peserta> = self.records.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn get(&self, id: &str) -> Option<Peserta> {
        self.records.get(id).cloned()
    }

    pub fn create(&mut self, form: PesertaForm) -> Peserta {
        let id = format!("peserta-{}", self.next_id);
        self.next_id += 1;
        let peserta = Peserta {
            id: id.clone(),
            name: form.name,
            group: form.group,
            photo: form.photo,
            status: form.status,
            created_at: Utc::now(),
        };
        self.records.insert(id, peserta.clone());
        peserta
    }

    pub fn update(&mut self, id: &str, form: PesertaForm) -> Result<Peserta, String> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| format!("no participant with id {id}"))?;
        record.name = form.name;
        record.group = form.group;
        record.photo = form.photo;
        record.status = form.status;
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Peserta, String> {
        self.records
            .remove(id)
            .ok_or_else(|| format!("no participant with id {id}"))
    }

    /// Case-insensitive substring match over name and group.
    pub fn search(&self, query: &str) -> Vec<Peserta> {
        let needle = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.group.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Imports pre-built records, keeping whatever is already stored when
    /// an id collides. Returns the inserted records and the skip count.
    pub fn bulk_create(&mut self, items: Vec<Peserta>) -> (Vec<Peserta>, usize) {
        let mut inserted = Vec::new();
        let mut skipped = 0;
        for item in items {
            if self.records.contains_key(&item.id) {
                skipped += 1;
                continue;
            }
            if let Some(n) = item
                .id
                .strip_prefix("peserta-")
                .and_then(|s| s.parse::<u64>().ok())
            {
                self.next_id = self.next_id.max(n + 1);
            }
            self.records.insert(item.id.clone(), item.clone());
            inserted.push(item);
        }
        (inserted, skipped)
    }
}

// ── Assignment store ───────────────────────────────────────────────────

/// Manual slot overrides, at most one per (node, bagan) pair.
#[derive(Debug, Default)]
pub struct AssignmentStore {
    records: HashMap<(String, String), NodeAssignment>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<NodeAssignment>) -> Self {
        let records = records
            .into_iter()
            .map(|a| ((a.node_id.clone(), a.bagan_id.clone()), a))
            .collect();
        AssignmentStore { records }
    }

    pub fn list(&self, bagan_id: Option<&str>) -> Vec<NodeAssignment> {
        let mut all: Vec<NodeAssignment> = self
            .records
            .values()
            .filter(|a| bagan_id.map_or(true, |b| a.bagan_id == b))
            .cloned()
            .collect();
        all.sort_by(|a, b| {
            a.bagan_id
                .cmp(&b.bagan_id)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        all
    }

    /// Replaces any existing assignment for the same node and bagan.
    pub fn upsert(&mut self, assignment: NodeAssignment) -> NodeAssignment {
        let key = (assignment.node_id.clone(), assignment.bagan_id.clone());
        self.records.insert(key, assignment.clone());
        assignment
    }

    pub fn delete(&mut self, node_id: &str, bagan_id: &str) -> Result<NodeAssignment, String> {
        self.records
            .remove(&(node_id.to_string(), bagan_id.to_string()))
            .ok_or_else(|| format!("no assignment for node {node_id} in bagan {bagan_id}"))
    }

    pub fn records(&self) -> Vec<NodeAssignment> {
        self.list(None)
    }
}

// ── Persistence ────────────────────────────────────────────────────────

/// On-disk shape of both stores, written as one JSON document after every
/// mutation and reloaded on startup.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub peserta: Vec<Peserta>,
    pub assignments: Vec<NodeAssignment>,
}

impl StoreSnapshot {
    pub fn load(path: &Path) -> Result<Option<StoreSnapshot>, String> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let snapshot = serde_json::from_str(&raw)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize data file: {e}"))?;
        std::fs::write(path, raw)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PesertaStatus;
    use chrono::{TimeZone, Utc};

    fn form(name: &str, group: &str) -> PesertaForm {
        PesertaForm {
            name: name.to_string(),
            group: group.to_string(),
            photo: String::new(),
            status: PesertaStatus::Active,
        }
    }

    fn record(id: &str, name: &str, group: &str) -> Peserta {
        Peserta {
            id: id.to_string(),
            name: name.to_string(),
            group: group.to_string(),
            photo: String::new(),
            status: PesertaStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn assignment(node_id: &str, peserta_id: &str, bagan_id: &str) -> NodeAssignment {
        NodeAssignment {
            node_id: node_id.to_string(),
            peserta_id: peserta_id.to_string(),
            bagan_id: bagan_id.to_string(),
            assigned_at: Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let mut store = PesertaStore::new();
        let a = store.create(form("Andi", "A"));
        let b = store.create(form("Budi", "B"));
        assert_eq!(a.id, "peserta-1");
        assert_eq!(b.id, "peserta-2");
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn from_records_resumes_the_id_sequence() {
        let mut store = PesertaStore::from_records(vec![record("peserta-7", "Andi", "A")]);
        let next = store.create(form("Budi", "B"));
        assert_eq!(next.id, "peserta-8");
    }

    #[test]
    fn update_and_delete_report_missing_ids() {
        let mut store = PesertaStore::new();
        assert!(store.update("peserta-1", form("Andi", "A")).is_err());
        assert!(store.delete("peserta-1").is_err());

        let created = store.create(form("Andi", "A"));
        let updated = store.update(&created.id, form("Andi Revised", "B")).unwrap();
        assert_eq!(updated.group, "B");
        assert_eq!(updated.created_at, created.created_at);
        store.delete(&created.id).unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn search_matches_name_and_group_case_insensitively() {
        let mut store = PesertaStore::new();
        store.create(form("Andi Wijaya", "A"));
        store.create(form("Budi", "B"));

        let by_name = store.search("wijaya");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Andi Wijaya");
        // "b" matches Budi's name and both names contain no group hit;
        // group "B" matches too, same record either way.
        let by_group = store.search("B");
        assert!(by_group.iter().any(|p| p.name == "Budi"));
    }

    #[test]
    fn bulk_create_skips_duplicate_ids() {
        let mut store = PesertaStore::from_records(vec![record("p1", "Andi", "A")]);
        let (inserted, skipped) = store.bulk_create(vec![
            record("p1", "Shadow", "A"),
            record("p2", "Budi", "B"),
        ]);
        assert_eq!(inserted.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(store.get("p1").unwrap().name, "Andi");
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn upsert_replaces_the_existing_assignment() {
        let mut store = AssignmentStore::new();
        store.upsert(assignment("quarter_final_1", "p1", "bagan-1"));
        store.upsert(assignment("quarter_final_1", "p2", "bagan-1"));

        let all = store.list(Some("bagan-1"));
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].peserta_id, "p2");
    }

    #[test]
    fn list_filters_by_bagan() {
        let mut store = AssignmentStore::new();
        store.upsert(assignment("quarter_final_1", "p1", "bagan-1"));
        store.upsert(assignment("quarter_final_1", "p1", "bagan-2"));

        assert_eq!(store.list(Some("bagan-1")).len(), 1);
        assert_eq!(store.list(None).len(), 2);
    }

    #[test]
    fn delete_missing_assignment_is_an_error() {
        let mut store = AssignmentStore::new();
        assert!(store.delete("quarter_final_1", "bagan-1").is_err());
        store.upsert(assignment("quarter_final_1", "p1", "bagan-1"));
        assert!(store.delete("quarter_final_1", "bagan-1").is_ok());
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = std::env::temp_dir().join("bagan-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.json");

        let snapshot = StoreSnapshot {
            peserta: vec![record("p1", "Andi", "A")],
            assignments: vec![assignment("quarter_final_1", "p1", "bagan-1")],
        };
        snapshot.save(&path).unwrap();
        let loaded = StoreSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.peserta.len(), 1);
        assert_eq!(loaded.assignments[0].node_id, "quarter_final_1");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_missing_file_is_none() {
        let path = std::env::temp_dir().join("bagan-store-test-missing.json");
        assert!(StoreSnapshot::load(&path).unwrap().is_none());
    }
}
