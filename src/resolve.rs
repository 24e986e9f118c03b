use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::topology::{BattleGraph, NodeId};
use crate::types::{NodeAssignment, Peserta, PesertaStatus};

/// What a bracket slot displays once resolved against the stores.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySlot {
    pub label: String,
    pub photo: String,
    pub peserta_id: Option<String>,
    pub is_placeholder: bool,
    pub ambiguous_winner: bool,
}

impl DisplaySlot {
    fn from_peserta(peserta: &Peserta) -> Self {
        DisplaySlot {
            label: peserta.name.clone(),
            photo: peserta.photo.clone(),
            peserta_id: Some(peserta.id.clone()),
            is_placeholder: false,
            ambiguous_winner: false,
        }
    }

    fn placeholder(label: String) -> Self {
        DisplaySlot {
            label,
            photo: String::new(),
            peserta_id: None,
            is_placeholder: true,
            ambiguous_winner: false,
        }
    }
}

/// Index maps over one snapshot of the participant and assignment stores,
/// scoped to a single bagan. Resolution is a pure read: precedence is
/// manual assignment, then the computed default for rounds that have one,
/// then a generated placeholder.
pub struct Resolver<'a> {
    bagan_id: &'a str,
    peserta_by_id: HashMap<&'a str, &'a Peserta>,
    peserta_by_group: HashMap<&'a str, Vec<&'a Peserta>>,
    assignments: HashMap<String, &'a NodeAssignment>,
}

impl<'a> Resolver<'a> {
    pub fn new(bagan_id: &'a str, peserta: &'a [Peserta], assignments: &'a [NodeAssignment]) -> Self {
        let mut peserta_by_id = HashMap::new();
        let mut peserta_by_group: HashMap<&str, Vec<&Peserta>> = HashMap::new();
        for p in peserta {
            peserta_by_id.insert(p.id.as_str(), p);
            peserta_by_group.entry(p.group.as_str()).or_default().push(p);
        }
        // Stable slot binding: group members ordered by registration time.
        for members in peserta_by_group.values_mut() {
            members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        }

        let mut assignment_map = HashMap::new();
        for assignment in assignments {
            if assignment.bagan_id != bagan_id {
                continue;
            }
            // Upsert semantics upstream mean at most one per node; last
            // record wins if the store ever handed us duplicates.
            assignment_map.insert(assignment.node_id.clone(), assignment);
        }

        Resolver {
            bagan_id,
            peserta_by_id,
            peserta_by_group,
            assignments: assignment_map,
        }
    }

    pub fn resolve(&self, graph: &BattleGraph, id: NodeId) -> DisplaySlot {
        let node_key = id.to_string();

        if let Some(assignment) = self.assignments.get(&node_key) {
            match self.peserta_by_id.get(assignment.peserta_id.as_str()) {
                Some(peserta) => return DisplaySlot::from_peserta(peserta),
                None => {
                    // Assignments may outlive their participant; treat as
                    // "no assignment" and keep resolving.
                    warn!(
                        bagan = self.bagan_id,
                        node = %node_key,
                        peserta = %assignment.peserta_id,
                        "assignment references a missing participant"
                    );
                }
            }
        }

        match id {
            NodeId::Round1 { group, person } => {
                let label = graph.group_label(group);
                let member = self
                    .peserta_by_group
                    .get(label)
                    .and_then(|members| person.checked_sub(1).and_then(|i| members.get(i)));
                match member {
                    Some(peserta) => DisplaySlot::from_peserta(peserta),
                    None => DisplaySlot::placeholder(graph.placeholder_label(id)),
                }
            }
            NodeId::GroupWinner { group } => {
                let label = graph.group_label(group);
                let winners: Vec<&&Peserta> = self
                    .peserta_by_group
                    .get(label)
                    .map(|members| {
                        members
                            .iter()
                            .filter(|p| p.status == PesertaStatus::Winner)
                            .collect()
                    })
                    .unwrap_or_default();
                match winners.as_slice() {
                    [winner] => DisplaySlot::from_peserta(winner),
                    [] => DisplaySlot::placeholder(graph.placeholder_label(id)),
                    _ => {
                        warn!(
                            bagan = self.bagan_id,
                            group = label,
                            count = winners.len(),
                            "multiple participants flagged winner in one group"
                        );
                        let mut slot = DisplaySlot::placeholder(graph.placeholder_label(id));
                        slot.ambiguous_winner = true;
                        slot
                    }
                }
            }
            // Wildcards, quarterfinals and beyond, and the third-place slots
            // have no computed default: nothing in the topology decides who
            // wins a battle, so only a manual assignment fills them.
            _ => DisplaySlot::placeholder(graph.placeholder_label(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn peserta(id: &str, name: &str, group: &str, status: PesertaStatus, minute: u32) -> Peserta {
        Peserta {
            id: id.to_string(),
            name: name.to_string(),
            group: group.to_string(),
            photo: format!("photo-{id}"),
            status,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap(),
        }
    }

    fn assignment(node_id: &str, peserta_id: &str) -> NodeAssignment {
        NodeAssignment {
            node_id: node_id.to_string(),
            peserta_id: peserta_id.to_string(),
            bagan_id: "bagan-1".to_string(),
            assigned_at: Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn assignment_overrides_group_winner_default() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![
            peserta("p1", "Andi", "A", PesertaStatus::Winner, 0),
            peserta("p2", "Budi", "B", PesertaStatus::Active, 1),
        ];
        let assignments = vec![assignment("round_2_person_1", "p2")];
        let resolver = Resolver::new("bagan-1", &peserta, &assignments);

        let slot = resolver.resolve(&graph, NodeId::GroupWinner { group: 0 });
        assert_eq!(slot.label, "Budi");
        assert_eq!(slot.peserta_id.as_deref(), Some("p2"));
        assert!(!slot.is_placeholder);
    }

    #[test]
    fn group_winner_default_kicks_in_without_assignment() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![
            peserta("p1", "Andi", "A", PesertaStatus::Active, 0),
            peserta("p2", "Budi", "A", PesertaStatus::Winner, 1),
        ];
        let resolver = Resolver::new("bagan-1", &peserta, &[]);

        let slot = resolver.resolve(&graph, NodeId::GroupWinner { group: 0 });
        assert_eq!(slot.label, "Budi");
        assert!(!slot.is_placeholder);
    }

    #[test]
    fn dangling_assignment_falls_back_to_placeholder() {
        let graph = BattleGraph::new().unwrap();
        let assignments = vec![assignment("quarter_final_3", "gone")];
        let resolver = Resolver::new("bagan-1", &[], &assignments);

        let slot = resolver.resolve(&graph, NodeId::QuarterFinal { id: 3 });
        assert!(slot.is_placeholder);
        assert_eq!(slot.label, "QF 3");
        assert_eq!(slot.peserta_id, None);
    }

    #[test]
    fn dangling_assignment_still_allows_winner_default() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![peserta("p1", "Andi", "A", PesertaStatus::Winner, 0)];
        let assignments = vec![assignment("round_2_person_1", "gone")];
        let resolver = Resolver::new("bagan-1", &peserta, &assignments);

        let slot = resolver.resolve(&graph, NodeId::GroupWinner { group: 0 });
        assert_eq!(slot.label, "Andi");
        assert!(!slot.is_placeholder);
    }

    #[test]
    fn multiple_winners_surface_ambiguity() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![
            peserta("p1", "Andi", "A", PesertaStatus::Winner, 0),
            peserta("p2", "Budi", "A", PesertaStatus::Winner, 1),
        ];
        let resolver = Resolver::new("bagan-1", &peserta, &[]);

        let slot = resolver.resolve(&graph, NodeId::GroupWinner { group: 0 });
        assert!(slot.is_placeholder);
        assert!(slot.ambiguous_winner);
        assert_eq!(slot.label, "Winner Group A");
    }

    #[test]
    fn round_1_slots_bind_group_members_in_registration_order() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![
            peserta("p2", "Budi", "A", PesertaStatus::Active, 5),
            peserta("p1", "Andi", "A", PesertaStatus::Active, 0),
        ];
        let resolver = Resolver::new("bagan-1", &peserta, &[]);

        let first = resolver.resolve(&graph, NodeId::Round1 { group: 0, person: 1 });
        let second = resolver.resolve(&graph, NodeId::Round1 { group: 0, person: 2 });
        let third = resolver.resolve(&graph, NodeId::Round1 { group: 0, person: 3 });
        assert_eq!(first.label, "Andi");
        assert_eq!(second.label, "Budi");
        assert!(third.is_placeholder);
        assert_eq!(third.label, "Group A Slot 3");
    }

    #[test]
    fn zero_person_slot_resolves_to_a_placeholder() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![peserta("p1", "Andi", "A", PesertaStatus::Active, 0)];
        let resolver = Resolver::new("bagan-1", &peserta, &[]);

        let slot = resolver.resolve(&graph, NodeId::Round1 { group: 0, person: 0 });
        assert!(slot.is_placeholder);
        assert_eq!(slot.peserta_id, None);
    }

    #[test]
    fn assignments_for_other_bagan_are_ignored() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![peserta("p1", "Andi", "A", PesertaStatus::Active, 0)];
        let mut other = assignment("quarter_final_1", "p1");
        other.bagan_id = "bagan-2".to_string();
        let assignments = [other];
        let resolver = Resolver::new("bagan-1", &peserta, &assignments);

        let slot = resolver.resolve(&graph, NodeId::QuarterFinal { id: 1 });
        assert!(slot.is_placeholder);
    }

    #[test]
    fn wildcard_resolves_only_via_assignment() {
        let graph = BattleGraph::new().unwrap();
        let peserta = vec![peserta("p1", "Cici", "C", PesertaStatus::Active, 0)];
        let assignments = vec![assignment("round_2_wildcard_4", "p1")];
        let resolver = Resolver::new("bagan-1", &peserta, &assignments);

        let assigned = resolver.resolve(&graph, NodeId::Wildcard { id: 4 });
        assert_eq!(assigned.label, "Cici");
        let empty = resolver.resolve(&graph, NodeId::Wildcard { id: 5 });
        assert!(empty.is_placeholder);
        assert_eq!(empty.label, "Wildcard 5");
    }
}
