use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::layout::{self, Position, FULL_SPACING};
use crate::types::{GROUP_COUNT, GROUP_LABELS, PERSONS_PER_GROUP, WILDCARD_COUNT};

// ── Rounds and node identity ───────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Round {
    GroupStage,
    GroupWinner,
    Wildcard,
    QuarterFinal,
    SemiFinal,
    Final,
    Champion,
    ThirdPlaceContestant,
    ThirdPlace,
}

/// Typed decomposition of a bracket slot identity. Constructed once by the
/// battle graph; consumers match on the variants instead of re-parsing the
/// rendered id strings. `group` is a 0-based group index; `person` and the
/// battle ids are 1-based, matching the rendered form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    Round1 { group: usize, person: usize },
    GroupWinner { group: usize },
    Wildcard { id: usize },
    QuarterFinal { id: usize },
    SemiFinal { id: usize },
    Final { id: usize },
    Champion,
    ThirdPlaceContestant { id: usize },
    ThirdPlace,
}

impl NodeId {
    pub fn round(&self) -> Round {
        match self {
            NodeId::Round1 { .. } => Round::GroupStage,
            NodeId::GroupWinner { .. } => Round::GroupWinner,
            NodeId::Wildcard { .. } => Round::Wildcard,
            NodeId::QuarterFinal { .. } => Round::QuarterFinal,
            NodeId::SemiFinal { .. } => Round::SemiFinal,
            NodeId::Final { .. } => Round::Final,
            NodeId::Champion => Round::Champion,
            NodeId::ThirdPlaceContestant { .. } => Round::ThirdPlaceContestant,
            NodeId::ThirdPlace => Round::ThirdPlace,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Round1 { group, person } => {
                let letter = GROUP_LABELS.get(*group).copied().unwrap_or("?");
                write!(f, "round_1_group_{}_person_{}", letter.to_ascii_lowercase(), person)
            }
            NodeId::GroupWinner { group } => write!(f, "round_2_person_{}", group + 1),
            NodeId::Wildcard { id } => write!(f, "round_2_wildcard_{id}"),
            NodeId::QuarterFinal { id } => write!(f, "quarter_final_{id}"),
            NodeId::SemiFinal { id } => write!(f, "semi_final_{id}"),
            NodeId::Final { id } => write!(f, "final_{id}"),
            NodeId::Champion => write!(f, "champion"),
            NodeId::ThirdPlaceContestant { id } => write!(f, "third_place_contestant_{id}"),
            NodeId::ThirdPlace => write!(f, "third_place"),
        }
    }
}

// ── Static battle tables ───────────────────────────────────────────────

/// One quarter-final battle: a battle of 3 drawing from group winners and
/// wildcards. QF8 is the degenerate slot (one group winner, two wildcards)
/// because 15 groups do not pair up evenly.
#[derive(Clone, Debug)]
pub struct QuarterFinalBattle {
    pub id: usize,
    pub group_winners: Vec<usize>,
    pub wildcards: Vec<usize>,
}

/// One semi-final duel between two quarter-final winners.
#[derive(Clone, Debug)]
pub struct SemiFinalBattle {
    pub id: usize,
    pub quarter_finals: [usize; 2],
}

/// One final duel between two semi-final winners.
#[derive(Clone, Debug)]
pub struct FinalBattle {
    pub id: usize,
    pub semi_finals: [usize; 2],
}

pub fn default_quarter_final_battles() -> Vec<QuarterFinalBattle> {
    vec![
        QuarterFinalBattle { id: 1, group_winners: vec![1, 2], wildcards: vec![1] },
        QuarterFinalBattle { id: 2, group_winners: vec![3, 4], wildcards: vec![2] },
        QuarterFinalBattle { id: 3, group_winners: vec![5, 6], wildcards: vec![3] },
        QuarterFinalBattle { id: 4, group_winners: vec![7, 8], wildcards: vec![4] },
        QuarterFinalBattle { id: 5, group_winners: vec![9, 10], wildcards: vec![5] },
        QuarterFinalBattle { id: 6, group_winners: vec![11, 12], wildcards: vec![6] },
        QuarterFinalBattle { id: 7, group_winners: vec![13, 14], wildcards: vec![7] },
        QuarterFinalBattle { id: 8, group_winners: vec![15], wildcards: vec![8, 9] },
    ]
}

pub fn default_semi_final_battles() -> Vec<SemiFinalBattle> {
    vec![
        SemiFinalBattle { id: 1, quarter_finals: [1, 2] },
        SemiFinalBattle { id: 2, quarter_finals: [3, 4] },
        SemiFinalBattle { id: 3, quarter_finals: [5, 6] },
        SemiFinalBattle { id: 4, quarter_finals: [7, 8] },
    ]
}

pub fn default_final_battles() -> Vec<FinalBattle> {
    vec![
        FinalBattle { id: 1, semi_finals: [1, 2] },
        FinalBattle { id: 2, semi_finals: [3, 4] },
    ]
}

// ── Battle graph ───────────────────────────────────────────────────────

/// The complete bracket topology for one bagan: node identities, feeder
/// edges, and the full-view layout. Construction validates the battle
/// tables; a graph that constructs successfully cannot produce dangling
/// feeder references afterwards.
#[derive(Debug)]
pub struct BattleGraph {
    group_count: usize,
    persons_per_group: usize,
    wildcard_count: usize,
    quarter_finals: Vec<QuarterFinalBattle>,
    semi_finals: Vec<SemiFinalBattle>,
    finals: Vec<FinalBattle>,
    positions: HashMap<NodeId, Position>,
}

impl BattleGraph {
    pub fn new() -> Result<Self, String> {
        BattleGraph::with_tables(
            GROUP_COUNT,
            PERSONS_PER_GROUP,
            WILDCARD_COUNT,
            default_quarter_final_battles(),
            default_semi_final_battles(),
            default_final_battles(),
        )
    }

    pub fn with_tables(
        group_count: usize,
        persons_per_group: usize,
        wildcard_count: usize,
        quarter_finals: Vec<QuarterFinalBattle>,
        semi_finals: Vec<SemiFinalBattle>,
        finals: Vec<FinalBattle>,
    ) -> Result<Self, String> {
        validate_tables(group_count, wildcard_count, &quarter_finals, &semi_finals, &finals)?;
        let mut graph = BattleGraph {
            group_count,
            persons_per_group,
            wildcard_count,
            quarter_finals,
            semi_finals,
            finals,
            positions: HashMap::new(),
        };
        graph.positions = layout::layout(&graph, &FULL_SPACING)?;
        Ok(graph)
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn persons_per_group(&self) -> usize {
        self.persons_per_group
    }

    pub fn wildcard_count(&self) -> usize {
        self.wildcard_count
    }

    pub fn quarter_finals(&self) -> &[QuarterFinalBattle] {
        &self.quarter_finals
    }

    pub fn semi_finals(&self) -> &[SemiFinalBattle] {
        &self.semi_finals
    }

    pub fn finals(&self) -> &[FinalBattle] {
        &self.finals
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn group_label(&self, group: usize) -> &'static str {
        GROUP_LABELS.get(group).copied().unwrap_or("?")
    }

    /// All node ids, rounds following the flow of the bracket. The order is
    /// stable so repeated generation yields identical output.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for group in 0..self.group_count {
            for person in 1..=self.persons_per_group {
                out.push(NodeId::Round1 { group, person });
            }
        }
        for group in 0..self.group_count {
            out.push(NodeId::GroupWinner { group });
        }
        for id in 1..=self.wildcard_count {
            out.push(NodeId::Wildcard { id });
        }
        for battle in &self.quarter_finals {
            out.push(NodeId::QuarterFinal { id: battle.id });
        }
        for battle in &self.semi_finals {
            out.push(NodeId::SemiFinal { id: battle.id });
        }
        for battle in &self.finals {
            out.push(NodeId::Final { id: battle.id });
        }
        out.push(NodeId::Champion);
        for battle in &self.finals {
            out.push(NodeId::ThirdPlaceContestant { id: battle.id });
        }
        out.push(NodeId::ThirdPlace);
        out
    }

    /// Feeder nodes whose resolved participants compete for this slot.
    /// Round-1 slots and wildcards are sources. Third-place contestants are
    /// also sources: the topology has no notion of a battle's loser, so the
    /// finals feed only the champion and the contestants are filled by
    /// manual assignment alone.
    pub fn feeders(&self, id: NodeId) -> Vec<NodeId> {
        match id {
            NodeId::Round1 { .. } | NodeId::Wildcard { .. } | NodeId::ThirdPlaceContestant { .. } => {
                Vec::new()
            }
            NodeId::GroupWinner { group } => (1..=self.persons_per_group)
                .map(|person| NodeId::Round1 { group, person })
                .collect(),
            NodeId::QuarterFinal { id } => {
                let Some(battle) = self.quarter_finals.iter().find(|b| b.id == id) else {
                    return Vec::new();
                };
                let mut out: Vec<NodeId> = battle
                    .group_winners
                    .iter()
                    .map(|gw| NodeId::GroupWinner { group: gw - 1 })
                    .collect();
                out.extend(battle.wildcards.iter().map(|w| NodeId::Wildcard { id: *w }));
                out
            }
            NodeId::SemiFinal { id } => {
                let Some(battle) = self.semi_finals.iter().find(|b| b.id == id) else {
                    return Vec::new();
                };
                battle
                    .quarter_finals
                    .iter()
                    .map(|qf| NodeId::QuarterFinal { id: *qf })
                    .collect()
            }
            NodeId::Final { id } => {
                let Some(battle) = self.finals.iter().find(|b| b.id == id) else {
                    return Vec::new();
                };
                battle
                    .semi_finals
                    .iter()
                    .map(|sf| NodeId::SemiFinal { id: *sf })
                    .collect()
            }
            NodeId::Champion => self
                .finals
                .iter()
                .map(|battle| NodeId::Final { id: battle.id })
                .collect(),
            NodeId::ThirdPlace => self
                .finals
                .iter()
                .map(|battle| NodeId::ThirdPlaceContestant { id: battle.id })
                .collect(),
        }
    }

    /// Every (feeder, target) pair implied by the battle tables, in the same
    /// stable order as `node_ids`.
    pub fn edge_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::new();
        for group in 0..self.group_count {
            for person in 1..=self.persons_per_group {
                out.push((NodeId::Round1 { group, person }, NodeId::GroupWinner { group }));
            }
        }
        for battle in &self.quarter_finals {
            let target = NodeId::QuarterFinal { id: battle.id };
            for gw in &battle.group_winners {
                out.push((NodeId::GroupWinner { group: gw - 1 }, target));
            }
            for w in &battle.wildcards {
                out.push((NodeId::Wildcard { id: *w }, target));
            }
        }
        for battle in &self.semi_finals {
            let target = NodeId::SemiFinal { id: battle.id };
            for qf in &battle.quarter_finals {
                out.push((NodeId::QuarterFinal { id: *qf }, target));
            }
        }
        for battle in &self.finals {
            let target = NodeId::Final { id: battle.id };
            for sf in &battle.semi_finals {
                out.push((NodeId::SemiFinal { id: *sf }, target));
            }
        }
        for battle in &self.finals {
            out.push((NodeId::Final { id: battle.id }, NodeId::Champion));
        }
        for battle in &self.finals {
            out.push((NodeId::ThirdPlaceContestant { id: battle.id }, NodeId::ThirdPlace));
        }
        out
    }

    /// The quarter-final battle a wildcard feeds, if any. Used by the layout
    /// to place wildcards relative to their battle's groups.
    pub fn battle_for_wildcard(&self, wildcard: usize) -> Option<&QuarterFinalBattle> {
        self.quarter_finals.iter().find(|b| b.wildcards.contains(&wildcard))
    }

    /// Round-appropriate generated name shown when no participant resolves.
    pub fn placeholder_label(&self, id: NodeId) -> String {
        match id {
            NodeId::Round1 { group, person } => {
                format!("Group {} Slot {}", self.group_label(group), person)
            }
            NodeId::GroupWinner { group } => format!("Winner Group {}", self.group_label(group)),
            NodeId::Wildcard { id } => format!("Wildcard {id}"),
            NodeId::QuarterFinal { id } => format!("QF {id}"),
            NodeId::SemiFinal { id } => format!("SF {id}"),
            NodeId::Final { id } => format!("Final {id}"),
            NodeId::Champion => "Champion".to_string(),
            NodeId::ThirdPlaceContestant { id } => format!("Loser Final {id}"),
            NodeId::ThirdPlace => "3rd Place".to_string(),
        }
    }

    /// Descriptive round label for display underneath the slot name.
    pub fn role(&self, id: NodeId) -> String {
        match id {
            NodeId::Round1 { group, .. } => format!("Round 1 - Group {}", self.group_label(group)),
            NodeId::GroupWinner { .. } => "Round 2".to_string(),
            NodeId::Wildcard { .. } => "Round 2 - Wildcard".to_string(),
            NodeId::QuarterFinal { id } => {
                let battle = self.quarter_finals.iter().find(|b| b.id == id);
                match battle {
                    Some(battle) => {
                        let groups = battle
                            .group_winners
                            .iter()
                            .map(|gw| self.group_label(gw - 1).to_string())
                            .collect::<Vec<_>>()
                            .join(", ");
                        let wildcards = battle
                            .wildcards
                            .iter()
                            .map(|w| format!("W{w}"))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("Quarter Final - Battle: {groups}, {wildcards}")
                    }
                    None => "Quarter Final".to_string(),
                }
            }
            NodeId::SemiFinal { id } => {
                let battle = self.semi_finals.iter().find(|b| b.id == id);
                match battle {
                    Some(battle) => format!(
                        "Semi Final - QF{} vs QF{}",
                        battle.quarter_finals[0], battle.quarter_finals[1]
                    ),
                    None => "Semi Final".to_string(),
                }
            }
            NodeId::Final { id } => {
                let battle = self.finals.iter().find(|b| b.id == id);
                match battle {
                    Some(battle) => {
                        format!("Final - SF{} vs SF{}", battle.semi_finals[0], battle.semi_finals[1])
                    }
                    None => "Final".to_string(),
                }
            }
            NodeId::Champion => "Grand Final - Winner".to_string(),
            NodeId::ThirdPlaceContestant { id } => format!("3rd Place Match - From Final {id}"),
            NodeId::ThirdPlace => "3rd Place Winner".to_string(),
        }
    }
}

// ── Table validation ───────────────────────────────────────────────────

fn validate_tables(
    group_count: usize,
    wildcard_count: usize,
    quarter_finals: &[QuarterFinalBattle],
    semi_finals: &[SemiFinalBattle],
    finals: &[FinalBattle],
) -> Result<(), String> {
    if group_count == 0 || group_count > GROUP_LABELS.len() {
        return Err(format!(
            "Group count must be between 1 and {}, got {group_count}.",
            GROUP_LABELS.len()
        ));
    }

    let mut qf_ids = HashSet::new();
    let mut seen_groups = HashSet::new();
    let mut seen_wildcards = HashSet::new();
    for battle in quarter_finals {
        if !qf_ids.insert(battle.id) {
            return Err(format!("Quarter final {} is defined twice.", battle.id));
        }
        if battle.group_winners.is_empty() {
            return Err(format!("Quarter final {} has no group winner feeder.", battle.id));
        }
        for gw in &battle.group_winners {
            if *gw == 0 || *gw > group_count {
                return Err(format!(
                    "Quarter final {} references group {gw}, but there are only {group_count} groups.",
                    battle.id
                ));
            }
            if !seen_groups.insert(*gw) {
                return Err(format!(
                    "Group {gw} feeds more than one quarter final battle."
                ));
            }
        }
        for w in &battle.wildcards {
            if *w == 0 || *w > wildcard_count {
                return Err(format!(
                    "Quarter final {} references wildcard {w}, but there are only {wildcard_count} wildcards.",
                    battle.id
                ));
            }
            if !seen_wildcards.insert(*w) {
                return Err(format!("Wildcard {w} feeds more than one quarter final battle."));
            }
        }
    }
    for group in 1..=group_count {
        if !seen_groups.contains(&group) {
            return Err(format!("Group {group} does not feed any quarter final battle."));
        }
    }
    for wildcard in 1..=wildcard_count {
        if !seen_wildcards.contains(&wildcard) {
            return Err(format!("Wildcard {wildcard} does not feed any quarter final battle."));
        }
    }

    let mut sf_ids = HashSet::new();
    let mut claimed_qfs = HashSet::new();
    for battle in semi_finals {
        if !sf_ids.insert(battle.id) {
            return Err(format!("Semi final {} is defined twice.", battle.id));
        }
        if battle.quarter_finals[0] == battle.quarter_finals[1] {
            return Err(format!(
                "Semi final {} pairs quarter final {} against itself.",
                battle.id, battle.quarter_finals[0]
            ));
        }
        for qf in &battle.quarter_finals {
            if !qf_ids.contains(qf) {
                return Err(format!(
                    "Semi final {} references unknown quarter final {qf}.",
                    battle.id
                ));
            }
            if !claimed_qfs.insert(*qf) {
                return Err(format!(
                    "Quarter final {qf} is referenced by more than one semi final battle."
                ));
            }
        }
    }
    for qf in &qf_ids {
        if !claimed_qfs.contains(qf) {
            return Err(format!("Quarter final {qf} does not feed any semi final battle."));
        }
    }

    let mut final_ids = HashSet::new();
    let mut claimed_sfs = HashSet::new();
    for battle in finals {
        if !final_ids.insert(battle.id) {
            return Err(format!("Final {} is defined twice.", battle.id));
        }
        if battle.semi_finals[0] == battle.semi_finals[1] {
            return Err(format!(
                "Final {} pairs semi final {} against itself.",
                battle.id, battle.semi_finals[0]
            ));
        }
        for sf in &battle.semi_finals {
            if !sf_ids.contains(sf) {
                return Err(format!("Final {} references unknown semi final {sf}.", battle.id));
            }
            if !claimed_sfs.insert(*sf) {
                return Err(format!(
                    "Semi final {sf} is referenced by more than one final battle."
                ));
            }
        }
    }
    for sf in &sf_ids {
        if !claimed_sfs.contains(sf) {
            return Err(format!("Semi final {sf} does not feed any final battle."));
        }
    }
    if finals.is_empty() {
        return Err("The battle tables define no final battle.".to_string());
    }

    Ok(())
}
