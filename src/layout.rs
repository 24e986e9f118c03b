use serde::Serialize;
use std::collections::HashMap;

use crate::topology::{BattleGraph, NodeId};

// ── Spacing ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-round x offsets and vertical gaps for one rendering of the bracket.
#[derive(Clone, Copy, Debug)]
pub struct Spacing {
    pub person_gap: f64,
    pub group_gap: f64,
    pub round_1_x: f64,
    pub round_2_x: f64,
    pub quarter_final_x: f64,
    pub semi_final_x: f64,
    pub final_x: f64,
    pub third_place_match_x: f64,
    pub champion_x: f64,
}

pub const FULL_SPACING: Spacing = Spacing {
    person_gap: 120.0,
    group_gap: 450.0,
    round_1_x: 0.0,
    round_2_x: 400.0,
    quarter_final_x: 800.0,
    semi_final_x: 1200.0,
    final_x: 1600.0,
    third_place_match_x: 1800.0,
    champion_x: 2000.0,
};

/// Compact spacing for the round-1-to-quarterfinal partial view.
pub const ROUND1_QF_SPACING: Spacing = Spacing {
    person_gap: 100.0,
    group_gap: 320.0,
    round_1_x: 0.0,
    round_2_x: 300.0,
    quarter_final_x: 600.0,
    semi_final_x: 900.0,
    final_x: 1200.0,
    third_place_match_x: 1400.0,
    champion_x: 1500.0,
};

// ── Layout ─────────────────────────────────────────────────────────────

/// Assigns a coordinate to every node. Computed bottom-up: leaves first,
/// then each non-leaf centered on the average y of its feeders. Wildcards
/// are leaves with special placement: between their battle's two groups,
/// or stacked above/below the group when the battle has a single group
/// winner (wildcards 8 and 9 around group O in the default tables).
///
/// Fails only on a feeder reference with no computed position, which a
/// validated graph cannot produce.
pub fn layout(graph: &BattleGraph, spacing: &Spacing) -> Result<HashMap<NodeId, Position>, String> {
    let mut positions: HashMap<NodeId, Position> = HashMap::new();

    for group in 0..graph.group_count() {
        let start_y = group as f64 * spacing.group_gap;
        for person in 1..=graph.persons_per_group() {
            let id = NodeId::Round1 { group, person };
            let y = start_y + (person - 1) as f64 * spacing.person_gap;
            positions.insert(id, Position { x: spacing.round_1_x, y });
        }
    }

    for group in 0..graph.group_count() {
        let id = NodeId::GroupWinner { group };
        let y = centered_y(graph, &positions, id)?;
        positions.insert(id, Position { x: spacing.round_2_x, y });
    }

    for wildcard in 1..=graph.wildcard_count() {
        let id = NodeId::Wildcard { id: wildcard };
        let battle = graph
            .battle_for_wildcard(wildcard)
            .ok_or_else(|| format!("Wildcard {wildcard} is not mapped to any battle."))?;
        let y = if battle.group_winners.len() == 1 {
            let anchor = group_winner_y(&positions, battle.group_winners[0])?;
            let index = battle
                .wildcards
                .iter()
                .position(|w| *w == wildcard)
                .unwrap_or(0);
            if index == 0 {
                anchor - spacing.person_gap
            } else {
                anchor + index as f64 * spacing.person_gap
            }
        } else {
            let first = group_winner_y(&positions, battle.group_winners[0])?;
            let second = group_winner_y(&positions, battle.group_winners[1])?;
            (first + second) / 2.0
        };
        positions.insert(id, Position { x: spacing.round_2_x, y });
    }

    for battle in graph.quarter_finals() {
        let id = NodeId::QuarterFinal { id: battle.id };
        let y = centered_y(graph, &positions, id)?;
        positions.insert(id, Position { x: spacing.quarter_final_x, y });
    }

    for battle in graph.semi_finals() {
        let id = NodeId::SemiFinal { id: battle.id };
        let y = centered_y(graph, &positions, id)?;
        positions.insert(id, Position { x: spacing.semi_final_x, y });
    }

    for battle in graph.finals() {
        let id = NodeId::Final { id: battle.id };
        let y = centered_y(graph, &positions, id)?;
        positions.insert(id, Position { x: spacing.final_x, y });
    }

    let champion_y = centered_y(graph, &positions, NodeId::Champion)?;
    positions.insert(NodeId::Champion, Position { x: spacing.champion_x, y: champion_y });

    // Third-place contestants are manual-assignment leaves placed below the
    // champion, spread symmetrically around the third-place row.
    let third_place_y = champion_y + spacing.person_gap * 2.0;
    let contestant_count = graph.finals().len();
    for (index, battle) in graph.finals().iter().enumerate() {
        let id = NodeId::ThirdPlaceContestant { id: battle.id };
        let offset =
            (index as f64 - (contestant_count as f64 - 1.0) / 2.0) * spacing.person_gap;
        positions.insert(
            id,
            Position { x: spacing.third_place_match_x, y: third_place_y + offset },
        );
    }

    let third_y = centered_y(graph, &positions, NodeId::ThirdPlace)?;
    positions.insert(NodeId::ThirdPlace, Position { x: spacing.champion_x, y: third_y });

    Ok(positions)
}

/// Average y of a node's feeders, all of which must already be placed.
fn centered_y(
    graph: &BattleGraph,
    positions: &HashMap<NodeId, Position>,
    id: NodeId,
) -> Result<f64, String> {
    let feeders = graph.feeders(id);
    if feeders.is_empty() {
        return Err(format!("Node {id} has no feeders to center on."));
    }
    let mut sum = 0.0;
    for feeder in &feeders {
        let position = positions
            .get(feeder)
            .ok_or_else(|| format!("Node {id} references feeder {feeder} with no computed position."))?;
        sum += position.y;
    }
    Ok(sum / feeders.len() as f64)
}

fn group_winner_y(positions: &HashMap<NodeId, Position>, group_number: usize) -> Result<f64, String> {
    let id = NodeId::GroupWinner { group: group_number - 1 };
    positions
        .get(&id)
        .map(|p| p.y)
        .ok_or_else(|| format!("Group winner {id} has no computed position."))
}
