use std::collections::HashMap;

use crate::bracket::{compute_bracket, BracketGraph};
use crate::layout::{self, Position, ROUND1_QF_SPACING};
use crate::topology::{BattleGraph, NodeId, Round};
use crate::types::{NodeAssignment, Peserta};

// Compact spacing for the quarterfinal-to-final partial view.
const QF_FINAL_PERSON_GAP: f64 = 100.0;
const QF_FINAL_QF_GAP: f64 = 150.0;
const QF_FINAL_QF_START_Y: f64 = 200.0;
const QF_FINAL_QUARTER_FINAL_X: f64 = 0.0;
const QF_FINAL_SEMI_FINAL_X: f64 = 300.0;
const QF_FINAL_FINAL_X: f64 = 600.0;
const QF_FINAL_CHAMPION_X: f64 = 900.0;
const QF_FINAL_THIRD_PLACE_MATCH_X: f64 = 900.0;

/// The two partial renderings of the bracket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewKind {
    Round1ToQuarterFinal,
    QuarterFinalToFinal,
}

impl ViewKind {
    pub fn from_slug(slug: &str) -> Option<ViewKind> {
        match slug {
            "round1-qf" => Some(ViewKind::Round1ToQuarterFinal),
            "qf-final" => Some(ViewKind::QuarterFinalToFinal),
            _ => None,
        }
    }

    fn includes(self, round: Round) -> bool {
        match self {
            ViewKind::Round1ToQuarterFinal => matches!(
                round,
                Round::GroupStage | Round::GroupWinner | Round::Wildcard | Round::QuarterFinal
            ),
            ViewKind::QuarterFinalToFinal => matches!(
                round,
                Round::QuarterFinal
                    | Round::SemiFinal
                    | Round::Final
                    | Round::Champion
                    | Round::ThirdPlaceContestant
                    | Round::ThirdPlace
            ),
        }
    }
}

/// Projects the full bracket down to one view: filters nodes to the view's
/// rounds, keeps only edges with both endpoints retained, and overrides
/// every kept node's position with the view's compact spacing. Slot
/// resolution is identical to the full bracket.
pub fn project_view(
    graph: &BattleGraph,
    kind: ViewKind,
    bagan_id: &str,
    peserta: &[Peserta],
    assignments: &[NodeAssignment],
) -> Result<BracketGraph, String> {
    let positions = match kind {
        ViewKind::Round1ToQuarterFinal => layout::layout(graph, &ROUND1_QF_SPACING)?,
        ViewKind::QuarterFinalToFinal => qf_final_positions(graph)?,
    };

    let mut bracket = compute_bracket(graph, bagan_id, peserta, assignments);

    bracket.nodes.retain(|node| kind.includes(node.round));
    let kept: std::collections::HashSet<String> =
        bracket.nodes.iter().map(|n| n.id.clone()).collect();

    for node in &mut bracket.nodes {
        node.position = *positions
            .get(&node.node)
            .ok_or_else(|| format!("no view position computed for node {}", node.node))?;
        node.feeders.retain(|feeder| kept.contains(feeder));
    }
    bracket
        .edges
        .retain(|edge| kept.contains(&edge.source) && kept.contains(&edge.target));

    Ok(bracket)
}

/// Positions for the quarterfinal-to-final view. Quarterfinals are stacked
/// on a fixed compact grid; later rounds are centered on their feeders the
/// same way the full layout does it. The third-place match sits below the
/// champion, its contestants straddling the match row.
fn qf_final_positions(graph: &BattleGraph) -> Result<HashMap<NodeId, Position>, String> {
    let mut positions: HashMap<NodeId, Position> = HashMap::new();

    for (index, battle) in graph.quarter_finals().iter().enumerate() {
        positions.insert(
            NodeId::QuarterFinal { id: battle.id },
            Position {
                x: QF_FINAL_QUARTER_FINAL_X,
                y: QF_FINAL_QF_START_Y + index as f64 * QF_FINAL_QF_GAP,
            },
        );
    }

    for battle in graph.semi_finals() {
        let y = feeder_mean(&positions, NodeId::SemiFinal { id: battle.id }, graph)?;
        positions.insert(
            NodeId::SemiFinal { id: battle.id },
            Position { x: QF_FINAL_SEMI_FINAL_X, y },
        );
    }

    for battle in graph.finals() {
        let y = feeder_mean(&positions, NodeId::Final { id: battle.id }, graph)?;
        positions.insert(
            NodeId::Final { id: battle.id },
            Position { x: QF_FINAL_FINAL_X, y },
        );
    }

    let champion_y = feeder_mean(&positions, NodeId::Champion, graph)?;
    positions.insert(
        NodeId::Champion,
        Position { x: QF_FINAL_CHAMPION_X, y: champion_y },
    );

    let third_place_y = champion_y + QF_FINAL_PERSON_GAP * 2.0;
    let contestant_count = graph.finals().len();
    for index in 0..contestant_count {
        let offset = (index as f64 - (contestant_count as f64 - 1.0) / 2.0) * QF_FINAL_PERSON_GAP;
        positions.insert(
            NodeId::ThirdPlaceContestant { id: index + 1 },
            Position {
                x: QF_FINAL_THIRD_PLACE_MATCH_X,
                y: third_place_y + offset,
            },
        );
    }
    positions.insert(
        NodeId::ThirdPlace,
        Position { x: QF_FINAL_THIRD_PLACE_MATCH_X, y: third_place_y },
    );

    Ok(positions)
}

fn feeder_mean(
    positions: &HashMap<NodeId, Position>,
    id: NodeId,
    graph: &BattleGraph,
) -> Result<f64, String> {
    let feeders = graph.feeders(id);
    if feeders.is_empty() {
        return Err(format!("node {id} has no feeders to center on"));
    }
    let mut sum = 0.0;
    for feeder in &feeders {
        let position = positions
            .get(feeder)
            .ok_or_else(|| format!("feeder {feeder} of {id} has no position"))?;
        sum += position.y;
    }
    Ok(sum / feeders.len() as f64)
}
