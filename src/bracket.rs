use serde::Serialize;

use crate::layout::Position;
use crate::resolve::{DisplaySlot, Resolver};
use crate::topology::{BattleGraph, NodeId, Round};
use crate::types::{NodeAssignment, Peserta};

// ── Output shapes ──────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketNode {
    pub id: String,
    #[serde(skip)]
    pub node: NodeId,
    pub round: Round,
    pub feeders: Vec<String>,
    pub position: Position,
    pub slot: DisplaySlot,
    pub role: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketGraph {
    pub bagan_id: String,
    pub nodes: Vec<BracketNode>,
    pub edges: Vec<BracketEdge>,
}

// ── Assembly ───────────────────────────────────────────────────────────

/// Assembles the full renderable bracket: every topology node with its
/// position, resolved slot, and role, plus one edge per feeder link.
/// Total function of its inputs; the same stores always produce the same
/// graph, and bad data degrades to placeholders rather than failures.
pub fn compute_bracket(
    graph: &BattleGraph,
    bagan_id: &str,
    peserta: &[Peserta],
    assignments: &[NodeAssignment],
) -> BracketGraph {
    let resolver = Resolver::new(bagan_id, peserta, assignments);

    let nodes = graph
        .node_ids()
        .into_iter()
        .map(|id| BracketNode {
            id: id.to_string(),
            node: id,
            round: id.round(),
            feeders: graph.feeders(id).iter().map(NodeId::to_string).collect(),
            position: graph
                .position(id)
                .expect("validated graph has a position for every node"),
            slot: resolver.resolve(graph, id),
            role: graph.role(id),
        })
        .collect();

    let edges = graph
        .edge_pairs()
        .into_iter()
        .map(|(source, target)| BracketEdge {
            id: format!("{source}_to_{target}"),
            source: source.to_string(),
            target: target.to_string(),
        })
        .collect();

    BracketGraph {
        bagan_id: bagan_id.to_string(),
        nodes,
        edges,
    }
}
