// One-shot "tidy" of the whole map.
//
// 1. BFS levels from the center (leftmost) node, edges walked both ways
// 2. Every level gets its own column: left edge = center.left + level * spacing
// 3. Nodes owning a bus are staggered so no two buses in a level coincide
// 4. Inside a level, nodes are pushed down (with their subtrees) to keep a gap
// 5. All connectors are rerouted
// 6. Connector crossings are removed by pushing the lower subtree of each
//    crossing pair below the upper one, within fixed bounds, and step 4 is
//    run again
//
// Nodes not reachable from the center keep their position.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::geometry::PointF;
use crate::model::{EdgeId, MindMap, NodeId};
use super::placement::subtree_bbox;
use super::spacing::{translate_subtree_vertical, NodeMove};
use super::LayoutConfig;

pub fn align_generations(graph: &mut MindMap, cfg: &LayoutConfig) -> Vec<NodeMove> {
    let Some(center) = graph.center_node() else { return Vec::new() };
    let Some(center_rect) = graph.node_rect(center) else { return Vec::new() };
    let before = graph.positions();

    let levels = graph.generations_from(center);
    let mut by_level: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    for (nid, level) in &levels {
        by_level.entry(*level).or_default().push(*nid);
    }

    let half_w = graph.node_size().w / 2.0;
    for (nid, level) in &levels {
        let Some(p) = graph.position(*nid) else { continue };
        let x = center_rect.left() + *level as f64 * cfg.align_lane_spacing + half_w;
        let _ = graph.set_position_raw(*nid, PointF::new(x, p.y));
    }

    for members in by_level.values() {
        stagger_buses(graph, members, cfg);
    }

    for members in by_level.values() {
        enforce_level_gap(graph, members, cfg.align_min_gap);
    }

    graph.refresh_all_edges();

    if resolve_crossings(graph, cfg) {
        for members in by_level.values() {
            enforce_level_gap(graph, members, cfg.align_min_gap);
        }
        graph.refresh_all_edges();
    }

    let moves: Vec<NodeMove> = graph
        .positions()
        .into_iter()
        .filter_map(|(id, to)| {
            let from = before.get(&id).copied()?;
            (from != to).then_some(NodeMove { id, from, to })
        })
        .collect();
    info!("align: {} levels, {} nodes moved", by_level.len(), moves.len());
    moves
}

/// Pairs of connectors that properly cross, ignoring pairs sharing a node.
pub fn connector_crossings(graph: &MindMap) -> Vec<(EdgeId, EdgeId)> {
    let edges: Vec<_> = graph.edges().collect();
    let mut out = Vec::new();
    for (i, e1) in edges.iter().enumerate() {
        for e2 in &edges[i + 1..] {
            if e1.touches(e2.source) || e1.touches(e2.target) {
                continue;
            }
            let s1 = e1.connector.segments();
            let s2 = e2.connector.segments();
            if s1.iter().any(|a| s2.iter().any(|b| a.crosses(b))) {
                out.push((e1.id, e2.id));
            }
        }
    }
    out
}

/// Push lower subtrees below upper ones until no connectors cross, or a bound
/// is hit. Returns whether anything moved.
fn resolve_crossings(graph: &mut MindMap, cfg: &LayoutConfig) -> bool {
    let mut moved = false;
    for _ in 0..cfg.crossing_max_rounds {
        let crossings = connector_crossings(graph);
        if crossings.is_empty() {
            break;
        }
        if crossings.len() > cfg.crossing_limit {
            warn!("align: {} connector crossings, leaving them", crossings.len());
            break;
        }
        let owners: BTreeSet<NodeId> = crossings
            .iter()
            .flat_map(|(a, b)| [*a, *b])
            .filter_map(|eid| graph.edge(eid))
            .flat_map(|e| [e.source, e.target])
            .collect();
        if owners.len() > cfg.crossing_node_limit {
            warn!("align: crossings involve {} nodes, leaving them", owners.len());
            break;
        }

        let Some((root, dy)) = crossings.iter().find_map(|(a, b)| crossing_push(graph, *a, *b, cfg)) else {
            debug!("align: {} crossings left that a push cannot fix", crossings.len());
            break;
        };
        debug!("align: pushing subtree {:?} down by {dy:.1} to uncross connectors", root);
        translate_subtree_vertical(graph, root, dy);
        moved = true;
    }
    moved
}

/// Subtree root and downward shift that take the lower source's subtree
/// clear of the upper source's subtree.
fn crossing_push(graph: &MindMap, a: EdgeId, b: EdgeId, cfg: &LayoutConfig) -> Option<(NodeId, f64)> {
    let (sa, sb) = (graph.edge(a)?.source, graph.edge(b)?.source);
    let (ya, yb) = (graph.position(sa)?.y, graph.position(sb)?.y);
    let (upper, lower) = if (ya, sa) <= (yb, sb) { (sa, sb) } else { (sb, sa) };

    let upper_tree = graph.subtree(upper);
    if upper_tree.contains(&lower) || graph.subtree(lower).contains(&upper) {
        return None;
    }
    let dy = subtree_bbox(graph, upper, true)?.bottom + cfg.align_min_gap - subtree_bbox(graph, lower, true)?.y;
    (dy > 0.0).then_some((lower, dy.min(cfg.crossing_max_push)))
}

/// Shift bus owners right until every bus X in the level is distinct,
/// walking them in (bus X, Y) order.
fn stagger_buses(graph: &mut MindMap, members: &[NodeId], cfg: &LayoutConfig) {
    let mut owners: Vec<(NodeId, f64, f64)> = members
        .iter()
        .filter(|nid| graph.has_children(**nid))
        .filter_map(|nid| graph.node_rect(*nid).map(|r| (*nid, r.right() + cfg.bus_offset, r.center().y)))
        .collect();
    owners.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)).then(a.0.cmp(&b.0)));

    let mut prev_bus: Option<f64> = None;
    for (nid, bus, _) in owners {
        let bus = match prev_bus {
            Some(prev) if bus <= prev => {
                let shifted = prev + cfg.align_bus_delta;
                if let Some(p) = graph.position(nid) {
                    let _ = graph.set_position_raw(nid, p.offset(shifted - bus, 0.0));
                }
                shifted
            }
            _ => bus,
        };
        prev_bus = Some(bus);
    }
}

/// Top to bottom, push each node (and its subtree) down until it clears the
/// lowest node above it by `min_gap`.
fn enforce_level_gap(graph: &mut MindMap, members: &[NodeId], min_gap: f64) {
    let mut ordered: Vec<(NodeId, f64)> = members
        .iter()
        .filter_map(|nid| graph.position(*nid).map(|p| (*nid, p.y)))
        .collect();
    ordered.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut lowest: Option<f64> = None;
    for (nid, _) in ordered {
        let Some(rect) = graph.node_rect(nid) else { continue };
        let mut bottom = rect.bottom();
        if let Some(prev) = lowest {
            let gap = rect.top() - prev;
            if gap < min_gap {
                let dy = min_gap - gap;
                translate_subtree_vertical(graph, nid, dy);
                bottom += dy;
            }
        }
        lowest = Some(lowest.map_or(bottom, |l| l.max(bottom)));
    }
}
