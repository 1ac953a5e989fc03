use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::{NavGraph, Node, NodeId, SNAP_TOLERANCE_NM};

/// Tunable knobs for one search invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// The search aborts once the cheapest frontier estimate exceeds this
    /// multiple of the direct start-to-destination distance. Bounds the
    /// worst case on sparse or disconnected regions without a wall clock.
    pub effort_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { effort_ratio: 4.0 }
    }
}

/// Successful search result: the node chain from start to destination
/// inclusive, and the summed edge cost the search minimized.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub path: Vec<Node>,
    pub cost_nm: f64,
    /// Nodes whose cost was finalized, for diagnostics.
    pub expanded: usize,
}

/// Find the lowest-cost path between two resolved nodes using A* over the
/// navigation graph.
///
/// The open list is a lazy-deletion binary heap: a node is pushed again on
/// every improvement and stale entries are dropped against the closed set at
/// pop time. The heuristic is the great-circle distance to the destination,
/// which never exceeds any leg cost the graph reports, so the first time the
/// destination is popped its cost is optimal. Ties on the estimate pop in
/// insertion order.
///
/// All search state lives in this invocation; the graph is only read, so any
/// number of searches may run against one graph concurrently.
pub fn find_route(
    graph: &NavGraph,
    start: &Node,
    dest: &Node,
    config: &SearchConfig,
) -> Result<SearchOutcome> {
    let direct_nm = start.pos.distance_to(&dest.pos);
    if start.id == dest.id || direct_nm <= SNAP_TOLERANCE_NM {
        return Ok(SearchOutcome {
            path: vec![start.clone()],
            cost_nm: 0.0,
            expanded: 0,
        });
    }

    let effort_bound_nm = config.effort_ratio * direct_nm;

    let mut g: HashMap<NodeId, f64> = HashMap::new();
    let mut predecessor: HashMap<NodeId, NodeId> = HashMap::new();
    let mut closed: HashSet<NodeId> = HashSet::new();
    let mut nodes: HashMap<NodeId, Node> = HashMap::new();
    let mut open = BinaryHeap::new();
    let mut sequence = 0u64;

    g.insert(start.id, 0.0);
    nodes.insert(start.id, start.clone());
    open.push(OpenEntry::new(start.id, direct_nm, sequence));

    while let Some(entry) = open.pop() {
        if closed.contains(&entry.node) {
            // Stale heap entry left behind by a later improvement.
            continue;
        }

        if entry.node == dest.id {
            let cost_nm = g.get(&dest.id).copied().unwrap_or(f64::INFINITY);
            let path = reconstruct_path(&predecessor, &nodes, start.id, dest.id);
            debug!(
                cost_nm,
                expanded = closed.len(),
                steps = path.len(),
                "route search succeeded"
            );
            return Ok(SearchOutcome {
                path,
                cost_nm,
                expanded: closed.len(),
            });
        }

        if entry.estimate.0 > effort_bound_nm {
            // Estimates only grow from here on, so no completion can stay
            // within the bound.
            debug!(
                explored_nm = entry.estimate.0,
                direct_nm,
                expanded = closed.len(),
                "route search aborted on effort bound"
            );
            return Err(Error::SearchEffortExceeded {
                explored_nm: entry.estimate.0,
                direct_nm,
            });
        }

        closed.insert(entry.node);
        let Some(current) = nodes.get(&entry.node).cloned() else {
            continue;
        };
        let current_cost = g.get(&entry.node).copied().unwrap_or(f64::INFINITY);

        for (successor, leg_cost) in graph.neighbors(&current, dest)? {
            if closed.contains(&successor.id) {
                continue;
            }

            let tentative = current_cost + leg_cost;
            if tentative < g.get(&successor.id).copied().unwrap_or(f64::INFINITY) {
                g.insert(successor.id, tentative);
                predecessor.insert(successor.id, current.id);
                let estimate = tentative + successor.pos.distance_to(&dest.pos);
                sequence += 1;
                open.push(OpenEntry::new(successor.id, estimate, sequence));
                nodes.insert(successor.id, successor);
            }
        }
    }

    debug!(expanded = closed.len(), "route search exhausted the frontier");
    Err(Error::NoRouteFound {
        from: start.label(),
        to: dest.label(),
    })
}

fn reconstruct_path(
    predecessor: &HashMap<NodeId, NodeId>,
    nodes: &HashMap<NodeId, Node>,
    start: NodeId,
    dest: NodeId,
) -> Vec<Node> {
    let mut path = Vec::new();
    let mut current = Some(dest);
    while let Some(id) = current {
        if let Some(node) = nodes.get(&id) {
            path.push(node.clone());
        }
        if id == start {
            break;
        }
        current = predecessor.get(&id).copied();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct OpenEntry {
    node: NodeId,
    estimate: FloatOrd,
    sequence: u64,
}

impl OpenEntry {
    fn new(node: NodeId, estimate: f64, sequence: u64) -> Self {
        Self {
            node,
            estimate: FloatOrd(estimate),
            sequence,
        }
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap on the estimate;
        // the sequence number keeps ties first-in-first-out.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_entries_pop_smallest_estimate_first() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenEntry::new(NodeId::Vor(1), 50.0, 0));
        heap.push(OpenEntry::new(NodeId::Vor(2), 10.0, 1));
        heap.push(OpenEntry::new(NodeId::Vor(3), 30.0, 2));

        let order: Vec<NodeId> = std::iter::from_fn(|| heap.pop().map(|e| e.node)).collect();
        assert_eq!(order, vec![NodeId::Vor(2), NodeId::Vor(3), NodeId::Vor(1)]);
    }

    #[test]
    fn equal_estimates_pop_in_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenEntry::new(NodeId::Vor(9), 25.0, 0));
        heap.push(OpenEntry::new(NodeId::Vor(4), 25.0, 1));
        heap.push(OpenEntry::new(NodeId::Vor(7), 25.0, 2));

        let order: Vec<NodeId> = std::iter::from_fn(|| heap.pop().map(|e| e.node)).collect();
        assert_eq!(order, vec![NodeId::Vor(9), NodeId::Vor(4), NodeId::Vor(7)]);
    }

    #[test]
    fn float_ord_total_ordering() {
        assert_eq!(FloatOrd(1.0).cmp(&FloatOrd(2.0)), Ordering::Less);
        assert_eq!(FloatOrd(2.0).cmp(&FloatOrd(2.0)), Ordering::Equal);
        assert_eq!(FloatOrd(3.0).cmp(&FloatOrd(2.0)), Ordering::Greater);
    }
}
