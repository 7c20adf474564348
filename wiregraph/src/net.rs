//! Net discovery
//!
//! Breadth-first search over the adjacency index, run on a petgraph
//! `UnGraphMap` view of the state. Net records are derived on demand from
//! the cluster tags; nothing here is stored between calls.

use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{ClusterId, EdgeId, GraphState, VertexId};

/// Summary of one connected component sharing a net id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetRecord {
    pub id: ClusterId,
    pub name: String,
    pub vertex_count: usize,
    pub edge_count: usize,
}

/// Undirected view of the state with edge ids as weights.
pub fn graph_map(state: &GraphState) -> UnGraphMap<VertexId, EdgeId> {
    let mut graph = UnGraphMap::with_capacity(state.vertex_count(), state.edge_count());
    for v in state.vertex_ids() {
        graph.add_node(v);
    }
    for edge in state.edges() {
        graph.add_edge(edge.start, edge.end, edge.id);
    }
    graph
}

fn bfs_from(graph: &UnGraphMap<VertexId, EdgeId>, seed: VertexId, into: &mut BTreeSet<VertexId>) {
    if !graph.contains_node(seed) {
        return;
    }
    let mut bfs = Bfs::new(graph, seed);
    while let Some(v) = bfs.next(graph) {
        into.insert(v);
    }
}

/// Every vertex connected to `seed`, including `seed` itself.
pub fn connected_vertices(state: &GraphState, seed: VertexId) -> BTreeSet<VertexId> {
    let mut out = BTreeSet::new();
    bfs_from(&graph_map(state), seed, &mut out);
    out
}

/// Union of the components containing any of `seeds`.
pub fn reachable(
    state: &GraphState,
    seeds: impl IntoIterator<Item = VertexId>,
) -> BTreeSet<VertexId> {
    let graph = graph_map(state);
    let mut out = BTreeSet::new();
    for seed in seeds {
        if !out.contains(&seed) {
            bfs_from(&graph, seed, &mut out);
        }
    }
    out
}

/// All connected components, ordered by their lowest vertex id.
pub fn connected_components(state: &GraphState) -> Vec<BTreeSet<VertexId>> {
    let graph = graph_map(state);
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for v in state.vertex_ids() {
        if seen.contains(&v) {
            continue;
        }
        let mut component = BTreeSet::new();
        bfs_from(&graph, v, &mut component);
        seen.extend(component.iter().copied());
        components.push(component);
    }
    components
}

pub fn net_of(state: &GraphState, v: VertexId) -> Option<ClusterId> {
    state.vertex(v).and_then(|vx| vx.cluster)
}

pub fn vertices_in_net(state: &GraphState, net: ClusterId) -> BTreeSet<VertexId> {
    state
        .vertices()
        .filter(|v| v.cluster == Some(net))
        .map(|v| v.id)
        .collect()
}

/// Edges whose start vertex carries `net` (after a resolve both ends agree).
pub fn edges_in_net(state: &GraphState, net: ClusterId) -> BTreeSet<EdgeId> {
    state
        .edges()
        .filter(|e| net_of(state, e.start) == Some(net))
        .map(|e| e.id)
        .collect()
}

/// Display name of a net: its label, or `Net-<id>`.
pub fn net_name(state: &GraphState, net: ClusterId) -> String {
    state
        .cluster_label(net)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("Net-{}", net.0))
}

/// One record per net id present on the graph, in id order.
pub fn net_records(state: &GraphState) -> Vec<NetRecord> {
    let mut vertex_counts: BTreeMap<ClusterId, usize> = BTreeMap::new();
    for v in state.vertices() {
        if let Some(c) = v.cluster {
            *vertex_counts.entry(c).or_default() += 1;
        }
    }
    let mut edge_counts: BTreeMap<ClusterId, usize> = BTreeMap::new();
    for e in state.edges() {
        if let Some(c) = net_of(state, e.start) {
            *edge_counts.entry(c).or_default() += 1;
        }
    }
    vertex_counts
        .into_iter()
        .map(|(id, vertex_count)| NetRecord {
            id,
            name: net_name(state, id),
            vertex_count,
            edge_count: edge_counts.get(&id).copied().unwrap_or(0),
        })
        .collect()
}
