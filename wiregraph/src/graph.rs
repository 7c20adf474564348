//! Graph State
//!
//! An arena of vertex and edge records addressed by generated ids. The whole
//! state is a plain value: cloning it is the snapshot mechanism, and no
//! record holds a reference to another record, only ids.
//!
//! Primitives here keep the structural invariants (edge endpoints exist,
//! adjacency mirrors edges exactly) but do no normalization. Invalid input
//! is a no-op returning `None`/`false`, never a panic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::{point_on_segment, GeometryPolicy, Point};

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

graph_id!(
    /// Identifier of a vertex within one graph lineage.
    VertexId,
    "v"
);
graph_id!(
    /// Identifier of an edge within one graph lineage.
    EdgeId,
    "e"
);
graph_id!(
    /// Net tag shared by every vertex of a connected component.
    ClusterId,
    "n"
);

/// A junction or pin anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub point: Point,
    pub cluster: Option<ClusterId>,
}

/// A straight connection between two distinct vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub start: VertexId,
    pub end: VertexId,
}

impl Edge {
    /// The endpoint opposite `v`, if `v` is an endpoint.
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if self.start == v {
            Some(self.end)
        } else if self.end == v {
            Some(self.start)
        } else {
            None
        }
    }

    pub fn touches(&self, v: VertexId) -> bool {
        self.start == v || self.end == v
    }

    pub fn endpoints(&self) -> [VertexId; 2] {
        [self.start, self.end]
    }
}

/// Value snapshot of the connectivity graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphState {
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeId, Edge>,
    adjacency: BTreeMap<VertexId, BTreeSet<EdgeId>>,
    cluster_labels: BTreeMap<ClusterId, String>,
    next_vertex: u64,
    next_edge: u64,
    next_cluster: u64,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn point(&self, id: VertexId) -> Option<Point> {
        self.vertices.get(&id).map(|v| v.point)
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edge ids incident to `v` (empty for unknown vertices).
    pub fn incident_edges(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.adjacency.get(&v).into_iter().flatten().copied()
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.adjacency.get(&v).map_or(0, |set| set.len())
    }

    /// `(edge, neighbor)` pairs around `v`, in edge-id order.
    pub fn neighbors(&self, v: VertexId) -> Vec<(EdgeId, VertexId)> {
        self.incident_edges(v)
            .filter_map(|e| {
                let edge = self.edges.get(&e)?;
                edge.other(v).map(|n| (e, n))
            })
            .collect()
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.incident_edges(a)
            .find(|e| self.edges.get(e).is_some_and(|edge| edge.other(a) == Some(b)))
    }

    pub fn add_vertex(&mut self, point: Point, cluster: Option<ClusterId>) -> VertexId {
        let id = VertexId(self.next_vertex);
        self.next_vertex += 1;
        self.vertices.insert(id, Vertex { id, point, cluster });
        self.adjacency.insert(id, BTreeSet::new());
        id
    }

    /// Connect `a` and `b`. Returns `None` when an endpoint is missing,
    /// `a == b`, or the pair is already connected.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        if a == b || !self.contains_vertex(a) || !self.contains_vertex(b) {
            return None;
        }
        if self.edge_between(a, b).is_some() {
            return None;
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(id, Edge { id, start: a, end: b });
        self.adjacency.entry(a).or_default().insert(id);
        self.adjacency.entry(b).or_default().insert(id);
        Some(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for v in edge.endpoints() {
            match self.adjacency.get_mut(&v) {
                Some(set) => {
                    set.remove(&id);
                }
                None => tracing::warn!("edge {} named vertex {} with no adjacency entry", id, v),
            }
        }
        Some(edge)
    }

    /// Remove a vertex and every edge incident to it.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        let incident: Vec<EdgeId> = self.incident_edges(id).collect();
        for e in incident {
            self.remove_edge(e);
        }
        self.adjacency.remove(&id);
        self.vertices.remove(&id)
    }

    pub fn move_vertex(&mut self, id: VertexId, to: Point) -> bool {
        match self.vertices.get_mut(&id) {
            Some(v) => {
                v.point = to;
                true
            }
            None => false,
        }
    }

    pub fn set_cluster(&mut self, id: VertexId, cluster: Option<ClusterId>) -> bool {
        match self.vertices.get_mut(&id) {
            Some(v) => {
                v.cluster = cluster;
                true
            }
            None => false,
        }
    }

    /// Nearest vertex within `tolerance` of `at`.
    pub fn find_vertex(&self, at: &Point, tolerance: f64) -> Option<VertexId> {
        self.vertices
            .values()
            .filter(|v| v.point.coincides(at, tolerance))
            .map(|v| (v.id, v.point.distance_to(at)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Every vertex within `tolerance` of `at`, in id order.
    pub fn vertices_near(&self, at: &Point, tolerance: f64) -> Vec<VertexId> {
        self.vertices
            .values()
            .filter(|v| v.point.coincides(at, tolerance))
            .map(|v| v.id)
            .collect()
    }

    /// Nearest edge whose segment passes through `at`.
    pub fn find_edge(&self, at: &Point, tolerance: f64) -> Option<EdgeId> {
        self.edges
            .values()
            .filter_map(|edge| {
                let (a, b) = self.segment(edge.id)?;
                point_on_segment(at, &a, &b, tolerance)
                    .then(|| (edge.id, GeometryPolicy::distance_to_segment(at, &a, &b)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Endpoint coordinates of an edge.
    pub fn segment(&self, id: EdgeId) -> Option<(Point, Point)> {
        let edge = self.edges.get(&id)?;
        Some((self.point(edge.start)?, self.point(edge.end)?))
    }

    /// Replace an edge with two halves meeting at a new vertex placed at `at`.
    pub fn split_edge(&mut self, id: EdgeId, at: Point) -> Option<VertexId> {
        let edge = *self.edges.get(&id)?;
        let cluster = self.vertex(edge.start).and_then(|v| v.cluster);
        self.remove_edge(id);
        let mid = self.add_vertex(at, cluster);
        self.add_edge(edge.start, mid);
        self.add_edge(mid, edge.end);
        Some(mid)
    }

    /// Replace an edge with two halves meeting at an existing vertex.
    /// Either half may be `None` if it already existed.
    pub fn split_edge_at_vertex(
        &mut self,
        id: EdgeId,
        v: VertexId,
    ) -> Option<(Option<EdgeId>, Option<EdgeId>)> {
        let edge = *self.edges.get(&id)?;
        if edge.touches(v) || !self.contains_vertex(v) {
            return None;
        }
        self.remove_edge(id);
        Some((self.add_edge(edge.start, v), self.add_edge(v, edge.end)))
    }

    /// Allocate a fresh net id.
    pub fn mint_cluster(&mut self) -> ClusterId {
        let id = ClusterId(self.next_cluster);
        self.next_cluster += 1;
        id
    }

    /// Make sure future mints do not collide with `id` (used when ids come
    /// from outside, e.g. a loaded document).
    pub fn reserve_cluster(&mut self, id: ClusterId) {
        self.next_cluster = self.next_cluster.max(id.0 + 1);
    }

    pub fn cluster_label(&self, id: ClusterId) -> Option<&str> {
        self.cluster_labels.get(&id).map(String::as_str)
    }

    pub fn cluster_labels(&self) -> &BTreeMap<ClusterId, String> {
        &self.cluster_labels
    }

    /// Set or clear a net label, returning the previous one.
    pub fn set_cluster_label(&mut self, id: ClusterId, label: Option<String>) -> Option<String> {
        match label {
            Some(text) => self.cluster_labels.insert(id, text),
            None => self.cluster_labels.remove(&id),
        }
    }

    /// Distinct cluster ids currently tagged on vertices.
    pub fn cluster_ids(&self) -> BTreeSet<ClusterId> {
        self.vertices.values().filter_map(|v| v.cluster).collect()
    }

    /// Check invariants 1-2: endpoints exist and adjacency mirrors the edge set.
    pub fn is_consistent(&self) -> bool {
        if self.adjacency.len() != self.vertices.len() {
            return false;
        }
        for edge in self.edges.values() {
            if edge.start == edge.end {
                return false;
            }
            for v in edge.endpoints() {
                if !self.adjacency.get(&v).is_some_and(|set| set.contains(&edge.id)) {
                    return false;
                }
            }
        }
        self.adjacency.iter().all(|(v, set)| {
            self.vertices.contains_key(v)
                && set
                    .iter()
                    .all(|e| self.edges.get(e).is_some_and(|edge| edge.touches(*v)))
        })
    }
}
