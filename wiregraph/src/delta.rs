//! Structural diff between two graph snapshots.
//!
//! The engine publishes one `GraphDelta` per mutation. Nothing inside the
//! engine consumes it; it exists for undo stacks, incremental redraws and the
//! domain wrappers' metadata bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::Point;
use crate::graph::{ClusterId, EdgeId, GraphState, VertexId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDelta {
    pub created_vertices: BTreeSet<VertexId>,
    /// Deleted vertices with their last known position.
    pub deleted_vertices: BTreeMap<VertexId, Point>,
    pub created_edges: BTreeSet<EdgeId>,
    pub deleted_edges: BTreeSet<EdgeId>,
    /// Surviving vertices whose position changed: `(old, new)`.
    pub moved_vertices: BTreeMap<VertexId, (Point, Point)>,
    /// Surviving vertices whose net tag changed: `(old, new)`.
    pub cluster_changes: BTreeMap<VertexId, (Option<ClusterId>, Option<ClusterId>)>,
    /// Net labels that changed: `(old, new)`.
    pub label_changes: BTreeMap<ClusterId, (Option<String>, Option<String>)>,
    /// Merge victims mapped to the vertex that absorbed them.
    pub vertex_merges: BTreeMap<VertexId, VertexId>,
    /// Created edges mapped to the pre-existing edge whose metadata they
    /// inherit: halves of an edge the transaction split, and edges the rule
    /// pipeline rebuilt.
    pub edge_origins: BTreeMap<EdgeId, EdgeId>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.created_vertices.is_empty()
            && self.deleted_vertices.is_empty()
            && self.created_edges.is_empty()
            && self.deleted_edges.is_empty()
            && self.moved_vertices.is_empty()
            && self.cluster_changes.is_empty()
            && self.label_changes.is_empty()
    }

    /// Follow merge links until reaching a vertex that was not merged away.
    pub fn survivor_of(&self, mut v: VertexId) -> VertexId {
        let mut hops = 0;
        while let Some(next) = self.vertex_merges.get(&v) {
            v = *next;
            hops += 1;
            if hops > self.vertex_merges.len() {
                break;
            }
        }
        v
    }

    /// Every vertex id the delta mentions.
    pub fn touched_vertices(&self) -> BTreeSet<VertexId> {
        self.created_vertices
            .iter()
            .chain(self.deleted_vertices.keys())
            .chain(self.moved_vertices.keys())
            .chain(self.cluster_changes.keys())
            .copied()
            .collect()
    }
}

/// Diff two snapshots. Lineage fields are left empty.
pub fn compute_delta(old: &GraphState, new: &GraphState) -> GraphDelta {
    let mut delta = GraphDelta::default();

    for v in old.vertices() {
        match new.vertex(v.id) {
            None => {
                delta.deleted_vertices.insert(v.id, v.point);
            }
            Some(nv) => {
                if nv.point != v.point {
                    delta.moved_vertices.insert(v.id, (v.point, nv.point));
                }
                if nv.cluster != v.cluster {
                    delta.cluster_changes.insert(v.id, (v.cluster, nv.cluster));
                }
            }
        }
    }
    delta.created_vertices = new
        .vertex_ids()
        .filter(|id| !old.contains_vertex(*id))
        .collect();

    delta.deleted_edges = old.edge_ids().filter(|id| !new.contains_edge(*id)).collect();
    delta.created_edges = new.edge_ids().filter(|id| !old.contains_edge(*id)).collect();

    let labels: BTreeSet<ClusterId> = old
        .cluster_labels()
        .keys()
        .chain(new.cluster_labels().keys())
        .copied()
        .collect();
    for id in labels {
        let before = old.cluster_label(id);
        let after = new.cluster_label(id);
        if before != after {
            delta
                .label_changes
                .insert(id, (before.map(str::to_owned), after.map(str::to_owned)));
        }
    }

    delta
}
