//! PCB trace graph
//!
//! Traces carry a width and a copper layer per edge, held in a side table
//! keyed by edge id. The rule pipeline sees the table only through
//! [`MetadataPolicy::edges_agree`], so a vertex between traces of different
//! width or layer is a seam and survives collinear collapse.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::delta::GraphDelta;
use crate::engine::Engine;
use crate::geometry::{GeometryPolicy, Point};
use crate::graph::{ClusterId, EdgeId, GraphState, VertexId};
use crate::net::{self, NetRecord};
use crate::policy::MetadataPolicy;
use crate::transaction::{AddPath, DeleteItems, MoveVertex, RouteStrategy, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMetadata {
    pub width: f64,
    pub layer: String,
}

impl TraceMetadata {
    pub fn new(width: f64, layer: impl Into<String>) -> Self {
        Self {
            width,
            layer: layer.into(),
        }
    }
}

/// Policy view over the metadata table. The resolve asks about edges by
/// origin, so halves of a split trace resolve to the trace itself; edges the
/// table still does not know were drawn by the running transaction and carry
/// `pending`.
struct TraceView<'a> {
    table: &'a BTreeMap<EdgeId, TraceMetadata>,
    pending: Option<&'a TraceMetadata>,
}

impl TraceView<'_> {
    fn lookup(&self, e: EdgeId) -> Option<&TraceMetadata> {
        self.table.get(&e).or(self.pending)
    }
}

impl MetadataPolicy for TraceView<'_> {
    fn edges_agree(&self, a: EdgeId, b: EdgeId) -> bool {
        self.lookup(a) == self.lookup(b)
    }
}

pub struct TraceGraph {
    engine: Engine,
    edge_meta: BTreeMap<EdgeId, TraceMetadata>,
}

impl TraceGraph {
    pub fn new(geometry: GeometryPolicy) -> Self {
        Self {
            engine: Engine::new(geometry),
            edge_meta: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> &GraphState {
        self.engine.state()
    }

    pub fn geometry(&self) -> &GeometryPolicy {
        self.engine.geometry()
    }

    pub fn metadata(&self, e: EdgeId) -> Option<&TraceMetadata> {
        self.edge_meta.get(&e)
    }

    pub fn edges_on_layer(&self, layer: &str) -> BTreeSet<EdgeId> {
        self.edge_meta
            .iter()
            .filter(|(_, m)| m.layer == layer)
            .map(|(e, _)| *e)
            .collect()
    }

    /// Route a polyline of straight traces.
    pub fn add_path(&mut self, points: Vec<Point>, width: f64, layer: &str) -> GraphDelta {
        let meta = TraceMetadata::new(width, layer);
        self.run(
            &AddPath {
                points,
                strategy: RouteStrategy::Direct,
            },
            Some(meta),
        )
    }

    pub fn move_vertex(&mut self, vertex: VertexId, to: Point) -> GraphDelta {
        self.run(&MoveVertex { vertex, to }, None)
    }

    pub fn delete(&mut self, vertices: BTreeSet<VertexId>, edges: BTreeSet<EdgeId>) -> GraphDelta {
        self.run(&DeleteItems { vertices, edges }, None)
    }

    /// Change the width or layer of an existing trace. Topology is untouched.
    pub fn set_metadata(&mut self, e: EdgeId, meta: TraceMetadata) -> bool {
        match self.edge_meta.get_mut(&e) {
            Some(slot) => {
                *slot = meta;
                true
            }
            None => false,
        }
    }

    fn run(&mut self, transaction: &dyn Transaction, pending: Option<TraceMetadata>) -> GraphDelta {
        let view = TraceView {
            table: &self.edge_meta,
            pending: pending.as_ref(),
        };
        let delta = self.engine.execute_with(transaction, &view);
        self.apply_delta(&delta, pending.as_ref());
        delta
    }

    /// Carry metadata onto created edges: from the edge they descend from,
    /// else from the transaction's own metadata.
    fn apply_delta(&mut self, delta: &GraphDelta, pending: Option<&TraceMetadata>) {
        let mut fresh = Vec::new();
        for e in &delta.created_edges {
            let inherited = delta
                .edge_origins
                .get(e)
                .and_then(|origin| self.edge_meta.get(origin))
                .or(pending);
            match inherited {
                Some(meta) => fresh.push((*e, meta.clone())),
                None => tracing::warn!("trace edge {} created without metadata", e),
            }
        }
        for e in &delta.deleted_edges {
            self.edge_meta.remove(e);
        }
        self.edge_meta.extend(fresh);
    }

    pub fn net_of(&self, v: VertexId) -> Option<ClusterId> {
        net::net_of(self.state(), v)
    }

    pub fn nets(&self) -> Vec<NetRecord> {
        net::net_records(self.state())
    }

    pub fn net_vertices(&self, net: ClusterId) -> BTreeSet<VertexId> {
        net::vertices_in_net(self.state(), net)
    }

    pub fn net_edges(&self, net: ClusterId) -> BTreeSet<EdgeId> {
        net::edges_in_net(self.state(), net)
    }
}

impl Default for TraceGraph {
    fn default() -> Self {
        Self::new(GeometryPolicy::octilinear())
    }
}
