//! Transactions
//!
//! A transaction applies one dirty edit to a working copy of the graph and
//! reports the epicenter: the vertices it touched directly. It must leave the
//! graph structurally valid, but may leave it geometrically dirty (coincident
//! vertices, vertices sitting on edges, redundant collinear points). Cleaning
//! that up is the rule pipeline's job.
//!
//! Targets that no longer exist are skipped silently; a transaction whose
//! every target is stale returns an empty epicenter and changes nothing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::{GeometryPolicy, Point};
use crate::graph::{EdgeId, GraphState, VertexId};

/// Per-execution inputs and side outputs of a transaction.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub geometry: GeometryPolicy,
    anchors: BTreeSet<VertexId>,
    edge_origins: BTreeMap<EdgeId, EdgeId>,
}

impl TransactionContext {
    pub fn new(geometry: GeometryPolicy) -> Self {
        Self {
            geometry,
            anchors: BTreeSet::new(),
            edge_origins: BTreeMap::new(),
        }
    }

    /// Treat `v` as anchored for the resolve that follows this transaction,
    /// before any side table knows about it.
    pub fn anchor(&mut self, v: VertexId) {
        self.anchors.insert(v);
    }

    pub fn anchors(&self) -> &BTreeSet<VertexId> {
        &self.anchors
    }

    /// Record that `created` replaces part of `from`, so the resolve and
    /// the domain wrappers treat it as carrying `from`'s metadata.
    pub fn record_edge(&mut self, created: EdgeId, from: EdgeId) {
        let origin = self.edge_origins.get(&from).copied().unwrap_or(from);
        self.edge_origins.insert(created, origin);
    }

    pub fn edge_origins(&self) -> &BTreeMap<EdgeId, EdgeId> {
        &self.edge_origins
    }

    pub fn into_parts(self) -> (BTreeSet<VertexId>, BTreeMap<EdgeId, EdgeId>) {
        (self.anchors, self.edge_origins)
    }
}

pub trait Transaction {
    fn name(&self) -> &str;

    /// Apply the edit and return the epicenter.
    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId>;

    /// Metadata-only transactions skip the rule pipeline entirely.
    fn is_metadata_only(&self) -> bool {
        false
    }
}

/// How two vertices that are not axis-aligned get connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// One straight edge, whatever its angle.
    Direct,
    /// Horizontal leg first, corner at `(to.x, from.y)`.
    #[default]
    HorizontalFirst,
    /// Vertical leg first, corner at `(from.x, to.y)`.
    VerticalFirst,
}

/// Reuse the vertex at `point`, split the edge passing through it, or create
/// a fresh vertex. Halves of a split edge are recorded against the original.
pub fn get_or_create_vertex(
    state: &mut GraphState,
    point: Point,
    ctx: &mut TransactionContext,
) -> VertexId {
    let epsilon = ctx.geometry.epsilon;
    let point = ctx.geometry.snap(point);
    if let Some(v) = state.find_vertex(&point, epsilon) {
        return v;
    }
    if let Some(e) = state.find_edge(&point, epsilon) {
        if let Some(edge) = state.edge(e).copied() {
            if let Some(v) = state.split_edge(e, point) {
                for end in edge.endpoints() {
                    if let Some(half) = state.edge_between(end, v) {
                        ctx.record_edge(half, e);
                    }
                }
                return v;
            }
        }
    }
    state.add_vertex(point, None)
}

/// Connect `a` to `b`, inserting one corner vertex when the pair is not on an
/// admissible axis. Returns every vertex touched.
pub fn route(
    state: &mut GraphState,
    a: VertexId,
    b: VertexId,
    strategy: RouteStrategy,
    ctx: &mut TransactionContext,
) -> BTreeSet<VertexId> {
    let (Some(pa), Some(pb)) = (state.point(a), state.point(b)) else {
        return BTreeSet::new();
    };
    let mut touched = BTreeSet::from([a, b]);
    if a == b {
        return touched;
    }

    let corner = match strategy {
        _ if ctx.geometry.is_admissible(&pa, &pb) => None,
        RouteStrategy::Direct => None,
        RouteStrategy::HorizontalFirst => Some(Point::new(pb.x, pa.y)),
        RouteStrategy::VerticalFirst => Some(Point::new(pa.x, pb.y)),
    };

    match corner {
        None => {
            state.add_edge(a, b);
        }
        Some(at) => {
            let c = get_or_create_vertex(state, at, ctx);
            state.add_edge(a, c);
            state.add_edge(c, b);
            touched.insert(c);
        }
    }
    touched
}

fn with_neighbors(
    state: &GraphState,
    seeds: impl IntoIterator<Item = VertexId>,
) -> BTreeSet<VertexId> {
    let mut out = BTreeSet::new();
    for v in seeds {
        if state.contains_vertex(v) {
            out.insert(v);
            out.extend(state.neighbors(v).into_iter().map(|(_, n)| n));
        }
    }
    out
}

/// Find or materialize a vertex at a point. The requested vertex is held
/// for the resolve that follows, so a split point is not collapsed straight
/// back out before the caller attaches to it.
#[derive(Debug, Clone)]
pub struct GetOrCreateVertex {
    pub at: Point,
}

impl Transaction for GetOrCreateVertex {
    fn name(&self) -> &str {
        "get_or_create_vertex"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let v = get_or_create_vertex(state, self.at, ctx);
        ctx.anchor(v);
        BTreeSet::from([v])
    }
}

/// Materialize a vertex at a point and anchor it for the following resolve.
#[derive(Debug, Clone)]
pub struct PlacePin {
    pub at: Point,
}

impl Transaction for PlacePin {
    fn name(&self) -> &str {
        "place_pin"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let v = get_or_create_vertex(state, self.at, ctx);
        ctx.anchor(v);
        BTreeSet::from([v])
    }
}

/// Connect two existing vertices.
#[derive(Debug, Clone)]
pub struct ConnectVertices {
    pub from: VertexId,
    pub to: VertexId,
    pub strategy: RouteStrategy,
}

impl Transaction for ConnectVertices {
    fn name(&self) -> &str {
        "connect_vertices"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        route(state, self.from, self.to, self.strategy, ctx)
    }
}

/// Connect two points, materializing vertices at both ends.
#[derive(Debug, Clone)]
pub struct ConnectPoints {
    pub from: Point,
    pub to: Point,
    pub strategy: RouteStrategy,
}

impl Transaction for ConnectPoints {
    fn name(&self) -> &str {
        "connect_points"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let a = get_or_create_vertex(state, self.from, ctx);
        let b = get_or_create_vertex(state, self.to, ctx);
        route(state, a, b, self.strategy, ctx)
    }
}

/// Delete a mixed set of vertices and edges. Vertex deletion cascades to
/// incident edges.
#[derive(Debug, Clone, Default)]
pub struct DeleteItems {
    pub vertices: BTreeSet<VertexId>,
    pub edges: BTreeSet<EdgeId>,
}

impl Transaction for DeleteItems {
    fn name(&self) -> &str {
        "delete_items"
    }

    fn apply(&self, state: &mut GraphState, _ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let mut epicenter = BTreeSet::new();
        for e in &self.edges {
            if let Some(edge) = state.remove_edge(*e) {
                epicenter.extend(edge.endpoints());
            }
        }
        for v in &self.vertices {
            if state.contains_vertex(*v) {
                epicenter.extend(state.neighbors(*v).into_iter().map(|(_, n)| n));
                state.remove_vertex(*v);
            }
        }
        epicenter.retain(|v| state.contains_vertex(*v));
        epicenter
    }
}

/// Reposition one vertex without touching its edges.
#[derive(Debug, Clone)]
pub struct MoveVertex {
    pub vertex: VertexId,
    pub to: Point,
}

impl Transaction for MoveVertex {
    fn name(&self) -> &str {
        "move_vertex"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        if !state.move_vertex(self.vertex, ctx.geometry.snap(self.to)) {
            return BTreeSet::new();
        }
        with_neighbors(state, [self.vertex])
    }
}

/// Replace the whole state and normalize around a caller-supplied epicenter.
#[derive(Debug, Clone)]
pub struct LoadState {
    pub state: GraphState,
    pub epicenter: BTreeSet<VertexId>,
}

impl Transaction for LoadState {
    fn name(&self) -> &str {
        "load_state"
    }

    fn apply(&self, state: &mut GraphState, _ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        *state = self.state.clone();
        self.epicenter
            .iter()
            .copied()
            .filter(|v| state.contains_vertex(*v))
            .collect()
    }
}

/// Re-run the pipeline around existing vertices without editing anything.
#[derive(Debug, Clone, Default)]
pub struct Normalize {
    pub epicenter: BTreeSet<VertexId>,
}

impl Normalize {
    /// Normalize around every vertex of `state`.
    pub fn everything(state: &GraphState) -> Self {
        Self {
            epicenter: state.vertex_ids().collect(),
        }
    }
}

impl Transaction for Normalize {
    fn name(&self) -> &str {
        "normalize"
    }

    fn apply(&self, state: &mut GraphState, _ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        self.epicenter
            .iter()
            .copied()
            .filter(|v| state.contains_vertex(*v))
            .collect()
    }
}

/// A polyline of consecutive segments.
#[derive(Debug, Clone)]
pub struct AddPath {
    pub points: Vec<Point>,
    pub strategy: RouteStrategy,
}

impl Transaction for AddPath {
    fn name(&self) -> &str {
        "add_path"
    }

    fn apply(&self, state: &mut GraphState, ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let mut epicenter = BTreeSet::new();
        let mut previous: Option<VertexId> = None;
        for point in &self.points {
            let v = get_or_create_vertex(state, *point, ctx);
            if let Some(p) = previous {
                epicenter.extend(route(state, p, v, self.strategy, ctx));
            }
            epicenter.insert(v);
            previous = Some(v);
        }
        epicenter
    }
}

/// Name the net a vertex belongs to. Changes no topology.
#[derive(Debug, Clone)]
pub struct SetNetLabel {
    pub vertex: VertexId,
    pub label: Option<String>,
}

impl Transaction for SetNetLabel {
    fn name(&self) -> &str {
        "set_net_label"
    }

    fn apply(&self, state: &mut GraphState, _ctx: &mut TransactionContext) -> BTreeSet<VertexId> {
        let Some(cluster) = state.vertex(self.vertex).and_then(|v| v.cluster) else {
            return BTreeSet::new();
        };
        state.set_cluster_label(cluster, self.label.clone());
        BTreeSet::new()
    }

    fn is_metadata_only(&self) -> bool {
        true
    }
}
