//! Rule pipeline
//!
//! An ordered list of pure normalization rules. Each rule takes the dirty
//! state and returns a cleaner one, narrowing or widening the working scope
//! for the rules after it. Order is load-bearing:
//!
//! 1. merge coincident vertices
//! 2. split edges at vertices lying on them
//! 3. collapse redundant collinear runs
//! 4. remove isolated free vertices
//! 5. assign net ids
//!
//! Running the default ruleset twice yields the same state as running it once.

pub mod cluster;
pub mod collapse;
pub mod isolated;
pub mod merge;
pub mod split;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::geometry::GeometryPolicy;
use crate::graph::{EdgeId, GraphState, VertexId};
use crate::net;
use crate::policy::MetadataPolicy;

pub use cluster::AssignClusterIds;
pub use collapse::CollapseCollinearRuns;
pub use isolated::RemoveIsolatedVertices;
pub use merge::MergeCoincident;
pub use split::SplitEdgesAtVertices;

/// Working context threaded through one resolve.
pub struct ResolveContext<'a> {
    pub geometry: GeometryPolicy,
    policy: &'a dyn MetadataPolicy,
    anchors: BTreeSet<VertexId>,
    scope: BTreeSet<VertexId>,
    lineage: Lineage,
}

/// Where merged vertices and rebuilt edges came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lineage {
    pub vertex_merges: BTreeMap<VertexId, VertexId>,
    pub edge_origins: BTreeMap<EdgeId, EdgeId>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        geometry: GeometryPolicy,
        policy: &'a dyn MetadataPolicy,
        anchors: BTreeSet<VertexId>,
        epicenter: BTreeSet<VertexId>,
    ) -> Self {
        Self {
            geometry,
            policy,
            anchors,
            scope: epicenter,
            lineage: Lineage::default(),
        }
    }

    /// Start from lineage already recorded by the transaction, e.g. the
    /// halves of an edge it split.
    pub fn with_edge_origins(mut self, origins: BTreeMap<EdgeId, EdgeId>) -> Self {
        self.lineage.edge_origins = origins;
        self
    }

    pub fn scope(&self) -> &BTreeSet<VertexId> {
        &self.scope
    }

    pub fn set_scope(&mut self, scope: BTreeSet<VertexId>) {
        self.scope = scope;
    }

    pub fn is_anchored(&self, v: VertexId) -> bool {
        self.anchors.contains(&v) || self.policy.is_anchored(v)
    }

    /// Compare edges by the metadata of the pre-resolve edges they descend from.
    pub fn edges_agree(&self, a: EdgeId, b: EdgeId) -> bool {
        self.policy.edges_agree(self.origin_of(a), self.origin_of(b))
    }

    pub fn origin_of(&self, e: EdgeId) -> EdgeId {
        self.lineage.edge_origins.get(&e).copied().unwrap_or(e)
    }

    pub fn record_merge(&mut self, victim: VertexId, survivor: VertexId) {
        if self.anchors.remove(&victim) {
            self.anchors.insert(survivor);
        }
        self.lineage.vertex_merges.insert(victim, survivor);
    }

    /// Record that `created` carries the metadata of `from`.
    pub fn record_edge(&mut self, created: EdgeId, from: EdgeId) {
        let origin = self.origin_of(from);
        self.lineage.edge_origins.insert(created, origin);
    }

    pub fn into_lineage(self) -> Lineage {
        self.lineage
    }
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn apply(&self, state: GraphState, ctx: &mut ResolveContext<'_>) -> GraphState;
}

pub struct Ruleset {
    rules: Vec<Arc<dyn Rule>>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_default_rules() -> Self {
        let mut ruleset = Self::new();
        ruleset.add_rule(Arc::new(MergeCoincident));
        ruleset.add_rule(Arc::new(SplitEdgesAtVertices));
        ruleset.add_rule(Arc::new(CollapseCollinearRuns));
        ruleset.add_rule(Arc::new(RemoveIsolatedVertices));
        ruleset.add_rule(Arc::new(AssignClusterIds));
        ruleset
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Normalize `state` around `epicenter`. The working scope starts as
    /// everything connected to the epicenter.
    pub fn resolve(
        &self,
        state: GraphState,
        epicenter: &BTreeSet<VertexId>,
        geometry: GeometryPolicy,
        policy: &dyn MetadataPolicy,
        anchors: BTreeSet<VertexId>,
    ) -> (GraphState, Lineage) {
        self.resolve_with_origins(state, epicenter, geometry, policy, anchors, BTreeMap::new())
    }

    /// Like [`Ruleset::resolve`], with edge lineage the transaction recorded.
    pub fn resolve_with_origins(
        &self,
        state: GraphState,
        epicenter: &BTreeSet<VertexId>,
        geometry: GeometryPolicy,
        policy: &dyn MetadataPolicy,
        anchors: BTreeSet<VertexId>,
        edge_origins: BTreeMap<EdgeId, EdgeId>,
    ) -> (GraphState, Lineage) {
        let scope = net::reachable(&state, epicenter.iter().copied());
        let mut ctx = ResolveContext::new(geometry, policy, anchors, scope)
            .with_edge_origins(edge_origins);
        let mut state = state;
        for rule in &self.rules {
            state = rule.apply(state, &mut ctx);
            tracing::debug!(
                "rule {} -> {} vertices, {} edges, scope {}",
                rule.id(),
                state.vertex_count(),
                state.edge_count(),
                ctx.scope().len()
            );
        }
        let mut lineage = ctx.into_lineage();
        lineage.edge_origins.retain(|e, _| state.contains_edge(*e));
        (state, lineage)
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::policy::NoMetadata;

    fn resolve_all(state: GraphState) -> GraphState {
        let epicenter: BTreeSet<VertexId> = state.vertex_ids().collect();
        Ruleset::with_default_rules()
            .resolve(state, &epicenter, GeometryPolicy::default(), &NoMetadata, BTreeSet::new())
            .0
    }

    #[test]
    fn test_default_rule_order() {
        let ids: Vec<String> = Ruleset::with_default_rules()
            .rules()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(
            ids,
            [
                "merge_coincident",
                "split_edges",
                "collapse_collinear",
                "remove_isolated",
                "assign_clusters"
            ]
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut g = GraphState::new();
        let a = g.add_vertex(Point::new(0.0, 0.0), None);
        let b = g.add_vertex(Point::new(10.0, 0.0), None);
        let c = g.add_vertex(Point::new(10.0, 0.0), None);
        let d = g.add_vertex(Point::new(10.0, 10.0), None);
        let m = g.add_vertex(Point::new(4.0, 0.0), None);
        let lone = g.add_vertex(Point::new(50.0, 50.0), None);
        g.add_edge(a, b);
        g.add_edge(c, d);
        let _ = (m, lone);

        let once = resolve_all(g);
        let twice = resolve_all(once.clone());
        assert_eq!(once, twice);
        assert!(once.is_consistent());
        // m splits a-b and is then collapsed back out; lone is dropped
        assert_eq!(once.vertex_count(), 3);
        assert_eq!(once.edge_count(), 2);
    }
}
