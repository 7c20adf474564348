//! Remove isolated free vertices.

use super::{ResolveContext, Rule};
use crate::graph::{GraphState, VertexId};

/// Drops every vertex with no edges unless it is anchored to a pin.
pub struct RemoveIsolatedVertices;

impl Rule for RemoveIsolatedVertices {
    fn id(&self) -> &str {
        "remove_isolated"
    }

    fn name(&self) -> &str {
        "Remove isolated free vertices"
    }

    fn apply(&self, mut state: GraphState, ctx: &mut ResolveContext<'_>) -> GraphState {
        let orphans: Vec<VertexId> = state
            .vertex_ids()
            .filter(|v| state.degree(*v) == 0 && !ctx.is_anchored(*v))
            .collect();
        let mut scope = ctx.scope().clone();
        for v in orphans {
            state.remove_vertex(v);
            scope.remove(&v);
        }
        ctx.set_scope(scope);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GeometryPolicy, Point};
    use crate::policy::NoMetadata;
    use std::collections::BTreeSet;

    #[test]
    fn test_anchored_orphans_survive() {
        let mut g = GraphState::new();
        let lone = g.add_vertex(Point::new(0.0, 0.0), None);
        let pin = g.add_vertex(Point::new(5.0, 0.0), None);
        let mut ctx = ResolveContext::new(
            GeometryPolicy::default(),
            &NoMetadata,
            BTreeSet::from([pin]),
            BTreeSet::new(),
        );
        let g = RemoveIsolatedVertices.apply(g, &mut ctx);
        assert!(!g.contains_vertex(lone));
        assert!(g.contains_vertex(pin));
    }
}
