//! Split edges at vertices lying on them.

use std::collections::BTreeSet;

use super::{ResolveContext, Rule};
use crate::graph::{EdgeId, GraphState, VertexId};

/// For every edge, every non-endpoint vertex on its segment becomes a
/// junction: the edge is replaced by a chain through those vertices, each
/// piece inheriting the original edge's metadata.
pub struct SplitEdgesAtVertices;

impl Rule for SplitEdgesAtVertices {
    fn id(&self) -> &str {
        "split_edges"
    }

    fn name(&self) -> &str {
        "Split edges at passing vertices"
    }

    fn apply(&self, mut state: GraphState, ctx: &mut ResolveContext<'_>) -> GraphState {
        let mut scope = ctx.scope().clone();
        let edges: Vec<EdgeId> = state.edge_ids().collect();

        for e in edges {
            let (Some(edge), Some((a, b))) = (state.edge(e).copied(), state.segment(e)) else {
                continue;
            };

            let mut passing: Vec<(f64, VertexId)> = state
                .vertices()
                .filter(|v| !edge.touches(v.id))
                .filter(|v| {
                    !ctx.geometry.same_point(&v.point, &a) && !ctx.geometry.same_point(&v.point, &b)
                })
                .filter(|v| ctx.geometry.point_on_segment(&v.point, &a, &b))
                .map(|v| (v.point.distance_to(&a), v.id))
                .collect();
            if passing.is_empty() {
                continue;
            }
            passing.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

            state.remove_edge(e);
            let mut previous = edge.start;
            for (_, v) in &passing {
                if let Some(piece) = state.add_edge(previous, *v) {
                    ctx.record_edge(piece, e);
                }
                previous = *v;
                scope.insert(*v);
            }
            if let Some(piece) = state.add_edge(previous, edge.end) {
                ctx.record_edge(piece, e);
            }
            scope.insert(edge.start);
            scope.insert(edge.end);
        }

        ctx.set_scope(scope);
        state
    }
}
