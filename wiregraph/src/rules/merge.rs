//! Merge coincident vertices.

use std::collections::BTreeSet;

use super::{ResolveContext, Rule};
use crate::graph::{GraphState, VertexId};

/// Fold every group of vertices sharing a point into one survivor.
///
/// An anchored vertex beats a free one; otherwise the lowest id wins. Victim
/// edges are rewired onto the survivor, and `add_edge` silently drops the
/// duplicates and self-loops that rewiring produces.
pub struct MergeCoincident;

impl Rule for MergeCoincident {
    fn id(&self) -> &str {
        "merge_coincident"
    }

    fn name(&self) -> &str {
        "Merge coincident vertices"
    }

    fn apply(&self, mut state: GraphState, ctx: &mut ResolveContext<'_>) -> GraphState {
        let mut out: BTreeSet<VertexId> = BTreeSet::new();
        let scope: Vec<VertexId> = ctx.scope().iter().copied().collect();

        for v in scope {
            let Some(point) = state.point(v) else {
                continue;
            };
            let group = state.vertices_near(&point, ctx.geometry.epsilon);
            if group.len() < 2 {
                out.insert(v);
                continue;
            }

            let survivor = group
                .iter()
                .copied()
                .find(|id| ctx.is_anchored(*id))
                .unwrap_or(group[0]);

            for victim in group.into_iter().filter(|id| *id != survivor) {
                for (edge, neighbor) in state.neighbors(victim) {
                    if let Some(rewired) = state.add_edge(survivor, neighbor) {
                        ctx.record_edge(rewired, edge);
                    }
                }
                state.remove_vertex(victim);
                ctx.record_merge(victim, survivor);
                out.remove(&victim);
            }
            out.insert(survivor);
        }

        ctx.set_scope(out);
        state
    }
}
