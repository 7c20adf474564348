//! Collapse redundant collinear runs.

use std::collections::BTreeSet;

use super::{ResolveContext, Rule};
use crate::geometry::{Axis, GeometryPolicy};
use crate::graph::{GraphState, VertexId};

/// Walks straight runs through each scoped vertex along every admissible
/// axis and removes interior vertices that carry no information.
///
/// A vertex in a run is kept when it ends the run, is a junction (has edges
/// off the run), is anchored, or sits between edges whose metadata
/// disagrees. Runs shorter than three vertices are left alone. Each gap
/// between kept vertices is rebuilt as one edge inheriting the metadata of
/// the first edge of the gap; since seams are kept, every edge in a gap
/// already agrees.
pub struct CollapseCollinearRuns;

impl Rule for CollapseCollinearRuns {
    fn id(&self) -> &str {
        "collapse_collinear"
    }

    fn name(&self) -> &str {
        "Collapse collinear runs"
    }

    fn apply(&self, mut state: GraphState, ctx: &mut ResolveContext<'_>) -> GraphState {
        let mut scope = ctx.scope().clone();
        let starts: Vec<VertexId> = scope.iter().copied().collect();

        for start in starts {
            for axis in ctx.geometry.axes() {
                if !state.contains_vertex(start) {
                    break;
                }
                let run = collect_run(&state, start, *axis, &ctx.geometry);
                if run.len() < 3 {
                    continue;
                }

                let kept: Vec<usize> = (0..run.len())
                    .filter(|i| is_kept(&state, ctx, &run, *i))
                    .collect();

                for pair in kept.windows(2) {
                    let (i, j) = (pair[0], pair[1]);
                    if j == i + 1 {
                        continue;
                    }
                    let Some(inherit) = state.edge_between(run[i], run[i + 1]) else {
                        continue;
                    };
                    let inherit = ctx.origin_of(inherit);
                    for victim in &run[i + 1..j] {
                        state.remove_vertex(*victim);
                        scope.remove(victim);
                    }
                    if let Some(rebuilt) = state.add_edge(run[i], run[j]) {
                        ctx.record_edge(rebuilt, inherit);
                    }
                }
            }
        }

        ctx.set_scope(scope);
        state
    }
}

fn is_kept(state: &GraphState, ctx: &ResolveContext<'_>, run: &[VertexId], i: usize) -> bool {
    if i == 0 || i + 1 == run.len() {
        return true;
    }
    let v = run[i];
    if state.degree(v) > 2 || ctx.is_anchored(v) {
        return true;
    }
    match (state.edge_between(run[i - 1], v), state.edge_between(v, run[i + 1])) {
        (Some(before), Some(after)) => !ctx.edges_agree(before, after),
        _ => true,
    }
}

/// Maximal run of connected vertices through `start` along `axis`, ordered
/// in the axis direction.
fn collect_run(
    state: &GraphState,
    start: VertexId,
    axis: Axis,
    geometry: &GeometryPolicy,
) -> Vec<VertexId> {
    let mut visited = BTreeSet::from([start]);
    let mut backward = walk(state, start, axis, -1.0, geometry, &mut visited);
    let forward = walk(state, start, axis, 1.0, geometry, &mut visited);
    backward.reverse();
    backward.push(start);
    backward.extend(forward);
    backward
}

fn walk(
    state: &GraphState,
    start: VertexId,
    axis: Axis,
    sign: f64,
    geometry: &GeometryPolicy,
    visited: &mut BTreeSet<VertexId>,
) -> Vec<VertexId> {
    let (ux, uy) = axis.vector();
    let mut out = Vec::new();
    let mut current = start;
    while let Some(next) = step(state, current, axis, ux * sign, uy * sign, geometry, visited) {
        visited.insert(next);
        out.push(next);
        current = next;
    }
    out
}

fn step(
    state: &GraphState,
    from: VertexId,
    axis: Axis,
    ux: f64,
    uy: f64,
    geometry: &GeometryPolicy,
    visited: &BTreeSet<VertexId>,
) -> Option<VertexId> {
    let origin = state.point(from)?;
    state.neighbors(from).into_iter().find_map(|(_, n)| {
        if visited.contains(&n) {
            return None;
        }
        let p = state.point(n)?;
        let along = (p.x - origin.x) * ux + (p.y - origin.y) * uy;
        (Axis::between(&origin, &p, geometry.epsilon) == Some(axis) && along > 0.0).then_some(n)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::graph::EdgeId;
    use crate::policy::{MetadataPolicy, NoMetadata};

    fn straight(points: &[(f64, f64)]) -> (GraphState, Vec<VertexId>) {
        let mut g = GraphState::new();
        let ids: Vec<VertexId> = points
            .iter()
            .map(|(x, y)| g.add_vertex(Point::new(*x, *y), None))
            .collect();
        for pair in ids.windows(2) {
            g.add_edge(pair[0], pair[1]);
        }
        (g, ids)
    }

    fn run(g: GraphState, policy: &dyn MetadataPolicy, geometry: GeometryPolicy) -> GraphState {
        let scope = g.vertex_ids().collect();
        let mut ctx = ResolveContext::new(geometry, policy, BTreeSet::new(), scope);
        CollapseCollinearRuns.apply(g, &mut ctx)
    }

    #[test]
    fn test_collapses_free_interior_vertex() {
        let (g, ids) = straight(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let g = run(g, &NoMetadata, GeometryPolicy::default());
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.edge_between(ids[0], ids[2]).is_some());
    }

    #[test]
    fn test_keeps_corners_and_junctions() {
        let (mut g, ids) = straight(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 5.0)]);
        let branch = g.add_vertex(Point::new(5.0, 5.0), None);
        g.add_edge(ids[1], branch);
        let g = run(g, &NoMetadata, GeometryPolicy::default());
        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_keeps_anchored_vertex() {
        struct Pin(VertexId);
        impl MetadataPolicy for Pin {
            fn is_anchored(&self, v: VertexId) -> bool {
                v == self.0
            }
        }
        let (g, ids) = straight(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let g = run(g, &Pin(ids[1]), GeometryPolicy::default());
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_keeps_seam_between_disagreeing_edges() {
        struct Seam;
        impl MetadataPolicy for Seam {
            fn edges_agree(&self, a: EdgeId, b: EdgeId) -> bool {
                a.0 / 2 == b.0 / 2
            }
        }
        let (g, _) = straight(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        // edges 0,1 agree; 2,3 agree; 1,2 differ -> vertex at x=2 is a seam
        let g = run(g, &Seam, GeometryPolicy::default());
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert!(g.find_vertex(&Point::new(2.0, 0.0), 1e-6).is_some());
    }

    #[test]
    fn test_diagonal_runs_only_in_octilinear_mode() {
        let (g, _) = straight(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let ortho = run(g.clone(), &NoMetadata, GeometryPolicy::orthogonal());
        assert_eq!(ortho.vertex_count(), 3);
        let octo = run(g, &NoMetadata, GeometryPolicy::octilinear());
        assert_eq!(octo.vertex_count(), 2);
    }
}
