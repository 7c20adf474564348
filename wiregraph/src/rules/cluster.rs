//! Assign net ids.

use std::collections::BTreeSet;

use super::{ResolveContext, Rule};
use crate::graph::{ClusterId, GraphState};
use crate::net;

/// Flood-fills the graph and tags each connected component with one net id.
///
/// A component reuses an id already present on its vertices when one is
/// still unclaimed, preferring labelled ids so net names survive a merge of
/// two nets; otherwise a fresh id is minted. Labels of ids no component
/// claimed are pruned.
pub struct AssignClusterIds;

impl Rule for AssignClusterIds {
    fn id(&self) -> &str {
        "assign_clusters"
    }

    fn name(&self) -> &str {
        "Assign net ids"
    }

    fn apply(&self, mut state: GraphState, _ctx: &mut ResolveContext<'_>) -> GraphState {
        let mut claimed: BTreeSet<ClusterId> = BTreeSet::new();

        for component in net::connected_components(&state) {
            let present: BTreeSet<ClusterId> = component
                .iter()
                .filter_map(|v| state.vertex(*v).and_then(|vx| vx.cluster))
                .filter(|c| !claimed.contains(c))
                .collect();
            let chosen = present
                .iter()
                .copied()
                .find(|c| state.cluster_label(*c).is_some())
                .or_else(|| present.first().copied())
                .unwrap_or_else(|| state.mint_cluster());
            claimed.insert(chosen);
            for v in component {
                state.set_cluster(v, Some(chosen));
            }
        }

        let stale: Vec<ClusterId> = state
            .cluster_labels()
            .keys()
            .copied()
            .filter(|c| !claimed.contains(c))
            .collect();
        for c in stale {
            state.set_cluster_label(c, None);
        }
        state
    }
}
