//! Engine
//!
//! Owns the committed graph state. Every discrete edit goes through
//! [`Engine::execute`]: snapshot, apply the transaction to a working copy,
//! normalize (unless the transaction is metadata-only), diff, commit, notify.
//! Interactive sessions push cheap un-normalized updates through
//! [`Engine::replace_state`] and commit once at the end.
//!
//! Observers receive the delta and the new state by shared reference, so they
//! cannot call back into the engine while it is mid-update.

use crate::delta::{compute_delta, GraphDelta};
use crate::geometry::GeometryPolicy;
use crate::graph::GraphState;
use crate::policy::{MetadataPolicy, NoMetadata};
use crate::rules::Ruleset;
use crate::transaction::{Transaction, TransactionContext};

type Observer = Box<dyn FnMut(&GraphDelta, &GraphState)>;

pub struct Engine {
    state: GraphState,
    ruleset: Ruleset,
    geometry: GeometryPolicy,
    observers: Vec<Observer>,
}

impl Engine {
    pub fn new(geometry: GeometryPolicy) -> Self {
        Self::with_ruleset(geometry, Ruleset::with_default_rules())
    }

    pub fn with_ruleset(geometry: GeometryPolicy, ruleset: Ruleset) -> Self {
        Self {
            state: GraphState::new(),
            ruleset,
            geometry,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn geometry(&self) -> &GeometryPolicy {
        &self.geometry
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Register a change callback, invoked after every commit.
    pub fn subscribe(&mut self, observer: impl FnMut(&GraphDelta, &GraphState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Execute a transaction with no domain metadata.
    pub fn execute(&mut self, transaction: &dyn Transaction) -> GraphDelta {
        self.execute_with(transaction, &NoMetadata)
    }

    /// Execute a transaction, consulting `policy` during normalization.
    pub fn execute_with(
        &mut self,
        transaction: &dyn Transaction,
        policy: &dyn MetadataPolicy,
    ) -> GraphDelta {
        let initial = &self.state;
        let mut dirty = initial.clone();
        let mut ctx = TransactionContext::new(self.geometry);
        let epicenter = transaction.apply(&mut dirty, &mut ctx);

        if epicenter.is_empty() && dirty == *initial {
            tracing::debug!("transaction {} changed nothing", transaction.name());
            return GraphDelta::default();
        }

        let (final_state, lineage) = if transaction.is_metadata_only() {
            (dirty, Default::default())
        } else {
            let (anchors, edge_origins) = ctx.into_parts();
            self.ruleset.resolve_with_origins(
                dirty,
                &epicenter,
                self.geometry,
                policy,
                anchors,
                edge_origins,
            )
        };

        let mut delta = compute_delta(initial, &final_state);
        delta.vertex_merges = lineage.vertex_merges;
        delta.edge_origins = lineage.edge_origins;

        tracing::debug!(
            "transaction {}: epicenter {}, +{}/-{} vertices, +{}/-{} edges",
            transaction.name(),
            epicenter.len(),
            delta.created_vertices.len(),
            delta.deleted_vertices.len(),
            delta.created_edges.len(),
            delta.deleted_edges.len()
        );

        self.commit(final_state, &delta);
        delta
    }

    /// Swap in a new state without normalizing it. Used by drag sessions.
    pub fn replace_state(&mut self, state: GraphState) -> GraphDelta {
        let delta = compute_delta(&self.state, &state);
        tracing::trace!(
            "raw replace: {} moved, {} created",
            delta.moved_vertices.len(),
            delta.created_vertices.len()
        );
        self.commit(state, &delta);
        delta
    }

    fn commit(&mut self, state: GraphState, delta: &GraphDelta) {
        self.state = state;
        for observer in &mut self.observers {
            observer(delta, &self.state);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(GeometryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::graph::VertexId;
    use crate::transaction::{ConnectPoints, DeleteItems, MoveVertex, RouteStrategy, SetNetLabel};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_execute_publishes_delta() {
        let mut engine = Engine::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.subscribe(move |delta, state| {
            sink.borrow_mut().push((delta.created_edges.len(), state.edge_count()));
        });

        engine.execute(&ConnectPoints {
            from: Point::new(0.0, 0.0),
            to: Point::new(10.0, 0.0),
            strategy: RouteStrategy::Direct,
        });
        assert_eq!(seen.borrow().as_slice(), &[(1, 1)]);
    }

    #[test]
    fn test_stale_reference_gives_empty_delta() {
        let mut engine = Engine::default();
        engine.execute(&ConnectPoints {
            from: Point::new(0.0, 0.0),
            to: Point::new(10.0, 0.0),
            strategy: RouteStrategy::Direct,
        });
        let before = engine.state().clone();

        let delta = engine.execute(&MoveVertex { vertex: VertexId(99), to: Point::new(1.0, 1.0) });
        assert!(delta.is_empty());
        let delta = engine.execute(&DeleteItems {
            vertices: [VertexId(77)].into(),
            ..Default::default()
        });
        assert!(delta.is_empty());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_metadata_only_skips_pipeline() {
        let mut engine = Engine::default();
        engine.execute(&ConnectPoints {
            from: Point::new(0.0, 0.0),
            to: Point::new(10.0, 0.0),
            strategy: RouteStrategy::Direct,
        });
        let v = engine.state().vertex_ids().next().unwrap();
        let delta = engine.execute(&SetNetLabel { vertex: v, label: Some("CLK".into()) });
        assert_eq!(delta.label_changes.len(), 1);
        assert!(delta.created_vertices.is_empty());
    }

    #[test]
    fn test_replace_state_does_not_normalize() {
        let mut engine = Engine::default();
        let mut raw = GraphState::new();
        raw.add_vertex(Point::new(1.0, 1.0), None);
        raw.add_vertex(Point::new(1.0, 1.0), None);
        let delta = engine.replace_state(raw);
        assert_eq!(delta.created_vertices.len(), 2);
        assert_eq!(engine.state().vertex_count(), 2);
    }
}
