//! Interactive drag sessions
//!
//! A drag keeps two states: the committed one inside the engine and a
//! working copy rebuilt every tick from the snapshot taken at `begin`.
//! Ticks go through the raw replace path, so nothing is merged, split or
//! deleted while the pointer moves. `end` runs the pipeline once.
//!
//! Positions are always recomputed from the original snapshot plus the
//! accumulated offset, so a sequence of updates lands on the same geometry
//! as a single update by their sum.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::delta::GraphDelta;
use crate::geometry::{Axis, Point};
use crate::graph::{EdgeId, GraphState, VertexId};
use crate::transaction::LoadState;
use crate::wire::{Ownership, PinTable, WireGraph};

/// What the user grabbed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragSelection {
    pub components: BTreeSet<String>,
    pub edges: BTreeSet<EdgeId>,
}

impl DragSelection {
    pub fn components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
            edges: BTreeSet::new(),
        }
    }

    pub fn edges(edges: impl IntoIterator<Item = EdgeId>) -> Self {
        Self {
            components: BTreeSet::new(),
            edges: edges.into_iter().collect(),
        }
    }
}

pub struct DragSession {
    origin: BTreeMap<VertexId, Point>,
    initial_state: GraphState,
    initial_pins: PinTable,
    selected_edges: BTreeSet<EdgeId>,
    moving: BTreeSet<VertexId>,
    /// Pinned ends of selected edges that were split off and now move rigidly.
    leads: BTreeSet<VertexId>,
    /// Detached vertex → the static anchor that took its pin.
    detached: BTreeMap<VertexId, VertexId>,
    touched: BTreeSet<VertexId>,
    created: BTreeSet<VertexId>,
    offset: Point,
}

impl DragSession {
    /// Start a drag. Returns `None` when the selection moves nothing.
    pub fn begin(wire: &WireGraph, selection: &DragSelection) -> Option<Self> {
        let state = wire.state();
        let pins = wire.pin_table();

        let mut moving: BTreeSet<VertexId> = pins
            .iter()
            .filter(|(pin, v)| {
                selection.components.contains(&pin.component) && state.contains_vertex(*v)
            })
            .map(|(_, v)| v)
            .collect();

        let selected_edges: BTreeSet<EdgeId> = selection
            .edges
            .iter()
            .copied()
            .filter(|e| state.contains_edge(*e))
            .collect();
        for e in &selected_edges {
            let Some(edge) = state.edge(*e) else { continue };
            for v in edge.endpoints() {
                if pins.pin_at(v).is_none() {
                    moving.insert(v);
                }
            }
        }

        if moving.is_empty() {
            tracing::debug!("drag selection moves nothing");
            return None;
        }

        tracing::debug!(
            "drag begin: {} moving vertices, {} selected edges",
            moving.len(),
            selected_edges.len()
        );
        Some(Self {
            origin: state.vertices().map(|v| (v.id, v.point)).collect(),
            initial_state: state.clone(),
            initial_pins: pins.clone(),
            selected_edges,
            touched: moving.clone(),
            moving,
            leads: BTreeSet::new(),
            detached: BTreeMap::new(),
            created: BTreeSet::new(),
            offset: Point::new(0.0, 0.0),
        })
    }

    pub fn moving(&self) -> &BTreeSet<VertexId> {
        &self.moving
    }

    /// Accumulated offset since `begin`.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Vertices created mid-drag (pin anchors).
    pub fn created(&self) -> &BTreeSet<VertexId> {
        &self.created
    }

    /// Move the selection by `(dx, dy)` more.
    pub fn update(&mut self, wire: &mut WireGraph, dx: f64, dy: f64) -> GraphDelta {
        self.offset = self.offset.offset(dx, dy);
        let geometry = *wire.geometry();
        let mut working = wire.state().clone();

        // Pinned ends of selected edges stay put until the edge would have to
        // leave its axis; then the pin splits off onto a static anchor.
        let selected: Vec<EdgeId> = self.selected_edges.iter().copied().collect();
        for e in selected {
            let Some(edge) = working.edge(e).copied() else { continue };
            for v in edge.endpoints() {
                if self.moving.contains(&v) || self.detached.contains_key(&v) {
                    continue;
                }
                if !matches!(wire.ownership(v), Ownership::Pinned(_)) {
                    continue;
                }
                if !self.leaves_axis(edge.start, edge.end, geometry.epsilon) {
                    continue;
                }
                if let Some(v_origin) = self.origin.get(&v).copied() {
                    self.detach(wire, &mut working, v, v_origin);
                    self.leads.insert(v);
                }
            }
        }

        let mut targets: BTreeMap<VertexId, Point> = BTreeMap::new();
        let mut queue: VecDeque<VertexId> = VecDeque::new();
        for m in self.moving.iter().chain(self.leads.iter()) {
            if let Some(p) = self.origin.get(m) {
                targets.insert(*m, geometry.snap(*p + self.offset));
                queue.push_back(*m);
            }
        }

        while let Some(m) = queue.pop_front() {
            let m_origin = self.origin.get(&m).copied();
            let (Some(m_origin), Some(m_new)) = (m_origin, targets.get(&m).copied()) else {
                continue;
            };
            for (_, n) in working.neighbors(m) {
                if targets.contains_key(&n) || self.is_anchor(n) {
                    continue;
                }
                let Some(n_origin) = self.origin.get(&n).copied() else { continue };
                let projected = match Axis::between(&m_origin, &n_origin, geometry.epsilon) {
                    Some(Axis::Horizontal) => Point::new(n_origin.x, m_new.y),
                    Some(Axis::Vertical) => Point::new(m_new.x, n_origin.y),
                    _ => continue,
                };
                if geometry.same_point(&projected, &n_origin) {
                    continue;
                }
                if matches!(wire.ownership(n), Ownership::Pinned(_)) {
                    self.detach(wire, &mut working, n, n_origin);
                }
                targets.insert(n, projected);
                queue.push_back(n);
            }
        }

        let ids: Vec<VertexId> = working.vertex_ids().collect();
        for v in ids {
            if let Some(p) = targets.get(&v).or_else(|| self.origin.get(&v)) {
                working.move_vertex(v, *p);
            }
        }
        self.touched.extend(targets.keys().copied());

        tracing::trace!(
            "drag update: offset {}, {} positioned, {} detached",
            self.offset,
            targets.len(),
            self.detached.len()
        );
        wire.replace_state(working)
    }

    /// Commit the drag: detached leads become free wire ends and the whole
    /// touched area is normalized once.
    pub fn end(self, wire: &mut WireGraph) -> GraphDelta {
        wire.release_detached();
        let epicenter: BTreeSet<VertexId> = self
            .touched
            .iter()
            .chain(self.created.iter())
            .copied()
            .collect();
        tracing::debug!("drag end: normalizing around {} vertices", epicenter.len());
        wire.execute(&LoadState {
            state: wire.state().clone(),
            epicenter,
        })
    }

    /// Abandon the drag and restore the pre-drag state and pin table.
    pub fn cancel(self, wire: &mut WireGraph) -> GraphDelta {
        tracing::debug!("drag cancelled");
        wire.restore(self.initial_state, self.initial_pins)
    }

    fn is_anchor(&self, v: VertexId) -> bool {
        self.detached.values().any(|a| *a == v)
    }

    fn detach(&mut self, wire: &mut WireGraph, working: &mut GraphState, v: VertexId, at: Point) {
        if let Some(anchor) = wire.detach_pin(working, v, at) {
            self.detached.insert(v, anchor);
            self.created.insert(anchor);
            self.origin.insert(anchor, at);
        }
    }

    /// Whether the accumulated offset pulls an edge off the axis its
    /// endpoints originally shared.
    fn leaves_axis(&self, a: VertexId, b: VertexId, epsilon: f64) -> bool {
        let (Some(pa), Some(pb)) = (self.origin.get(&a), self.origin.get(&b)) else {
            return false;
        };
        let off = self.offset;
        match Axis::between(pa, pb, epsilon) {
            Some(axis) => {
                let (vx, vy) = axis.vector();
                (off.x * vy - off.y * vx).abs() > epsilon
            }
            None => off.x.abs() > epsilon || off.y.abs() > epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::PinRef;
    use crate::transaction::RouteStrategy;

    /// R1 pins at (0,0) and (0,10), a wire from R1:1 out to (20,0).
    fn fixture() -> WireGraph {
        let mut wire = WireGraph::default();
        wire.place_pin(PinRef::new("R1", "1"), Point::new(0.0, 0.0));
        wire.place_pin(PinRef::new("R1", "2"), Point::new(0.0, 10.0));
        wire.connect(Point::new(0.0, 0.0), Point::new(20.0, 0.0), RouteStrategy::Direct);
        wire
    }

    #[test]
    fn test_empty_selection_fails() {
        let wire = fixture();
        assert!(DragSession::begin(&wire, &DragSelection::default()).is_none());
        assert!(DragSession::begin(&wire, &DragSelection::components(["U9"])).is_none());
    }

    #[test]
    fn test_component_drag_drags_wire_end() {
        let mut wire = fixture();
        let mut drag = DragSession::begin(&wire, &DragSelection::components(["R1"])).unwrap();
        drag.update(&mut wire, 0.0, 5.0);

        let far = wire.state().find_vertex(&Point::new(20.0, 5.0), 1e-6);
        assert!(far.is_some(), "horizontal neighbor follows the vertical move");
        let v = wire.pin_vertex(&PinRef::new("R1", "1")).unwrap();
        assert_eq!(wire.state().point(v), Some(Point::new(0.0, 5.0)));
    }

    #[test]
    fn test_selected_edge_detaches_pin_off_axis() {
        let mut wire = fixture();
        let e = wire.state().edge_ids().next().unwrap();
        let mut drag = DragSession::begin(&wire, &DragSelection::edges([e])).unwrap();

        // along the axis: the pin holds
        drag.update(&mut wire, 3.0, 0.0);
        assert!(drag.created().is_empty());

        drag.update(&mut wire, 0.0, 4.0);
        assert_eq!(drag.created().len(), 1);
        let anchor = wire.pin_vertex(&PinRef::new("R1", "1")).unwrap();
        assert_eq!(wire.state().point(anchor), Some(Point::new(0.0, 0.0)));

        drag.end(&mut wire);
        let anchor = wire.pin_vertex(&PinRef::new("R1", "1")).unwrap();
        assert_eq!(wire.state().point(anchor), Some(Point::new(0.0, 0.0)));
        assert_eq!(wire.state().degree(anchor), 1);
    }

    #[test]
    fn test_cancel_restores_snapshot() {
        let mut wire = fixture();
        let before = wire.state().clone();
        let pins = wire.pin_table().clone();
        let mut drag = DragSession::begin(&wire, &DragSelection::components(["R1"])).unwrap();
        drag.update(&mut wire, 7.0, 3.0);
        drag.cancel(&mut wire);
        assert_eq!(wire.state(), &before);
        assert_eq!(wire.pin_table(), &pins);
    }
}
