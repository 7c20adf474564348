//! Schematic wire graph
//!
//! Layers component-pin ownership over the generic engine. Ownership lives in
//! a side table keyed by vertex id, updated only by this wrapper: either in
//! its own intent methods or when it processes the delta of an execution.
//! The graph records never point back into the table.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::WireGraphError;
use crate::delta::GraphDelta;
use crate::engine::Engine;
use crate::geometry::{GeometryPolicy, Point};
use crate::graph::{ClusterId, EdgeId, GraphState, VertexId};
use crate::net::{self, NetRecord};
use crate::policy::MetadataPolicy;
use crate::segments::{Attachment, NetSegments, PinPlacement, PinRef, SchematicDocument, Segment};
use crate::transaction::{
    get_or_create_vertex, ConnectPoints, ConnectVertices, DeleteItems, LoadState, MoveVertex,
    Normalize, PlacePin, RouteStrategy, SetNetLabel, Transaction, TransactionContext,
};

/// What a vertex is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Free,
    Pinned(PinRef),
    /// Drag-time lead end whose pin anchor was split off to a static vertex.
    DetachedPin,
}

/// Vertex ownership plus a pin → vertex index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinTable {
    ownership: BTreeMap<VertexId, Ownership>,
    pins: BTreeMap<PinRef, VertexId>,
}

impl PinTable {
    pub fn ownership(&self, v: VertexId) -> Ownership {
        self.ownership.get(&v).cloned().unwrap_or(Ownership::Free)
    }

    pub fn pin_at(&self, v: VertexId) -> Option<&PinRef> {
        match self.ownership.get(&v) {
            Some(Ownership::Pinned(pin)) => Some(pin),
            _ => None,
        }
    }

    pub fn vertex_of(&self, pin: &PinRef) -> Option<VertexId> {
        self.pins.get(pin).copied()
    }

    /// Every pin indexed onto `v` (coincident pins share a vertex).
    pub fn pins_on(&self, v: VertexId) -> Vec<&PinRef> {
        self.pins
            .iter()
            .filter(|(_, vertex)| **vertex == v)
            .map(|(pin, _)| pin)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PinRef, VertexId)> {
        self.pins.iter().map(|(pin, v)| (pin, *v))
    }

    fn assign(&mut self, v: VertexId, pin: PinRef) {
        if let Some(old) = self.pins.insert(pin.clone(), v) {
            if old != v {
                self.release_vertex_of(&pin, old);
            }
        }
        if self.pin_at(v).is_none() {
            self.ownership.insert(v, Ownership::Pinned(pin));
        }
    }

    /// Forget `pin`, handing the vertex to another coincident pin if any.
    fn release(&mut self, pin: &PinRef) -> Option<VertexId> {
        let v = self.pins.remove(pin)?;
        self.release_vertex_of(pin, v);
        Some(v)
    }

    fn release_vertex_of(&mut self, pin: &PinRef, v: VertexId) {
        if self.pin_at(v) != Some(pin) {
            return;
        }
        let next = self
            .pins
            .iter()
            .find(|(_, vertex)| **vertex == v)
            .map(|(p, _)| p.clone());
        match next {
            Some(p) => self.ownership.insert(v, Ownership::Pinned(p)),
            None => self.ownership.remove(&v),
        };
    }

    /// Move everything `from` owns onto `to`. A pin already on `to` keeps
    /// ownership; the moved pins are still indexed onto `to`.
    fn transfer(&mut self, from: VertexId, to: VertexId) {
        let Some(owned) = self.ownership.remove(&from) else {
            return;
        };
        for vertex in self.pins.values_mut() {
            if *vertex == from {
                *vertex = to;
            }
        }
        match (owned, self.ownership(to)) {
            (Ownership::Pinned(pin), Ownership::Free | Ownership::DetachedPin) => {
                self.ownership.insert(to, Ownership::Pinned(pin));
            }
            (Ownership::DetachedPin, Ownership::Free) => {
                self.ownership.insert(to, Ownership::DetachedPin);
            }
            _ => {}
        }
    }

    fn drop_vertex(&mut self, v: VertexId) {
        self.ownership.remove(&v);
        self.pins.retain(|_, vertex| *vertex != v);
    }
}

impl MetadataPolicy for PinTable {
    fn is_anchored(&self, vertex: VertexId) -> bool {
        self.pin_at(vertex).is_some()
    }
}

/// The schematic wiring of one sheet.
pub struct WireGraph {
    engine: Engine,
    pins: PinTable,
}

impl WireGraph {
    pub fn new(geometry: GeometryPolicy) -> Self {
        Self {
            engine: Engine::new(geometry),
            pins: PinTable::default(),
        }
    }

    pub fn state(&self) -> &GraphState {
        self.engine.state()
    }

    pub fn geometry(&self) -> &GeometryPolicy {
        self.engine.geometry()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Register a rendering/persistence observer on the underlying engine.
    pub fn subscribe(&mut self, observer: impl FnMut(&GraphDelta, &GraphState) + 'static) {
        self.engine.subscribe(observer);
    }

    pub fn pin_table(&self) -> &PinTable {
        &self.pins
    }

    pub fn ownership(&self, v: VertexId) -> Ownership {
        self.pins.ownership(v)
    }

    pub fn pin_vertex(&self, pin: &PinRef) -> Option<VertexId> {
        self.pins.vertex_of(pin)
    }

    /// Run a transaction and bring the pin table in line with the result.
    pub fn execute(&mut self, transaction: &dyn Transaction) -> GraphDelta {
        let delta = self.engine.execute_with(transaction, &self.pins);
        self.apply_delta(&delta);
        delta
    }

    /// Raw, non-normalizing state swap for interactive sessions.
    pub fn replace_state(&mut self, state: GraphState) -> GraphDelta {
        let delta = self.engine.replace_state(state);
        self.apply_delta(&delta);
        delta
    }

    /// Change handler: carry ownership from merged or deleted vertices onto
    /// the vertex that now occupies their spot, or drop it.
    fn apply_delta(&mut self, delta: &GraphDelta) {
        let state = self.engine.state();
        for victim in delta.vertex_merges.keys() {
            let survivor = delta.survivor_of(*victim);
            if state.contains_vertex(survivor) {
                self.pins.transfer(*victim, survivor);
            }
        }
        let epsilon = self.engine.geometry().epsilon;
        for (v, last) in &delta.deleted_vertices {
            if self.pins.ownership(*v) == Ownership::Free
                && !self.pins.pins.values().any(|x| x == v)
            {
                continue;
            }
            match state.find_vertex(last, epsilon) {
                Some(survivor) => {
                    tracing::debug!("ownership of {} moves to coincident {}", v, survivor);
                    self.pins.transfer(*v, survivor);
                }
                None => {
                    tracing::debug!("ownership of deleted {} dropped", v);
                    self.pins.drop_vertex(*v);
                }
            }
        }
    }

    /// Materialize `pin` at `at`, or move it there if already placed.
    pub fn place_pin(&mut self, pin: PinRef, at: Point) -> Option<VertexId> {
        if self.pins.vertex_of(&pin).is_some() {
            self.move_pin(&pin, at);
            return self.pins.vertex_of(&pin);
        }
        self.execute(&PlacePin { at });
        let at = self.geometry().snap(at);
        let v = self.state().find_vertex(&at, self.geometry().epsilon)?;
        self.pins.assign(v, pin);
        Some(v)
    }

    pub fn move_pin(&mut self, pin: &PinRef, to: Point) -> GraphDelta {
        match self.pins.vertex_of(pin) {
            Some(vertex) => self.execute(&MoveVertex { vertex, to }),
            None => GraphDelta::default(),
        }
    }

    pub fn connect(&mut self, from: Point, to: Point, strategy: RouteStrategy) -> GraphDelta {
        self.execute(&ConnectPoints { from, to, strategy })
    }

    pub fn connect_vertices(
        &mut self,
        from: VertexId,
        to: VertexId,
        strategy: RouteStrategy,
    ) -> GraphDelta {
        self.execute(&ConnectVertices { from, to, strategy })
    }

    pub fn connect_pins(&mut self, a: &PinRef, b: &PinRef, strategy: RouteStrategy) -> GraphDelta {
        match (self.pins.vertex_of(a), self.pins.vertex_of(b)) {
            (Some(from), Some(to)) => self.connect_vertices(from, to, strategy),
            _ => GraphDelta::default(),
        }
    }

    pub fn delete(&mut self, vertices: BTreeSet<VertexId>, edges: BTreeSet<EdgeId>) -> GraphDelta {
        self.execute(&DeleteItems { vertices, edges })
    }

    /// Release every pin of a deleted component and re-normalize around
    /// them; pins with no wires disappear, wires stay as free wiring.
    pub fn remove_component(&mut self, component: &str) -> GraphDelta {
        let owned: Vec<PinRef> = self
            .pins
            .pins
            .keys()
            .filter(|p| p.component == component)
            .cloned()
            .collect();
        let epicenter: BTreeSet<VertexId> =
            owned.iter().filter_map(|p| self.pins.release(p)).collect();
        if epicenter.is_empty() {
            return GraphDelta::default();
        }
        tracing::debug!("released {} pins of {}", owned.len(), component);
        self.execute(&Normalize { epicenter })
    }

    pub fn set_net_label(&mut self, vertex: VertexId, label: Option<String>) -> GraphDelta {
        self.execute(&SetNetLabel { vertex, label })
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

    /// Pins on a net, in pin order.
    pub fn net_pins(&self, net: ClusterId) -> Vec<PinRef> {
        let vertices = self.net_vertices(net);
        self.pins
            .iter()
            .filter(|(_, v)| vertices.contains(v))
            .map(|(pin, _)| pin.clone())
            .collect()
    }

    pub fn components_on_net(&self, net: ClusterId) -> BTreeSet<String> {
        self.net_pins(net).into_iter().map(|p| p.component).collect()
    }

    /// Pins electrically connected to `pin`, found by search from its vertex.
    pub fn connected_pins(&self, pin: &PinRef) -> BTreeSet<PinRef> {
        let Some(seed) = self.pins.vertex_of(pin) else {
            return BTreeSet::new();
        };
        let reach = net::connected_vertices(self.state(), seed);
        self.pins
            .iter()
            .filter(|(_, v)| reach.contains(v))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Reconstruct a wire graph from a document. Pins referenced by a
    /// segment must have a placement.
    pub fn build(
        document: &SchematicDocument,
        geometry: GeometryPolicy,
    ) -> Result<Self, WireGraphError> {
        let mut wire = Self::new(geometry);
        let mut raw = GraphState::new();
        let mut ctx = TransactionContext::new(geometry);
        let mut positions: BTreeMap<PinRef, Point> = BTreeMap::new();

        for placement in &document.pins {
            let v = get_or_create_vertex(&mut raw, placement.at, &mut ctx);
            wire.pins.assign(v, placement.pin_ref());
            positions.insert(placement.pin_ref(), placement.at);
        }

        for group in &document.nets {
            raw.reserve_cluster(group.net);
            if let Some(label) = &group.label {
                raw.set_cluster_label(group.net, Some(label.clone()));
            }
            for segment in &group.segments {
                let a = resolve_attachment(&segment.a, &positions)?;
                let b = resolve_attachment(&segment.b, &positions)?;
                let va = get_or_create_vertex(&mut raw, a, &mut ctx);
                let vb = get_or_create_vertex(&mut raw, b, &mut ctx);
                raw.add_edge(va, vb);
                for v in [va, vb] {
                    if raw.vertex(v).and_then(|x| x.cluster).is_none() {
                        raw.set_cluster(v, Some(group.net));
                    }
                }
            }
        }

        let epicenter = raw.vertex_ids().collect();
        wire.execute(&LoadState { state: raw, epicenter });
        tracing::info!(
            "built wire graph: {} pins, {} segments -> {} vertices, {} edges, {} nets",
            document.pins.len(),
            document.segment_count(),
            wire.state().vertex_count(),
            wire.state().edge_count(),
            wire.nets().len()
        );
        Ok(wire)
    }

    /// Flatten the graph into one segment group per net id.
    pub fn to_segments(&self) -> Vec<NetSegments> {
        let state = self.state();
        let mut groups: BTreeMap<ClusterId, Vec<Segment>> = BTreeMap::new();
        for edge in state.edges() {
            let Some(net) = net::net_of(state, edge.start) else {
                continue;
            };
            let (Some(a), Some(b)) = (self.attachment(edge.start), self.attachment(edge.end)) else {
                continue;
            };
            groups.entry(net).or_default().push(Segment::new(a, b));
        }
        groups
            .into_iter()
            .map(|(net, segments)| NetSegments {
                net,
                label: state.cluster_label(net).map(str::to_owned),
                segments,
            })
            .collect()
    }

    pub fn to_document(&self) -> SchematicDocument {
        let pins = self
            .pins
            .iter()
            .filter_map(|(pin, v)| {
                Some(PinPlacement {
                    component: pin.component.clone(),
                    pin: pin.pin.clone(),
                    at: self.state().point(v)?,
                })
            })
            .collect();
        SchematicDocument {
            geometry: Some(*self.geometry()),
            pins,
            nets: self.to_segments(),
        }
    }

    fn attachment(&self, v: VertexId) -> Option<Attachment> {
        match self.pins.pin_at(v) {
            Some(pin) => Some(Attachment::pin(pin)),
            None => self.state().point(v).map(Attachment::point),
        }
    }

    /// Split a pin off its vertex during a drag: `v` becomes a detached lead
    /// end and a new static vertex at `anchor_at` takes the pin, linked to
    /// `v` by a stub edge. Returns the new anchor.
    pub(crate) fn detach_pin(
        &mut self,
        working: &mut GraphState,
        v: VertexId,
        anchor_at: Point,
    ) -> Option<VertexId> {
        let Ownership::Pinned(_) = self.pins.ownership(v) else {
            return None;
        };
        let cluster = working.vertex(v).and_then(|x| x.cluster);
        let anchor = working.add_vertex(anchor_at, cluster);
        working.add_edge(anchor, v);
        self.pins.transfer(v, anchor);
        self.pins.ownership.insert(v, Ownership::DetachedPin);
        tracing::trace!("detached pin vertex {} onto anchor {}", v, anchor);
        Some(anchor)
    }

    /// Turn detached lead ends back into free vertices.
    pub(crate) fn release_detached(&mut self) {
        self.pins.ownership.retain(|_, o| *o != Ownership::DetachedPin);
    }

    /// Put back a state and pin table captured earlier.
    pub(crate) fn restore(&mut self, state: GraphState, pins: PinTable) -> GraphDelta {
        self.pins = pins;
        self.engine.replace_state(state)
    }
}

fn resolve_attachment(
    attachment: &Attachment,
    positions: &BTreeMap<PinRef, Point>,
) -> Result<Point, WireGraphError> {
    match attachment {
        Attachment::Point { x, y } => Ok(Point::new(*x, *y)),
        Attachment::Pin { component, pin } => positions
            .get(&PinRef::new(component.clone(), pin.clone()))
            .copied()
            .ok_or_else(|| WireGraphError::UnknownPin {
                component: component.clone(),
                pin: pin.clone(),
            }),
    }
}

impl Default for WireGraph {
    fn default() -> Self {
        Self::new(GeometryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(c: &str, p: &str) -> PinRef {
        PinRef::new(c, p)
    }

    #[test]
    fn test_pin_survives_without_wires() {
        let mut wire = WireGraph::default();
        let v = wire.place_pin(pin("R1", "1"), Point::new(0.0, 0.0)).unwrap();
        assert!(wire.state().contains_vertex(v));
        assert_eq!(wire.ownership(v), Ownership::Pinned(pin("R1", "1")));
    }

    #[test]
    fn test_pin_wins_merge_and_keeps_ownership() {
        let mut wire = WireGraph::default();
        wire.connect(Point::new(0.0, 0.0), Point::new(10.0, 0.0), RouteStrategy::Direct);
        let v = wire.place_pin(pin("U1", "2"), Point::new(10.0, 0.0)).unwrap();
        assert_eq!(wire.state().degree(v), 1);
        assert_eq!(wire.pin_vertex(&pin("U1", "2")), Some(v));
    }

    #[test]
    fn test_pin_on_wire_is_not_collapsed() {
        let mut wire = WireGraph::default();
        wire.connect(Point::new(0.0, 0.0), Point::new(10.0, 0.0), RouteStrategy::Direct);
        let v = wire.place_pin(pin("TP1", "1"), Point::new(5.0, 0.0)).unwrap();
        assert_eq!(wire.state().degree(v), 2);
        assert_eq!(wire.state().edge_count(), 2);
    }

    #[test]
    fn test_remove_component_releases_pins() {
        let mut wire = WireGraph::default();
        wire.place_pin(pin("R1", "1"), Point::new(0.0, 0.0));
        wire.place_pin(pin("R1", "2"), Point::new(0.0, 10.0));
        let lone = wire.place_pin(pin("C1", "1"), Point::new(20.0, 0.0)).unwrap();
        wire.connect(Point::new(0.0, 0.0), Point::new(10.0, 0.0), RouteStrategy::Direct);

        wire.remove_component("R1");
        assert!(wire.pin_vertex(&pin("R1", "1")).is_none());
        // the wired pin stays as a free wire end, the bare pin disappears
        assert!(wire.state().find_vertex(&Point::new(0.0, 0.0), 1e-6).is_some());
        assert!(wire.state().find_vertex(&Point::new(0.0, 10.0), 1e-6).is_none());
        assert!(wire.state().contains_vertex(lone));
    }

    #[test]
    fn test_connected_pins_and_components_on_net() {
        let mut wire = WireGraph::default();
        wire.place_pin(pin("U1", "1"), Point::new(0.0, 0.0));
        wire.place_pin(pin("C1", "1"), Point::new(10.0, 10.0));
        wire.place_pin(pin("R9", "1"), Point::new(40.0, 40.0));
        wire.connect_pins(&pin("U1", "1"), &pin("C1", "1"), RouteStrategy::HorizontalFirst);

        let reach = wire.connected_pins(&pin("U1", "1"));
        assert_eq!(reach, BTreeSet::from([pin("C1", "1"), pin("U1", "1")]));

        let v = wire.pin_vertex(&pin("U1", "1")).unwrap();
        let net = wire.net_of(v).unwrap();
        assert_eq!(
            wire.components_on_net(net),
            BTreeSet::from(["C1".to_string(), "U1".to_string()])
        );
    }

    #[test]
    fn test_build_rejects_unknown_pin() {
        let doc = SchematicDocument {
            geometry: None,
            pins: vec![],
            nets: vec![NetSegments {
                net: ClusterId(0),
                label: None,
                segments: vec![Segment::new(
                    Attachment::pin(&pin("U1", "1")),
                    Attachment::point(Point::new(1.0, 0.0)),
                )],
            }],
        };
        let err = WireGraph::build(&doc, GeometryPolicy::default()).err().unwrap();
        assert!(matches!(err, WireGraphError::UnknownPin { .. }));
    }
}
