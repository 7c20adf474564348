//! WireGraph - topological connectivity engine for schematic wires and PCB traces
//!
//! Every edit is a transaction applied to a value snapshot of the graph,
//! followed by an ordered rule pipeline that merges coincident vertices,
//! splits edges at vertices lying on them, collapses redundant collinear
//! points, drops stray vertices and assigns net ids. Each execution
//! publishes a structural delta.
//!
//! # Quick Start
//!
//! ```
//! use wiregraph::prelude::*;
//!
//! let mut wire = WireGraph::new(GeometryPolicy::orthogonal());
//! wire.place_pin(PinRef::new("R1", "1"), Point::new(0.0, 0.0));
//! wire.place_pin(PinRef::new("C1", "2"), Point::new(10.0, 10.0));
//! wire.connect_pins(
//!     &PinRef::new("R1", "1"),
//!     &PinRef::new("C1", "2"),
//!     RouteStrategy::HorizontalFirst,
//! );
//!
//! // one corner at (10, 0), two edges, one net
//! assert_eq!(wire.state().edge_count(), 2);
//! assert_eq!(wire.nets().len(), 1);
//! ```
//!
//! # Features
//!
//! - **Normalization**: merge, split, collinear collapse, isolated cleanup, net ids
//! - **Schematic wires**: pin ownership, component removal, drag sessions
//! - **PCB traces**: width/layer metadata carried through splits and collapses
//! - **Persistence**: segment-list JSON documents with pin attachments

pub mod core;
pub mod delta;
pub mod drag;
pub mod engine;
pub mod geometry;
pub mod graph;
pub mod net;
pub mod policy;
pub mod rules;
pub mod segments;
pub mod trace;
pub mod transaction;
pub mod wire;

// Re-export main types
pub use crate::core::{
    NormalizeOptions, NormalizeResult, NormalizeStats, WireGraphCore, WireGraphError,
};
pub use delta::GraphDelta;
pub use drag::{DragSelection, DragSession};
pub use engine::Engine;
pub use geometry::{Axis, GeometryPolicy, Point, RoutingMode};
pub use graph::{ClusterId, Edge, EdgeId, GraphState, Vertex, VertexId};
pub use net::NetRecord;
pub use policy::{MetadataPolicy, NoMetadata};
pub use rules::{Rule, Ruleset};
pub use segments::{Attachment, NetSegments, PinPlacement, PinRef, SchematicDocument, Segment};
pub use trace::{TraceGraph, TraceMetadata};
pub use transaction::{RouteStrategy, Transaction};
pub use wire::{Ownership, WireGraph};

/// Load a segment document and normalize it with default options.
pub fn normalize_file(path: &std::path::Path) -> Result<NormalizeResult, WireGraphError> {
    WireGraphCore::normalize_file(path, &NormalizeOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::transaction::{
        AddPath, ConnectPoints, ConnectVertices, DeleteItems, GetOrCreateVertex, LoadState,
        MoveVertex, Normalize, PlacePin, SetNetLabel,
    };
    pub use crate::{
        DragSelection, DragSession, Engine, GeometryPolicy, GraphDelta, GraphState,
        NormalizeOptions, PinRef, Point, RouteStrategy, SchematicDocument, TraceGraph, Transaction,
        WireGraph, WireGraphCore, WireGraphError,
    };
}
