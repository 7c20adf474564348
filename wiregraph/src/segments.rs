//! Segment-list persistence format
//!
//! The document layer stores wires as flat segments. Each end of a segment
//! is either a free coordinate or a reference to a component pin; pin
//! coordinates live in a separate placement table since component geometry
//! belongs to the component model, not to the wiring.

use serde::{Deserialize, Serialize};

use crate::geometry::{GeometryPolicy, Point};
use crate::graph::ClusterId;

/// A pin of a placed component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinRef {
    pub component: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(component: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            pin: pin.into(),
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.component, self.pin)
    }
}

/// One end of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Attachment {
    Point { x: f64, y: f64 },
    Pin { component: String, pin: String },
}

impl Attachment {
    pub fn point(p: Point) -> Self {
        Attachment::Point { x: p.x, y: p.y }
    }

    pub fn pin(pin: &PinRef) -> Self {
        Attachment::Pin {
            component: pin.component.clone(),
            pin: pin.pin.clone(),
        }
    }

    pub fn as_pin(&self) -> Option<PinRef> {
        match self {
            Attachment::Pin { component, pin } => Some(PinRef::new(component.clone(), pin.clone())),
            Attachment::Point { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Attachment,
    pub b: Attachment,
}

impl Segment {
    pub fn new(a: Attachment, b: Attachment) -> Self {
        Self { a, b }
    }

    pub fn between(a: Point, b: Point) -> Self {
        Self::new(Attachment::point(a), Attachment::point(b))
    }
}

/// Segments of one net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetSegments {
    pub net: ClusterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub segments: Vec<Segment>,
}

/// Where a component pin sits on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinPlacement {
    pub component: String,
    pub pin: String,
    pub at: Point,
}

impl PinPlacement {
    pub fn pin_ref(&self) -> PinRef {
        PinRef::new(self.component.clone(), self.pin.clone())
    }
}

/// A wiring document: pin placements plus per-net segment groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchematicDocument {
    #[serde(default)]
    pub geometry: Option<GeometryPolicy>,
    #[serde(default)]
    pub pins: Vec<PinPlacement>,
    #[serde(default)]
    pub nets: Vec<NetSegments>,
}

impl SchematicDocument {
    pub fn segment_count(&self) -> usize {
        self.nets.iter().map(|n| n.segments.len()).sum()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
