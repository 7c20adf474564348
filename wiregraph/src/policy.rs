//! Edge/metadata policy hook.
//!
//! Domain wrappers keep their metadata in side tables keyed by id. The rule
//! pipeline only needs to ask two questions of those tables, and asks them
//! through this trait so the rules stay domain-agnostic.

use crate::graph::{EdgeId, VertexId};

pub trait MetadataPolicy {
    /// An anchored vertex (a component pin) wins merge survivorship, is
    /// never collapsed out of a straight run and is never dropped for
    /// having no edges.
    fn is_anchored(&self, _vertex: VertexId) -> bool {
        false
    }

    /// Whether two edges carry the same domain metadata. A vertex between
    /// disagreeing edges is a seam and survives collinear collapse.
    fn edges_agree(&self, _a: EdgeId, _b: EdgeId) -> bool {
        true
    }
}

/// Policy for graphs without side tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataPolicy for NoMetadata {}

impl<P: MetadataPolicy + ?Sized> MetadataPolicy for &P {
    fn is_anchored(&self, vertex: VertexId) -> bool {
        (**self).is_anchored(vertex)
    }

    fn edges_agree(&self, a: EdgeId, b: EdgeId) -> bool {
        (**self).edges_agree(a, b)
    }
}
