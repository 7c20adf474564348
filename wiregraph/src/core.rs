//! Document-level API shared by the CLI and embedding applications.
//! No rendering or editor state dependencies.

use std::path::{Path, PathBuf};

use crate::geometry::GeometryPolicy;
use crate::net::NetRecord;
use crate::segments::SchematicDocument;
use crate::wire::WireGraph;

#[derive(Debug, thiserror::Error)]
pub enum WireGraphError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Segment references unplaced pin {component}:{pin}")]
    UnknownPin { component: String, pin: String },
    #[error("{0}")]
    Other(String),
}

/// Options for a normalization run.
#[derive(Clone, Debug)]
pub struct NormalizeOptions {
    pub geometry: GeometryPolicy,
    /// Strip net labels before building.
    pub drop_labels: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            geometry: GeometryPolicy::default(),
            drop_labels: false,
        }
    }
}

/// Normalized document plus before/after counts.
#[derive(Debug, Clone)]
pub struct NormalizeResult {
    pub file: Option<PathBuf>,
    pub document: SchematicDocument,
    pub nets: Vec<NetRecord>,
    pub stats: NormalizeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct NormalizeStats {
    pub pins: usize,
    pub segments_in: usize,
    pub segments_out: usize,
    pub vertices: usize,
    pub edges: usize,
    pub nets: usize,
}

impl NormalizeResult {
    /// Whether normalization changed the segment count.
    pub fn changed(&self) -> bool {
        self.stats.segments_in != self.stats.segments_out
    }
}

/// Core document API.
pub struct WireGraphCore;

impl WireGraphCore {
    /// Read and parse a segment document.
    pub fn load_document(path: &Path) -> Result<SchematicDocument, WireGraphError> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(WireGraphError::Parse(format!("{} is empty", path.display())));
        }
        let document = SchematicDocument::from_json(&text)?;
        tracing::info!(
            "loaded {}: {} pins, {} segments",
            path.display(),
            document.pins.len(),
            document.segment_count()
        );
        Ok(document)
    }

    /// Build a wire graph from a document.
    pub fn build_graph(
        document: &SchematicDocument,
        options: &NormalizeOptions,
    ) -> Result<WireGraph, WireGraphError> {
        if options.drop_labels {
            let mut stripped = document.clone();
            for group in &mut stripped.nets {
                group.label = None;
            }
            return WireGraph::build(&stripped, options.geometry);
        }
        WireGraph::build(document, options.geometry)
    }

    /// Build, normalize and flatten a document back to segments.
    pub fn normalize_document(
        document: &SchematicDocument,
        options: &NormalizeOptions,
    ) -> Result<NormalizeResult, WireGraphError> {
        let wire = Self::build_graph(document, options)?;
        let normalized = wire.to_document();
        let nets = wire.nets();
        let stats = NormalizeStats {
            pins: normalized.pins.len(),
            segments_in: document.segment_count(),
            segments_out: normalized.segment_count(),
            vertices: wire.state().vertex_count(),
            edges: wire.state().edge_count(),
            nets: nets.len(),
        };
        tracing::info!(
            "normalized {} segments into {} across {} nets",
            stats.segments_in,
            stats.segments_out,
            stats.nets
        );
        Ok(NormalizeResult {
            file: None,
            document: normalized,
            nets,
            stats,
        })
    }

    /// Load a document from disk and normalize it.
    pub fn normalize_file(
        path: &Path,
        options: &NormalizeOptions,
    ) -> Result<NormalizeResult, WireGraphError> {
        let document = Self::load_document(path)?;
        let mut result = Self::normalize_document(&document, options)?;
        result.file = Some(path.to_path_buf());
        Ok(result)
    }
}
