//! Trace metadata through splits, collapses and deletions

use std::collections::BTreeSet;

use wiregraph::prelude::*;
use wiregraph::TraceMetadata;

fn meta_at(traces: &TraceGraph, from: Point, to: Point) -> Option<TraceMetadata> {
    let a = traces.state().find_vertex(&from, 1e-6)?;
    let b = traces.state().find_vertex(&to, 1e-6)?;
    let e = traces.state().edge_between(a, b)?;
    traces.metadata(e).cloned()
}

#[test]
fn test_every_edge_has_metadata() {
    let mut traces = TraceGraph::default();
    traces.add_path(
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(15.0, 5.0),
            Point::new(15.0, 20.0),
        ],
        0.3,
        "F.Cu",
    );
    traces.add_path(vec![Point::new(5.0, 0.0), Point::new(5.0, -10.0)], 0.15, "F.Cu");

    assert_eq!(traces.state().edge_count(), 5);
    for e in traces.state().edge_ids() {
        assert!(traces.metadata(e).is_some(), "{} has no metadata", e);
    }
    assert_eq!(
        meta_at(&traces, Point::new(0.0, 0.0), Point::new(5.0, 0.0)),
        Some(TraceMetadata::new(0.3, "F.Cu"))
    );
    assert_eq!(
        meta_at(&traces, Point::new(5.0, 0.0), Point::new(5.0, -10.0)),
        Some(TraceMetadata::new(0.15, "F.Cu"))
    );
}

#[test]
fn test_path_starting_mid_trace_keeps_width_seam() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0)], 0.25, "F.Cu");
    traces.add_path(vec![Point::new(10.0, 0.0), Point::new(30.0, 0.0)], 0.5, "F.Cu");

    assert_eq!(traces.state().edge_count(), 2);
    assert_eq!(
        meta_at(&traces, Point::new(0.0, 0.0), Point::new(20.0, 0.0)),
        Some(TraceMetadata::new(0.25, "F.Cu"))
    );
    assert_eq!(
        meta_at(&traces, Point::new(20.0, 0.0), Point::new(30.0, 0.0)),
        Some(TraceMetadata::new(0.5, "F.Cu"))
    );
}

#[test]
fn test_branch_off_mid_trace_inherits_on_both_halves() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0)], 0.25, "B.Cu");
    traces.add_path(vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)], 0.5, "B.Cu");

    assert_eq!(traces.state().edge_count(), 3);
    assert_eq!(
        meta_at(&traces, Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
        Some(TraceMetadata::new(0.25, "B.Cu"))
    );
    assert_eq!(
        meta_at(&traces, Point::new(10.0, 0.0), Point::new(20.0, 0.0)),
        Some(TraceMetadata::new(0.25, "B.Cu"))
    );
    assert_eq!(
        meta_at(&traces, Point::new(10.0, 0.0), Point::new(10.0, 10.0)),
        Some(TraceMetadata::new(0.5, "B.Cu"))
    );
}

#[test]
fn test_layer_change_blocks_collapse() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)], 0.2, "F.Cu");
    traces.add_path(vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)], 0.2, "B.Cu");
    assert_eq!(traces.state().edge_count(), 2);
    assert_eq!(traces.edges_on_layer("B.Cu").len(), 1);
}

#[test]
fn test_deleting_the_tee_lets_the_run_collapse() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0)], 0.25, "F.Cu");
    traces.add_path(vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)], 0.25, "F.Cu");
    assert_eq!(traces.state().edge_count(), 3);

    let stub = traces.state().find_vertex(&Point::new(10.0, 10.0), 1e-6).unwrap();
    traces.delete(BTreeSet::from([stub]), BTreeSet::new());

    assert_eq!(traces.state().edge_count(), 1);
    assert_eq!(
        meta_at(&traces, Point::new(0.0, 0.0), Point::new(20.0, 0.0)),
        Some(TraceMetadata::new(0.25, "F.Cu"))
    );
}

#[test]
fn test_moving_an_end_keeps_metadata() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 0.4, "In1.Cu");
    let end = traces.state().find_vertex(&Point::new(10.0, 0.0), 1e-6).unwrap();
    traces.move_vertex(end, Point::new(30.0, 0.0));

    assert_eq!(
        meta_at(&traces, Point::new(0.0, 0.0), Point::new(30.0, 0.0)),
        Some(TraceMetadata::new(0.4, "In1.Cu"))
    );
}

#[test]
fn test_disjoint_traces_are_separate_nets() {
    let mut traces = TraceGraph::default();
    traces.add_path(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 0.2, "F.Cu");
    traces.add_path(vec![Point::new(0.0, 5.0), Point::new(10.0, 5.0)], 0.2, "F.Cu");
    assert_eq!(traces.nets().len(), 2);

    let v = traces.state().find_vertex(&Point::new(0.0, 0.0), 1e-6).unwrap();
    let net = traces.net_of(v).unwrap();
    assert_eq!(traces.net_vertices(net).len(), 2);
    assert_eq!(traces.net_edges(net).len(), 1);
}
