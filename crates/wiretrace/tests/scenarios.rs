mod common;

use common::synthetic_image::{blank, horizontal_line, ink, plus_crossing, raster, thick_plus_crossing};
use imageproc::region_labelling::{Connectivity, connected_components};
use image::Luma;
use wiretrace::{
    BuildOptions, Edge, Graph, Node, NodeKind, Pipeline, Point, TraceOptions, Tracer,
    VectorDocument, VectorOptions, WireEngine,
    algorithms::{DouglasPeuckerSimplifier, ZhangSuenThinner, axis_snap, dedup},
    config::TraceParams,
    traits::{PolylineSimplifier, Skeletonizer},
    types::BinaryMask,
};

fn build(engine: &mut WireEngine, id: &str, img: &image::GrayImage) {
    engine
        .build_graph(id, &raster(img), &BuildOptions::default())
        .expect("valid raster");
}

#[test]
fn blank_page_has_no_wires() {
    let mut engine = WireEngine::default();
    build(&mut engine, "a", &blank(100, 100));

    let graph = engine.graph("a").expect("built");
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());

    for click in [Point::new(0, 0), Point::new(50, 50), Point::new(99, 99)] {
        let path = engine.trace_path("a", click, TraceOptions::default()).expect("built");
        assert!(path.is_none(), "found a wire at {click:?}");
    }
}

#[test]
fn single_line_is_one_edge_between_two_terminals() {
    let mut engine = WireEngine::default();
    build(&mut engine, "b", &horizontal_line());

    let graph = engine.graph("b").expect("built");
    assert_eq!(graph.count_kind(NodeKind::Terminal), 2);
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);

    let path = engine
        .trace_path("b", Point::new(40, 50), TraceOptions::default())
        .expect("built")
        .expect("click is on the line");
    let min_x = path.iter().map(|p| p.x).min().unwrap_or_default();
    let max_x = path.iter().map(|p| p.x).max().unwrap_or_default();
    assert!(min_x <= 13, "path starts at x={min_x}");
    assert!(max_x >= 86, "path ends at x={max_x}");
    assert!(path.iter().all(|p| (49..=51).contains(&p.y)));
}

#[test]
fn crossing_is_one_junction_with_four_arms() {
    let mut engine = WireEngine::default();
    build(&mut engine, "c", &plus_crossing());

    let graph = engine.graph("c").expect("built");
    let junctions: Vec<_> = graph.iter_kind(NodeKind::Junction).collect();
    assert_eq!(junctions.len(), 1);
    assert_eq!(junctions[0].degree, 4);
    assert_eq!(graph.edges.len(), 4);

    for click in [Point::new(25, 50), Point::new(75, 50), Point::new(50, 25), Point::new(50, 75)] {
        let net = engine
            .trace_component("c", click)
            .expect("built")
            .expect("click is on an arm");
        assert_eq!(net.len(), 4, "net from {click:?}");
    }
}

#[test]
fn thick_crossing_reads_as_a_dot() {
    // The 3px overlap fills most of the sampled disk.
    let mut engine = WireEngine::default();
    build(&mut engine, "c3", &thick_plus_crossing());

    let graph = engine.graph("c3").expect("built");
    assert_eq!(graph.count_kind(NodeKind::Junction), 0);
    let dots: Vec<_> = graph.iter_kind(NodeKind::Dot).collect();
    assert_eq!(dots.len(), 1);
    assert_eq!((dots[0].x, dots[0].y, dots[0].degree), (50, 50, 4));
    assert_eq!(graph.edges.len(), 4);

    let net = engine
        .trace_component("c3", Point::new(30, 50))
        .expect("built")
        .expect("click is on an arm");
    assert_eq!(net.len(), 4);
}

#[test]
fn exported_line_is_one_straight_path() {
    let mut engine = WireEngine::default();
    build(&mut engine, "d", &horizontal_line());

    let options = VectorOptions { simplify: 1.0, snap: true, ..Default::default() };
    let doc = engine.export_vector("d", &options).expect("built");
    assert_eq!((doc.width, doc.height), (100, 100));
    assert_eq!(doc.paths.len(), 1);
    let path = &doc.paths[0];
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].y, path[1].y);

    let svg = doc.to_svg();
    assert_eq!(svg.matches("<path ").count(), 1);
    assert_eq!(svg.matches(" L ").count(), 1);
}

#[test]
fn thinning_is_idempotent_and_keeps_blobs_whole() {
    // Thick plus drawn straight into a mask
    let mut mask = BinaryMask::new(120, 120);
    for y in 15..=105 {
        for x in 20..=100 {
            if (50..=62).contains(&y) || (54..=66).contains(&x) {
                mask.set(x, y, true);
            }
        }
    }

    let thinner = ZhangSuenThinner::default();
    let once = thinner.thin(mask.clone());
    let twice = thinner.thin(once.clone());
    assert_eq!(once, twice);
    assert!(once.count() < mask.count());

    let labels = connected_components(&once.to_gray(), Connectivity::Eight, Luma([0u8]));
    let components = labels.pixels().map(|p| p[0]).max().unwrap_or_default();
    assert_eq!(components, 1);
}

#[test]
fn edges_start_and_end_on_their_nodes() {
    let mut img = blank(200, 140);
    ink(&mut img, 20, 59, 180, 61);
    ink(&mut img, 59, 20, 61, 120);
    ink(&mut img, 139, 60, 141, 120);
    ink(&mut img, 55, 55, 65, 65);
    ink(&mut img, 100, 100, 170, 102);

    let graph = Pipeline::builder().build().process(&raster(&img)).expect("valid raster");
    assert!(!graph.edges.is_empty());
    for edge in &graph.edges {
        let a = graph.node(edge.a).expect("edge start exists").point();
        let b = graph.node(edge.b).expect("edge end exists").point();
        assert_eq!(edge.points.first(), Some(&a));
        assert_eq!(edge.points.last(), Some(&b));
    }
    for (i, node) in graph.nodes.iter().enumerate() {
        assert_eq!(node.id, i);
    }
}

fn square_loop() -> Graph {
    let corners = [Point::new(10, 10), Point::new(30, 10), Point::new(30, 30), Point::new(10, 30)];
    let nodes = corners
        .iter()
        .enumerate()
        .map(|(id, p)| Node { id, x: p.x, y: p.y, degree: 2, kind: NodeKind::Junction })
        .collect();
    let edges = (0..4)
        .map(|i| {
            let (from, to) = (corners[i], corners[(i + 1) % 4]);
            let steps = (to.x - from.x).abs().max((to.y - from.y).abs());
            let points = (0..=steps)
                .map(|s| {
                    Point::new(
                        from.x + (to.x - from.x).signum() * s,
                        from.y + (to.y - from.y).signum() * s,
                    )
                })
                .collect();
            Edge { a: i, b: (i + 1) % 4, points }
        })
        .collect();
    Graph::new(40, 40, nodes, edges)
}

#[test]
fn tracing_a_cycle_terminates() {
    let graph = square_loop();
    let tracer = Tracer::new(&graph, &TraceParams::default());

    let path = tracer
        .trace_path(Point::new(20, 10), TraceOptions::default())
        .expect("click is on the loop");
    // Each edge contributes at most once.
    assert!(path.len() <= 4 * 21);
    assert!(path.len() > 21);

    let net = tracer.trace_component(Point::new(30, 20)).expect("click is on the loop");
    assert_eq!(net.len(), 4);
}

#[test]
fn douglas_peucker_keeps_ends_and_never_grows() {
    let zigzag: Vec<Point> = (0..50).map(|x| Point::new(x, if x % 7 == 0 { 2 } else { 0 })).collect();
    let simplifier = DouglasPeuckerSimplifier;

    for tolerance in [0.5, 1.0, 3.0] {
        let out = simplifier.simplify(&zigzag, tolerance);
        assert!(out.len() <= zigzag.len());
        assert_eq!(out.first(), zigzag.first());
        assert_eq!(out.last(), zigzag.last());
    }

    let with_repeats: Vec<Point> = zigzag.iter().flat_map(|&p| [p, p]).collect();
    assert_eq!(simplifier.simplify(&with_repeats, 0.0), zigzag);
    assert_eq!(dedup(&with_repeats), zigzag);
}

#[test]
fn snapping_straight_lines_changes_nothing() {
    let row: Vec<Point> = (5..60).map(|x| Point::new(x, 17)).collect();
    assert_eq!(axis_snap(&row), row);

    let column: Vec<Point> = (5..60).map(|y| Point::new(42, y)).collect();
    assert_eq!(axis_snap(&column), column);

    let doc = VectorDocument::from_polylines(64, 64, [row.as_slice()], &VectorOptions::default());
    assert_eq!(doc.paths, vec![vec![Point::new(5, 17), Point::new(59, 17)]]);
}
