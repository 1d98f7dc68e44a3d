//! Click-driven retrieval over a built [`Graph`].
//!
//! Every query first snaps the click onto the closest edge segment. From there
//! [`Tracer::trace_path`] follows one wire in both directions and
//! [`Tracer::trace_component`] floods the whole net.

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::{
    algorithms::simplification::dedup,
    config::{TraceOptions, TraceParams},
    error::{Result, WireError},
    graph::{EdgeId, Graph, NodeId},
    types::Point,
};

/// Where a click landed on the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    pub edge: EdgeId,
    /// Index of the first point of the closest segment
    pub segment: usize,
    /// Point index the trace starts from: the nearer end of that segment
    pub index: usize,
    pub distance: f64,
}

fn segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0)
    };
    let (ex, ey) = (a[0] + t * dx - p[0], a[1] + t * dy - p[1]);
    (ex * ex + ey * ey).sqrt()
}

fn point_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

pub struct Tracer<'g> {
    graph: &'g Graph,
    snap_radius: f64,
}

impl<'g> Tracer<'g> {
    pub fn new(graph: &'g Graph, params: &TraceParams) -> Self {
        Self {
            graph,
            snap_radius: params.snap_radius,
        }
    }

    /// Closest edge segment to `click`, if any lies within the snap radius.
    pub fn locate(&self, click: Point) -> Result<EdgeHit> {
        let p = click.to_f64();
        let mut best: Option<EdgeHit> = None;

        for (ei, edge) in self.graph.edges.iter().enumerate() {
            if let [only] = edge.points.as_slice() {
                let d = point_distance(p, only.to_f64());
                if best.is_none_or(|b| d < b.distance) {
                    best = Some(EdgeHit { edge: ei, segment: 0, index: 0, distance: d });
                }
                continue;
            }
            for (si, pair) in edge.points.windows(2).enumerate() {
                let (a, b) = (pair[0].to_f64(), pair[1].to_f64());
                let d = segment_distance(p, a, b);
                if best.is_none_or(|hit| d < hit.distance) {
                    let index = if point_distance(p, a) <= point_distance(p, b) { si } else { si + 1 };
                    best = Some(EdgeHit { edge: ei, segment: si, index, distance: d });
                }
            }
        }

        match best {
            Some(hit) if hit.distance <= self.snap_radius => Ok(hit),
            _ => Err(WireError::NoNearbyStroke { x: click.x, y: click.y }),
        }
    }

    /// Follow the wire under `click` in both directions.
    ///
    /// With `stop_at` the walk ends at the first node either way; otherwise it
    /// runs on through nodes that have exactly one other incident edge.
    pub fn trace_path(&self, click: Point, options: TraceOptions) -> Option<Vec<Point>> {
        let hit = self.locate(click).ok()?;
        let edge = &self.graph.edges[hit.edge];
        let mut visited = HashSet::from([hit.edge]);

        let mut toward_a: Vec<Point> = edge.points[..=hit.index].iter().rev().copied().collect();
        let mut toward_b: Vec<Point> = edge.points[hit.index..].to_vec();
        if !options.stop_at {
            self.extend(&mut toward_a, hit.edge, edge.a, &mut visited);
            self.extend(&mut toward_b, hit.edge, edge.b, &mut visited);
        }

        toward_a.reverse();
        toward_a.extend(toward_b);
        let path = dedup(&toward_a);
        trace!(edge = hit.edge, points = path.len(), edges = visited.len(), "traced path");
        (path.len() >= 2).then_some(path)
    }

    fn extend(
        &self,
        path: &mut Vec<Point>,
        mut edge: EdgeId,
        mut node: NodeId,
        visited: &mut HashSet<EdgeId>,
    ) {
        loop {
            let mut others = self
                .graph
                .incident_edges(node)
                .iter()
                .copied()
                .filter(|&e| e != edge);
            let (Some(next), None) = (others.next(), others.next()) else {
                return;
            };
            if !visited.insert(next) {
                return;
            }
            let e = &self.graph.edges[next];
            if e.a == node {
                path.extend_from_slice(&e.points);
                node = e.b;
            } else {
                path.extend(e.points.iter().rev());
                node = e.a;
            }
            edge = next;
        }
    }

    /// Every edge polyline in the net containing the clicked edge, in flood order.
    pub fn trace_component(&self, click: Point) -> Option<Vec<Vec<Point>>> {
        let hit = self.locate(click).ok()?;
        let mut seen = HashSet::from([hit.edge]);
        let mut queue = VecDeque::from([hit.edge]);
        let mut polylines = Vec::new();

        while let Some(ei) = queue.pop_front() {
            let edge = &self.graph.edges[ei];
            polylines.push(edge.points.clone());
            for node in [edge.a, edge.b] {
                for &next in self.graph.incident_edges(node) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        trace!(edges = polylines.len(), "traced component");
        Some(polylines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeKind};

    fn node(id: NodeId, x: i32, y: i32, degree: u8, kind: NodeKind) -> Node {
        Node { id, x, y, degree, kind }
    }

    fn line(from: (i32, i32), to: (i32, i32)) -> Vec<Point> {
        let (dx, dy) = ((to.0 - from.0).signum(), (to.1 - from.1).signum());
        let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs());
        (0..=steps)
            .map(|i| Point::new(from.0 + i * dx, from.1 + i * dy))
            .collect()
    }

    /// Two collinear edges joined at a pass-through node, plus a branch at a junction.
    fn chain() -> Graph {
        Graph::new(
            100,
            100,
            vec![
                node(0, 10, 50, 1, NodeKind::Terminal),
                node(1, 40, 50, 1, NodeKind::Dot),
                node(2, 70, 50, 3, NodeKind::Junction),
                node(3, 90, 50, 1, NodeKind::Terminal),
                node(4, 70, 80, 1, NodeKind::Terminal),
            ],
            vec![
                Edge { a: 0, b: 1, points: line((10, 50), (40, 50)) },
                Edge { a: 1, b: 2, points: line((40, 50), (70, 50)) },
                Edge { a: 2, b: 3, points: line((70, 50), (90, 50)) },
                Edge { a: 2, b: 4, points: line((70, 50), (70, 80)) },
            ],
        )
    }

    fn square_loop() -> Graph {
        let corners = [(10, 10), (30, 10), (30, 30), (10, 30)];
        Graph::new(
            40,
            40,
            corners
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| node(i, x, y, 2, NodeKind::Node))
                .collect(),
            (0..4)
                .map(|i| Edge { a: i, b: (i + 1) % 4, points: line(corners[i], corners[(i + 1) % 4]) })
                .collect(),
        )
    }

    #[test]
    fn locate_snaps_within_radius_only() {
        let graph = chain();
        let tracer = Tracer::new(&graph, &TraceParams::default());
        let hit = tracer.locate(Point::new(20, 55)).expect("close to edge 0");
        assert_eq!(hit.edge, 0);
        assert_eq!(hit.index, 10);
        assert!((hit.distance - 5.0).abs() < 1e-9);
        assert!(matches!(
            tracer.locate(Point::new(20, 70)),
            Err(WireError::NoNearbyStroke { x: 20, y: 70 })
        ));
    }

    #[test]
    fn path_runs_through_pass_through_nodes() {
        let graph = chain();
        let tracer = Tracer::new(&graph, &TraceParams::default());
        let path = tracer.trace_path(Point::new(20, 50), TraceOptions::default()).expect("path");
        assert_eq!(path.first(), Some(&Point::new(10, 50)));
        assert_eq!(path.last(), Some(&Point::new(70, 50)));
        assert_eq!(path.len(), 61);
    }

    #[test]
    fn stop_at_ends_at_first_node() {
        let graph = chain();
        let tracer = Tracer::new(&graph, &TraceParams::default());
        let path = tracer
            .trace_path(Point::new(20, 50), TraceOptions { stop_at: true })
            .expect("path");
        assert_eq!(path.first(), Some(&Point::new(10, 50)));
        assert_eq!(path.last(), Some(&Point::new(40, 50)));
    }

    #[test]
    fn component_returns_every_edge_of_the_net() {
        let graph = chain();
        let tracer = Tracer::new(&graph, &TraceParams::default());
        let polylines = tracer.trace_component(Point::new(85, 51)).expect("net");
        assert_eq!(polylines.len(), 4);
        assert_eq!(polylines[0], graph.edges[2].points);
    }

    #[test]
    fn cycles_terminate() {
        let graph = square_loop();
        let tracer = Tracer::new(&graph, &TraceParams::default());
        let path = tracer.trace_path(Point::new(20, 10), TraceOptions::default()).expect("path");
        // Each edge is walked once: 4 sides of 20 px close back on the start.
        assert_eq!(path.len(), 81);
        assert_eq!(path.first(), path.last());
        assert_eq!(tracer.trace_component(Point::new(20, 10)).map(|p| p.len()), Some(4));
    }

    #[test]
    fn empty_graph_finds_nothing() {
        let graph = Graph::empty(100, 100);
        let tracer = Tracer::new(&graph, &TraceParams::default());
        assert!(tracer.trace_path(Point::new(50, 50), TraceOptions::default()).is_none());
        assert!(tracer.trace_component(Point::new(50, 50)).is_none());
    }
}
