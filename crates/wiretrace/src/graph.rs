use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use ts_rs::TS;

use crate::types::Point;

pub type NodeId = usize;
pub type EdgeId = usize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema, TS,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export)]
pub enum NodeKind {
    /// Stroke end (degree 1)
    Terminal,
    /// Three or more strokes meeting without a drawn blob
    Junction,
    /// Three or more strokes meeting inside a filled junction dot
    Dot,
    /// Unclassified (no grayscale reference was available)
    Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: i32,
    pub y: i32,
    /// 4-connected skeleton neighbours at discovery time
    pub degree: u8,
    pub kind: NodeKind,
}

impl Node {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Undirected skeleton stroke between two nodes; `points` runs from `a` to `b` inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub points: Vec<Point>,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }

    /// The endpoint across from `node`, if `node` is an endpoint at all.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                let dx = (w[1].x - w[0].x) as f64;
                let dy = (w[1].y - w[0].y) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }
}

/// Wire topology extracted from one raster. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    adjacency: OnceLock<Vec<Vec<EdgeId>>>,
}

impl Graph {
    pub fn new(width: u32, height: u32, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            width,
            height,
            nodes,
            edges,
            adjacency: OnceLock::new(),
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, Vec::new(), Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node id -> incident edge indices, built on first use.
    /// A self-loop appears twice in its node's list.
    pub fn adjacency(&self) -> &[Vec<EdgeId>] {
        self.adjacency.get_or_init(|| {
            let mut adj = vec![Vec::new(); self.nodes.len()];
            for (ei, edge) in self.edges.iter().enumerate() {
                if let Some(list) = adj.get_mut(edge.a) {
                    list.push(ei);
                }
                if let Some(list) = adj.get_mut(edge.b) {
                    list.push(ei);
                }
            }
            adj
        })
    }

    pub fn incident_edges(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency().get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn iter_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Every edge references existing nodes and starts/ends on their pixels.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, n)| n.id == i)
            && self.edges.iter().all(|e| {
                match (self.node(e.a), self.node(e.b), e.points.first(), e.points.last()) {
                    (Some(a), Some(b), Some(&first), Some(&last)) => {
                        a.point() == first && b.point() == last
                    }
                    _ => false,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, x: i32, y: i32, degree: u8, kind: NodeKind) -> Node {
        Node { id, x, y, degree, kind }
    }

    #[test]
    fn adjacency_lists_self_loops_twice() {
        let graph = Graph::new(
            10,
            10,
            vec![node(0, 1, 1, 3, NodeKind::Junction), node(1, 5, 1, 1, NodeKind::Terminal)],
            vec![
                Edge { a: 0, b: 1, points: vec![Point::new(1, 1), Point::new(5, 1)] },
                Edge {
                    a: 0,
                    b: 0,
                    points: vec![Point::new(1, 1), Point::new(1, 4), Point::new(1, 1)],
                },
            ],
        );
        assert_eq!(graph.incident_edges(0), &[0, 1, 1]);
        assert_eq!(graph.incident_edges(1), &[0]);
        assert!(graph.incident_edges(7).is_empty());
        assert!(graph.edges[1].is_loop());
        assert!(graph.is_consistent());
    }

    #[test]
    fn inconsistent_endpoints_are_detected() {
        let graph = Graph::new(
            10,
            10,
            vec![node(0, 1, 1, 1, NodeKind::Terminal), node(1, 5, 1, 1, NodeKind::Terminal)],
            vec![Edge { a: 0, b: 1, points: vec![Point::new(1, 1), Point::new(4, 1)] }],
        );
        assert!(!graph.is_consistent());
    }

    #[test]
    fn node_kind_names_are_snake_case() {
        assert_eq!(NodeKind::Dot.to_string(), "dot");
        assert_eq!("terminal".parse::<NodeKind>().ok(), Some(NodeKind::Terminal));
    }
}
