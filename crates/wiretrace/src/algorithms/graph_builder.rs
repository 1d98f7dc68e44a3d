use std::collections::{HashMap, HashSet};

use image::GrayImage;
use tracing::debug;

use crate::{
    config::GraphParams,
    graph::{Edge, Graph, Node, NodeId, NodeKind},
    traits::GraphBuilder,
    types::{BinaryMask, Point},
};

/// Walk order for 4-neighbours: N, E, S, W.
const STEPS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Builds a wire graph by walking 4-connected skeleton runs between
/// non-pass-through pixels.
#[derive(Debug, Clone, Default)]
pub struct SkeletonGraphBuilder {
    pub params: GraphParams,
}

impl SkeletonGraphBuilder {
    pub fn new(params: GraphParams) -> Self {
        Self { params }
    }

    fn degree(skeleton: &BinaryMask, x: i32, y: i32) -> u8 {
        STEPS
            .iter()
            .filter(|(dx, dy)| skeleton.is_on(x + dx, y + dy))
            .count() as u8
    }

    /// Fraction of dark pixels inside the disk around `(cx, cy)`.
    fn dark_fill(&self, gray: &GrayImage, cx: i32, cy: i32) -> f64 {
        let r = self.params.dot_radius;
        let (w, h) = (gray.width() as i32, gray.height() as i32);
        let mut total = 0u32;
        let mut dark = 0u32;
        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 || x >= w || y >= h || dx * dx + dy * dy > r * r {
                    continue;
                }
                total += 1;
                if gray.get_pixel(x as u32, y as u32)[0] < self.params.dark_level {
                    dark += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            dark as f64 / total as f64
        }
    }

    fn classify(&self, degree: u8, x: i32, y: i32, reference: Option<&GrayImage>) -> NodeKind {
        let Some(gray) = reference else {
            return NodeKind::Node;
        };
        if degree == 1 {
            NodeKind::Terminal
        } else if self.dark_fill(gray, x, y) > self.params.dot_fill {
            NodeKind::Dot
        } else {
            NodeKind::Junction
        }
    }

    /// Interior skeleton pixels whose 4-degree is neither 0 nor 2.
    fn discover_nodes(&self, skeleton: &BinaryMask, reference: Option<&GrayImage>) -> Vec<Node> {
        let (w, h) = (skeleton.width() as i32, skeleton.height() as i32);
        let mut nodes = Vec::new();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                if !skeleton.is_on(x, y) {
                    continue;
                }
                let degree = Self::degree(skeleton, x, y);
                if degree == 0 || degree == 2 {
                    continue;
                }
                nodes.push(Node {
                    id: nodes.len(),
                    x,
                    y,
                    degree,
                    kind: self.classify(degree, x, y, reference),
                });
            }
        }
        nodes
    }
}

/// Mutable state shared by all walks over one skeleton.
struct Walker<'a> {
    skeleton: &'a BinaryMask,
    nodes: Vec<Node>,
    node_at: HashMap<usize, NodeId>,
    visited: Vec<bool>,
    links: HashSet<(usize, usize)>,
    edges: Vec<Edge>,
    /// Kind given to dead ends found mid-walk; unclassified builds keep `Node`
    dead_end: NodeKind,
}

impl<'a> Walker<'a> {
    fn new(skeleton: &'a BinaryMask, nodes: Vec<Node>, dead_end: NodeKind) -> Self {
        let node_at = nodes
            .iter()
            .map(|n| (skeleton.index(n.x as u32, n.y as u32), n.id))
            .collect();
        Self {
            skeleton,
            nodes,
            node_at,
            visited: vec![false; skeleton.data().len()],
            links: HashSet::new(),
            edges: Vec::new(),
            dead_end,
        }
    }

    fn idx(&self, p: Point) -> usize {
        self.skeleton.index(p.x as u32, p.y as u32)
    }

    fn link(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    fn is_node(&self, p: Point) -> bool {
        self.node_at.contains_key(&self.idx(p))
    }

    fn neighbours(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        STEPS
            .iter()
            .map(move |(dx, dy)| Point::new(p.x + dx, p.y + dy))
            .filter(|q| self.skeleton.is_on(q.x, q.y))
    }

    fn walk_all(&mut self) {
        // Synthetic terminals are appended during the loop and visited too.
        let mut i = 0;
        while i < self.nodes.len() {
            let origin = self.nodes[i].point();
            let firsts: Vec<Point> = self.neighbours(origin).collect();
            for first in firsts {
                let fi = self.idx(first);
                let used = if self.is_node(first) {
                    self.links.contains(&Self::link(self.idx(origin), fi))
                } else {
                    self.visited[fi]
                };
                if !used {
                    self.walk(i, origin, first);
                }
            }
            i += 1;
        }
    }

    fn walk(&mut self, from: NodeId, origin: Point, first: Point) {
        let mut points = vec![origin];
        let mut prev = origin;
        let mut cur = first;
        self.links.insert(Self::link(self.idx(origin), self.idx(first)));

        loop {
            let ci = self.idx(cur);
            self.visited[ci] = true;
            points.push(cur);

            if let Some(&to) = self.node_at.get(&ci) {
                self.links.insert(Self::link(self.idx(prev), ci));
                self.edges.push(Edge { a: from, b: to, points });
                return;
            }

            let next = self.neighbours(cur).find(|&q| {
                q != prev && (!self.visited[self.idx(q)] || self.is_node(q))
            });

            match next {
                Some(q) => {
                    prev = cur;
                    cur = q;
                }
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node {
                        id,
                        x: cur.x,
                        y: cur.y,
                        degree: 1,
                        kind: self.dead_end,
                    });
                    self.node_at.insert(ci, id);
                    self.edges.push(Edge { a: from, b: id, points });
                    return;
                }
            }
        }
    }
}

impl GraphBuilder for SkeletonGraphBuilder {
    fn build(&self, skeleton: &BinaryMask, reference: Option<&GrayImage>) -> Graph {
        let (width, height) = (skeleton.width(), skeleton.height());
        if width < 3 || height < 3 {
            return Graph::empty(width, height);
        }

        let nodes = self.discover_nodes(skeleton, reference);
        let discovered = nodes.len();
        let dead_end = if reference.is_some() { NodeKind::Terminal } else { NodeKind::Node };
        let mut walker = Walker::new(skeleton, nodes, dead_end);
        walker.walk_all();

        debug!(
            nodes = walker.nodes.len(),
            synthetic = walker.nodes.len() - discovered,
            edges = walker.edges.len(),
            "graph built"
        );
        Graph::new(width, height, walker.nodes, walker.edges)
    }
}
