use std::fmt::Write as _;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    algorithms::{DouglasPeuckerSimplifier, axis_snap},
    config::VectorOptions,
    graph::Graph,
    traits::PolylineSimplifier,
    types::Point,
};

/// Simplified, uniformly styled polylines ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct VectorDocument {
    pub width: u32,
    pub height: u32,
    pub stroke: String,
    pub stroke_width: f64,
    /// One polyline per graph edge, in edge order
    pub paths: Vec<Vec<Point>>,
}

impl VectorDocument {
    /// Snap (optionally) then simplify every edge of `graph`.
    pub fn from_graph(graph: &Graph, options: &VectorOptions) -> Self {
        Self::from_polylines(
            graph.width,
            graph.height,
            graph.edges.iter().map(|e| e.points.as_slice()),
            options,
        )
    }

    pub fn from_polylines<'a>(
        width: u32,
        height: u32,
        polylines: impl IntoIterator<Item = &'a [Point]>,
        options: &VectorOptions,
    ) -> Self {
        let simplifier = DouglasPeuckerSimplifier;
        let paths = polylines
            .into_iter()
            .map(|points| {
                let snapped = if options.snap { axis_snap(points) } else { points.to_vec() };
                simplifier.simplify(&snapped, options.simplify)
            })
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            width,
            height,
            stroke: options.stroke.clone(),
            stroke_width: options.stroke_width,
            paths,
        }
    }

    /// `d` attribute for one polyline: `M x y L x y ...`.
    pub fn path_data(points: &[Point]) -> String {
        let mut d = String::with_capacity(points.len() * 10);
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                d.push(' ');
            }
            let _ = write!(d, "{} {} {}", if i == 0 { 'M' } else { 'L' }, p.x, p.y);
        }
        d
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        );
        let _ = writeln!(
            svg,
            r#"<g fill="none" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round">"#,
            escape_attr(&self.stroke),
            self.stroke_width,
        );
        for path in &self.paths {
            let _ = writeln!(svg, r#"<path d="{}"/>"#, Self::path_data(path));
        }
        svg.push_str("</g>\n</svg>\n");
        svg
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// SVG markup for a whole graph.
pub fn to_svg(graph: &Graph, options: &VectorOptions) -> String {
    VectorDocument::from_graph(graph, options).to_svg()
}
