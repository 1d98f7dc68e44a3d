use geo_types::{Coord, LineString};

use crate::{traits::PolylineSimplifier, types::Point};

/// An edge is flattened onto an axis only when its bounding box is at least
/// this many times longer along that axis than across it.
pub const SNAP_DOMINANCE: i32 = 2;

/// Douglas-Peucker simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier;

impl PolylineSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, points: &[Point], tolerance: f64) -> Vec<Point> {
        use geo::Simplify;

        let points = dedup(points);
        if tolerance <= 0.0 || points.len() < 3 {
            return points;
        }

        let line: LineString<f64> = points
            .iter()
            .map(|p| Coord { x: p.x as f64, y: p.y as f64 })
            .collect();
        // RDP keeps a subset of the input vertices, so rounding is exact.
        line.simplify(&tolerance)
            .coords()
            .map(|c| Point::new(c.x.round() as i32, c.y.round() as i32))
            .collect()
    }
}

/// Drop consecutive duplicate points.
pub fn dedup(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

fn median(mut values: Vec<i32>) -> i32 {
    values.sort_unstable();
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        ((values[n / 2 - 1] + values[n / 2]) as f64 / 2.0).round() as i32
    }
}

/// Flatten a near-horizontal polyline onto its median row, or a near-vertical
/// one onto its median column. Anything else is returned unchanged.
pub fn axis_snap(points: &[Point]) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let (w, h) = (max_x - min_x, max_y - min_y);

    if w > 0 && w >= SNAP_DOMINANCE * h {
        let y = median(points.iter().map(|p| p.y).collect());
        dedup(&points.iter().map(|p| Point::new(p.x, y)).collect::<Vec<_>>())
    } else if h > 0 && h >= SNAP_DOMINANCE * w {
        let x = median(points.iter().map(|p| p.x).collect());
        dedup(&points.iter().map(|p| Point::new(x, p.y)).collect::<Vec<_>>())
    } else {
        points.to_vec()
    }
}
