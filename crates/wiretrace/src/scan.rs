//! Pixel-level fallbacks for clicks that miss every graph edge. The stripe
//! scan looks for an axis-aligned band of line-coloured pixels running
//! through the click; the Hough finder looks for the nearest near-axis edge
//! line in a window around it.

use image::{GrayImage, imageops};
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;
use ts_rs::TS;

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SegmentAxis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
    pub axis: SegmentAxis,
}

impl LineSegment {
    pub fn length(&self) -> i32 {
        (self.end.x - self.start.x).abs() + (self.end.y - self.start.y).abs()
    }

    pub fn to_polyline(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }
}

#[derive(Debug, Clone)]
pub struct LineScanner {
    /// Half-height of the stripe sampled across the line
    pub half_thickness: u32,
    /// Consecutive empty columns tolerated while extending
    pub gap_tolerance: u32,
    pub min_length: i32,
    /// Luminance distance from the local background that counts as line
    pub band: f64,
    /// Backgrounds brighter than this mean lines are dark
    pub light_background: f64,
    pub seed_radius: u32,
    pub seed_hits: usize,
    pub min_window: u32,
    pub max_window: u32,
}

impl Default for LineScanner {
    fn default() -> Self {
        Self {
            half_thickness: 3,
            gap_tolerance: 3,
            min_length: 12,
            band: 40.0,
            light_background: 140.0,
            seed_radius: 2,
            seed_hits: 6,
            min_window: 40,
            max_window: 140,
        }
    }
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy)]
struct Window {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Window {
    fn around(cx: u32, cy: u32, radius: u32, width: u32, height: u32) -> Self {
        Self {
            x0: cx.saturating_sub(radius),
            y0: cy.saturating_sub(radius),
            x1: (cx + radius).min(width - 1),
            y1: (cy + radius).min(height - 1),
        }
    }

    fn pixels(self) -> impl Iterator<Item = (u32, u32)> {
        (self.y0..=self.y1).flat_map(move |y| (self.x0..=self.x1).map(move |x| (x, y)))
    }
}

impl LineScanner {
    fn window_radius(&self, width: u32, height: u32) -> u32 {
        ((width.max(height) as f64 * 0.05) as u32).clamp(self.min_window, self.max_window)
    }

    /// Longest horizontal or vertical stripe through `click`, if long enough.
    pub fn scan(&self, gray: &GrayImage, click: Point) -> Option<LineSegment> {
        let (width, height) = gray.dimensions();
        if click.x < 0 || click.y < 0 || click.x as u32 >= width || click.y as u32 >= height {
            return None;
        }
        let (cx, cy) = (click.x as u32, click.y as u32);
        let luma = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;

        let window = Window::around(cx, cy, self.window_radius(width, height), width, height);
        let (sum, count) = window
            .pixels()
            .fold((0.0, 0usize), |(s, n), (x, y)| (s + luma(x, y), n + 1));
        let background = sum / count.max(1) as f64;
        let dark_lines = background > self.light_background;
        let dark = (background - self.band).clamp(0.0, 255.0);
        let bright = (background + self.band).clamp(0.0, 255.0);
        let is_line = |x: u32, y: u32| {
            let l = luma(x, y);
            if dark_lines { l <= dark } else { l >= bright }
        };

        let seed = Window::around(cx, cy, self.seed_radius, width, height);
        let hits = seed.pixels().filter(|&(x, y)| is_line(x, y)).count();
        if hits < self.seed_hits {
            trace!(hits, "scan seed too weak");
            return None;
        }

        let stripe = self.half_thickness * 2 + 1;
        let needed = stripe.saturating_sub(1).max(1) as usize;
        let t = self.half_thickness;

        let (y0, y1) = (cy.saturating_sub(t), (cy + t).min(height - 1));
        let column_on = |x: u32| (y0..=y1).filter(|&y| is_line(x, y)).count() >= needed;
        let (left, right) = self.extend(cx, window.x0, window.x1, column_on);

        let (x0, x1) = (cx.saturating_sub(t), (cx + t).min(width - 1));
        let row_on = |y: u32| (x0..=x1).filter(|&x| is_line(x, y)).count() >= needed;
        let (top, bottom) = self.extend(cy, window.y0, window.y1, row_on);

        let (len_h, len_v) = ((right - left) as i32, (bottom - top) as i32);
        if len_h.max(len_v) < self.min_length {
            return None;
        }
        let segment = if len_h >= len_v {
            LineSegment {
                start: Point::new(left as i32, click.y),
                end: Point::new(right as i32, click.y),
                axis: SegmentAxis::Horizontal,
            }
        } else {
            LineSegment {
                start: Point::new(click.x, top as i32),
                end: Point::new(click.x, bottom as i32),
                axis: SegmentAxis::Vertical,
            }
        };
        trace!(?segment, "scan hit");
        Some(segment)
    }

    /// Grow `[from, from]` within `[lo, hi]` while `on` holds, skipping gaps of
    /// at most `gap_tolerance` positions.
    fn extend(&self, from: u32, lo: u32, hi: u32, on: impl Fn(u32) -> bool) -> (u32, u32) {
        let mut low = from;
        let mut probe = from;
        let mut miss = 0;
        while probe > lo {
            probe -= 1;
            if on(probe) {
                low = probe;
                miss = 0;
            } else {
                miss += 1;
                if miss > self.gap_tolerance {
                    break;
                }
            }
        }

        let mut high = from;
        let mut probe = from;
        miss = 0;
        while probe < hi {
            probe += 1;
            if on(probe) {
                high = probe;
                miss = 0;
            } else {
                miss += 1;
                if miss > self.gap_tolerance {
                    break;
                }
            }
        }
        (low, high)
    }
}

/// Canny edges plus a Hough transform over a window around the click.
/// Only lines within a few degrees of an axis are considered.
#[derive(Debug, Clone)]
pub struct HoughLineFinder {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Lines tilted further than this from both axes are ignored
    pub axis_tolerance_degrees: u32,
    /// Farthest the click may be from an accepted segment
    pub max_distance: f64,
    /// Shortest segment kept; grows to a quarter of the window side
    pub min_length: u32,
    pub suppression_radius: u32,
    pub min_window: u32,
    pub max_window: u32,
}

impl Default for HoughLineFinder {
    fn default() -> Self {
        Self {
            canny_low: 30.0,
            canny_high: 90.0,
            axis_tolerance_degrees: 3,
            max_distance: 12.0,
            min_length: 20,
            suppression_radius: 4,
            min_window: 30,
            max_window: 120,
        }
    }
}

/// Segment in window coordinates.
#[derive(Debug, Clone, Copy)]
struct Span {
    a: (f64, f64),
    b: (f64, f64),
}

impl Span {
    fn distance_to(&self, (px, py): (f64, f64)) -> f64 {
        let (vx, vy) = (self.b.0 - self.a.0, self.b.1 - self.a.1);
        let (wx, wy) = (px - self.a.0, py - self.a.1);
        let along = vx * wx + vy * wy;
        let norm = vx * vx + vy * vy;
        let t = if norm == 0.0 { 0.0 } else { (along / norm).clamp(0.0, 1.0) };
        (px - (self.a.0 + t * vx)).hypot(py - (self.a.1 + t * vy))
    }
}

impl HoughLineFinder {
    fn near_axis(&self, angle: u32) -> bool {
        let tol = self.axis_tolerance_degrees;
        angle <= tol || angle >= 180 - tol.min(180) || angle.abs_diff(90) <= tol
    }

    /// Extent of the edge pixels lying on `line`, if at least `min_length` long.
    fn span_of(edges: &GrayImage, line: PolarLine, min_length: f64) -> Option<Span> {
        let (sin, cos) = (line.angle_in_degrees as f64).to_radians().sin_cos();
        let r = line.r as f64;
        // Unit direction along the line.
        let (dx, dy) = (-sin, cos);

        let (lo, hi) = edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| (x as f64, y as f64))
            // Accumulator bins truncate r, so allow up to one bin of slack.
            .filter(|&(x, y)| (x * cos + y * sin - r).abs() < 2.0)
            .map(|(x, y)| x * dx + y * dy)
            .fold(None, |acc: Option<(f64, f64)>, t| match acc {
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
                None => Some((t, t)),
            })?;
        if hi - lo < min_length {
            return None;
        }
        let foot = (r * cos, r * sin);
        Some(Span {
            a: (foot.0 + lo * dx, foot.1 + lo * dy),
            b: (foot.0 + hi * dx, foot.1 + hi * dy),
        })
    }

    /// Nearest near-axis segment within `max_distance` of `click`.
    pub fn find(&self, gray: &GrayImage, click: Point) -> Option<LineSegment> {
        let (width, height) = gray.dimensions();
        if click.x < 0 || click.y < 0 || click.x as u32 >= width || click.y as u32 >= height {
            return None;
        }
        let (cx, cy) = (click.x as u32, click.y as u32);
        let pad = ((width.max(height) as f64 * 0.05) as u32).clamp(self.min_window, self.max_window);
        let window = Window::around(cx, cy, pad, width, height);
        let (rw, rh) = (window.x1 - window.x0 + 1, window.y1 - window.y0 + 1);

        let roi = imageops::crop_imm(gray, window.x0, window.y0, rw, rh).to_image();
        let edges = imageproc::edges::canny(&roi, self.canny_low, self.canny_high);
        let min_length = self.min_length.max(rw.max(rh) / 4);
        let options = LineDetectionOptions {
            vote_threshold: min_length,
            suppression_radius: self.suppression_radius,
        };

        let local = ((cx - window.x0) as f64, (cy - window.y0) as f64);
        let (distance, span) = detect_lines(&edges, options)
            .into_iter()
            .filter(|line| self.near_axis(line.angle_in_degrees))
            .filter_map(|line| Self::span_of(&edges, line, min_length as f64))
            .map(|span| (span.distance_to(local), span))
            .filter(|(d, _)| *d <= self.max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))?;

        let to_image = |(x, y): (f64, f64)| {
            Point::new(
                (x.round() as i32 + window.x0 as i32).clamp(0, width as i32 - 1),
                (y.round() as i32 + window.y0 as i32).clamp(0, height as i32 - 1),
            )
        };
        let (mut start, mut end) = (to_image(span.a), to_image(span.b));
        if (end.x, end.y) < (start.x, start.y) {
            std::mem::swap(&mut start, &mut end);
        }
        let axis = if (end.x - start.x).abs() >= (end.y - start.y).abs() {
            SegmentAxis::Horizontal
        } else {
            SegmentAxis::Vertical
        };
        let segment = LineSegment { start, end, axis };
        trace!(?segment, distance, "hough hit");
        Some(segment)
    }
}

/// [`LineScanner::scan`] with default settings.
pub fn scan_for_line_segment(gray: &GrayImage, click: Point) -> Option<LineSegment> {
    LineScanner::default().scan(gray, click)
}
