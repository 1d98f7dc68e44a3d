//! Rectangular-kernel morphology.
//!
//! `imageproc::morphology` only offers square and diamond neighbourhoods, so
//! the wide-short and tall-narrow openings used for axis emphasis (and the
//! grayscale black-hat used for text detection) are done here with separable
//! min/max passes. Samples outside the image are ignored, never padded.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

use crate::types::BinaryMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rank {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Anchor the kernel at its centre the way OpenCV does: `size / 2` samples
/// before the pixel, the remainder after.
fn extent(size: u32) -> (usize, usize) {
    let size = size.max(1) as usize;
    let before = size / 2;
    (before, size - 1 - before)
}

fn rank_pass(
    src: &[u8],
    width: usize,
    height: usize,
    size: u32,
    axis: Axis,
    rank: Rank,
) -> Vec<u8> {
    let (before, after) = extent(size);
    if before == 0 && after == 0 {
        return src.to_vec();
    }

    let mut out = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let (pos, len) = match axis {
                Axis::Horizontal => (x, width),
                Axis::Vertical => (y, height),
            };
            let lo = pos.saturating_sub(before);
            let hi = (pos + after).min(len - 1);

            let mut acc = match rank {
                Rank::Min => u8::MAX,
                Rank::Max => u8::MIN,
            };
            for k in lo..=hi {
                let v = match axis {
                    Axis::Horizontal => src[y * width + k],
                    Axis::Vertical => src[k * width + x],
                };
                acc = match rank {
                    Rank::Min => acc.min(v),
                    Rank::Max => acc.max(v),
                };
            }
            out[y * width + x] = acc;
        }
    }
    out
}

fn rank_rect(src: &[u8], width: u32, height: u32, kw: u32, kh: u32, rank: Rank) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return src.to_vec();
    }
    let tmp = rank_pass(src, w, h, kw, Axis::Horizontal, rank);
    rank_pass(&tmp, w, h, kh, Axis::Vertical, rank)
}

pub fn erode_rect(mask: &BinaryMask, kw: u32, kh: u32) -> BinaryMask {
    let data = rank_rect(mask.data(), mask.width(), mask.height(), kw, kh, Rank::Min);
    rebuild(mask, data)
}

pub fn dilate_rect(mask: &BinaryMask, kw: u32, kh: u32) -> BinaryMask {
    let data = rank_rect(mask.data(), mask.width(), mask.height(), kw, kh, Rank::Max);
    rebuild(mask, data)
}

/// Erode then dilate: removes ink runs shorter than the kernel along either axis.
pub fn open_rect(mask: &BinaryMask, kw: u32, kh: u32) -> BinaryMask {
    dilate_rect(&erode_rect(mask, kw, kh), kw, kh)
}

/// Dilate then erode with a square of side `2 * radius + 1`, bridging gaps
/// of up to `2 * radius` pixels.
pub fn close_square(mask: &BinaryMask, radius: u8) -> BinaryMask {
    if radius == 0 {
        return mask.clone();
    }
    let closed = imageproc::morphology::close(&mask.to_gray(), Norm::LInf, radius);
    BinaryMask::from_gray(&closed)
}

/// Grayscale closing minus the original. Bright where thin dark features sit.
pub fn black_hat(gray: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let dilated = rank_rect(gray.as_raw(), w, h, size, size, Rank::Max);
    let closed = rank_rect(&dilated, w, h, size, size, Rank::Min);
    GrayImage::from_fn(w, h, |x, y| {
        let i = (y * w + x) as usize;
        Luma([closed[i].saturating_sub(gray.as_raw()[i])])
    })
}

fn rebuild(like: &BinaryMask, data: Vec<u8>) -> BinaryMask {
    // Lengths always match: rank passes preserve buffer size.
    BinaryMask::from_vec(like.width(), like.height(), data)
        .unwrap_or_else(|_| BinaryMask::new(like.width(), like.height()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let data = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| u8::from(b == b'#')))
            .collect();
        BinaryMask::from_vec(width, height, data).expect("rectangular rows")
    }

    #[test]
    fn horizontal_opening_keeps_long_runs_only() {
        let mask = mask_from_rows(&[
            "..........",
            ".#######..",
            "...#......",
            "...#......",
            "...#......",
        ]);
        let opened = open_rect(&mask, 5, 1);
        assert_eq!(opened.count(), 7);
        assert!(opened.get(1, 1) && opened.get(7, 1));
        assert!(!opened.get(3, 3));
    }

    #[test]
    fn vertical_opening_keeps_tall_runs_only() {
        let mask = mask_from_rows(&[
            "...#......",
            "...#..##..",
            "...#......",
            "...#......",
            "...#......",
        ]);
        let opened = open_rect(&mask, 1, 5);
        assert_eq!(opened.count(), 5);
        assert!(!opened.get(6, 1));
    }

    #[test]
    fn closing_bridges_small_gaps() {
        let mask = mask_from_rows(&[
            "............",
            ".####..####.",
            "............",
        ]);
        assert_eq!(close_square(&mask, 0), mask);
        let closed = close_square(&mask, 1);
        assert!(closed.get(5, 1) && closed.get(6, 1));
    }

    #[test]
    fn black_hat_lights_up_thin_dark_lines() {
        let mut gray = GrayImage::from_pixel(20, 20, Luma([255]));
        for x in 2..18 {
            gray.put_pixel(x, 10, Luma([0]));
        }
        let bh = black_hat(&gray, 5);
        assert_eq!(bh.get_pixel(10, 10)[0], 255);
        assert_eq!(bh.get_pixel(10, 3)[0], 0);
    }
}
