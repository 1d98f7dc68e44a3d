use tracing::trace;

use crate::{traits::Skeletonizer, types::BinaryMask};

/// Clockwise from north: P2..P9 in the usual Zhang-Suen naming.
const RING: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Two-subiteration Zhang-Suen thinning, repeated until a full pass removes
/// nothing.
///
/// Border pixels are never removed. Deletions found during a subiteration are
/// applied only after the whole image has been scanned, so the result does not
/// depend on scan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZhangSuenThinner;

impl ZhangSuenThinner {
    fn neighbours(mask: &BinaryMask, x: u32, y: u32) -> [u8; 8] {
        let mut p = [0u8; 8];
        for (slot, (dx, dy)) in p.iter_mut().zip(RING) {
            *slot = u8::from(mask.is_on(x as i32 + dx, y as i32 + dy));
        }
        p
    }

    fn removable(p: &[u8; 8], step: usize) -> bool {
        let b: u8 = p.iter().sum();
        if !(2..=6).contains(&b) {
            return false;
        }
        let a = (0..8).filter(|&i| p[i] == 0 && p[(i + 1) % 8] == 1).count();
        if a != 1 {
            return false;
        }
        let (p2, p4, p6, p8) = (p[0], p[2], p[4], p[6]);
        if step == 0 {
            p2 * p4 * p6 == 0 && p4 * p6 * p8 == 0
        } else {
            p2 * p4 * p8 == 0 && p2 * p6 * p8 == 0
        }
    }

    fn subiteration(mask: &mut BinaryMask, step: usize, doomed: &mut Vec<usize>) -> usize {
        doomed.clear();
        let (w, h) = (mask.width(), mask.height());
        for y in 1..h.saturating_sub(1) {
            for x in 1..w.saturating_sub(1) {
                if !mask.get(x, y) {
                    continue;
                }
                if Self::removable(&Self::neighbours(mask, x, y), step) {
                    doomed.push(mask.index(x, y));
                }
            }
        }
        let data = mask.data_mut();
        for &i in doomed.iter() {
            data[i] = 0;
        }
        doomed.len()
    }
}

impl Skeletonizer for ZhangSuenThinner {
    fn thin(&self, mut mask: BinaryMask) -> BinaryMask {
        let mut doomed = Vec::new();
        let mut passes = 0usize;
        loop {
            let removed = Self::subiteration(&mut mask, 0, &mut doomed)
                + Self::subiteration(&mut mask, 1, &mut doomed);
            passes += 1;
            trace!(passes, removed, "zhang-suen pass");
            if removed == 0 {
                break;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> BinaryMask {
        let mut mask = BinaryMask::new(width, height);
        for &(x0, y0, x1, y1) in rects {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    fn max_run_thickness(mask: &BinaryMask) -> usize {
        // Longest vertical run of ink in any column.
        let mut best = 0;
        for x in 0..mask.width() {
            let mut run = 0;
            for y in 0..mask.height() {
                if mask.get(x, y) {
                    run += 1;
                    best = best.max(run);
                } else {
                    run = 0;
                }
            }
        }
        best
    }

    #[test]
    fn thick_bar_thins_to_single_row() {
        let skeleton = ZhangSuenThinner::default().thin(filled(100, 100, &[(10, 49, 89, 51)]));
        assert_eq!(max_run_thickness(&skeleton), 1);
        assert!(skeleton.get(50, 50));
        assert!(!skeleton.get(50, 49) && !skeleton.get(50, 51));
    }

    #[test]
    fn thinning_is_idempotent() {
        let thinner = ZhangSuenThinner::default();
        let once = thinner.thin(filled(60, 60, &[(5, 20, 55, 24), (28, 5, 32, 55)]));
        let twice = thinner.thin(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn border_pixels_survive() {
        let skeleton = ZhangSuenThinner::default().thin(filled(20, 5, &[(0, 0, 19, 4)]));
        assert!(skeleton.get(0, 0));
        assert!(skeleton.get(19, 4));
    }

    #[test]
    fn empty_and_single_pixel_masks_are_untouched() {
        let thinner = ZhangSuenThinner::default();
        let empty = BinaryMask::new(8, 8);
        assert_eq!(thinner.thin(empty.clone()), empty);
        let dot = filled(8, 8, &[(4, 4, 4, 4)]);
        assert_eq!(thinner.thin(dot.clone()), dot);
    }
}
