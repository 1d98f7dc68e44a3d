use image::{GrayImage, Luma};
use imageproc::{
    geometric_transformations::{Interpolation, rotate_about_center},
    hough::{LineDetectionOptions, detect_lines},
};
use tracing::debug;

use crate::{
    algorithms::binarization::adaptive_ink,
    config::{Enhancements, ThresholdMethod},
    error::Result,
    traits::ImagePreprocessor,
    types::RasterImage,
};

/// Apply brightness/contrast, invert, threshold and sharpen to an RGBA raster.
/// Alpha is carried through untouched.
pub fn enhance(raster: &RasterImage, params: &Enhancements) -> Result<RasterImage> {
    raster.validate()?;
    if params.is_identity() {
        return Ok(raster.clone());
    }

    let c = params.contrast.clamp(-100, 100) as f64;
    let cf = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));
    let b = params.brightness.clamp(-100, 100) as f64;
    let threshold = params.threshold.min(100) as f64 / 100.0 * 255.0;

    let mut data = raster.data.clone();
    for px in data.chunks_exact_mut(4) {
        let mut rgb = [px[0] as f64, px[1] as f64, px[2] as f64];
        if params.grayscale {
            let l = (0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]).trunc();
            rgb = [l; 3];
        }
        if params.contrast != 0 || params.brightness != 0 {
            for v in &mut rgb {
                *v = cf * (*v - 128.0) + 128.0 + b;
            }
        }
        if params.invert {
            for v in &mut rgb {
                *v = 255.0 - *v;
            }
        }
        if params.threshold > 0 {
            let l = (rgb[0] + rgb[1] + rgb[2]) / 3.0;
            rgb = [if l >= threshold { 255.0 } else { 0.0 }; 3];
        }
        for (dst, v) in px.iter_mut().zip(rgb) {
            *dst = v.round().clamp(0.0, 255.0) as u8;
        }
    }

    let mut out = RasterImage { width: raster.width, height: raster.height, data };
    if params.sharpen > 0 {
        out = sharpen_blend(&out, params.sharpen);
    }
    Ok(out)
}

/// 3x3 Laplacian sharpen blended with the source by `amount` percent.
/// Border pixels are copied unchanged.
fn sharpen_blend(raster: &RasterImage, amount: u8) -> RasterImage {
    let a = (amount.min(100) as f64) / 100.0;
    let (w, h) = (raster.width as usize, raster.height as usize);
    let src = &raster.data;
    let mut dst = src.clone();
    let at = |x: usize, y: usize, ch: usize| src[(y * w + x) * 4 + ch] as f64;

    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            for ch in 0..3 {
                let centre = at(x, y, ch);
                let v = 5.0 * centre
                    - at(x - 1, y, ch)
                    - at(x + 1, y, ch)
                    - at(x, y - 1, ch)
                    - at(x, y + 1, ch);
                let blended = centre * (1.0 - a) + v * a;
                dst[(y * w + x) * 4 + ch] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    RasterImage { width: raster.width, height: raster.height, data: dst }
}

/// 3x3 median filter for salt-and-pepper scan noise
#[derive(Debug, Clone)]
pub struct MedianDenoisePreprocessor {
    pub radius: u32,
}

impl Default for MedianDenoisePreprocessor {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

impl ImagePreprocessor for MedianDenoisePreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::filter::median_filter(image, self.radius, self.radius))
    }
}

/// Adaptive threshold preprocessor producing black ink on a white page
#[derive(Debug, Clone)]
pub struct AdaptiveCleanPreprocessor {
    pub block_size: u32,
    pub offset: i32,
}

impl Default for AdaptiveCleanPreprocessor {
    fn default() -> Self {
        Self {
            block_size: 15,
            offset: 10,
        }
    }
}

impl ImagePreprocessor for AdaptiveCleanPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let ink = adaptive_ink(image, ThresholdMethod::Gaussian, self.block_size, self.offset);
        Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([if ink.get(x, y) { 0 } else { 255 }])
        }))
    }
}

/// Rotates the page so its dominant near-axis lines become axis-aligned
#[derive(Debug, Clone)]
pub struct DeskewPreprocessor {
    /// Lines further than this from either axis are ignored
    pub max_skew_degrees: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub vote_threshold: u32,
    pub suppression_radius: u32,
}

impl Default for DeskewPreprocessor {
    fn default() -> Self {
        Self {
            max_skew_degrees: 20.0,
            canny_low: 50.0,
            canny_high: 150.0,
            vote_threshold: 100,
            suppression_radius: 8,
        }
    }
}

impl DeskewPreprocessor {
    /// Median clockwise skew of detected near-axis lines, in degrees.
    pub fn estimate_skew(&self, image: &GrayImage) -> Option<f32> {
        let edges = imageproc::edges::canny(image, self.canny_low, self.canny_high);
        let options = LineDetectionOptions {
            vote_threshold: self.vote_threshold,
            suppression_radius: self.suppression_radius,
        };

        let mut skews: Vec<f32> = detect_lines(&edges, options)
            .into_iter()
            .filter_map(|line| {
                // angle_in_degrees is the normal's angle: 90 for a horizontal line.
                let theta = line.angle_in_degrees as f32;
                [theta, theta - 90.0, theta - 180.0]
                    .into_iter()
                    .find(|s| s.abs() <= self.max_skew_degrees)
            })
            .collect();

        if skews.is_empty() {
            return None;
        }
        skews.sort_by(|a, b| a.total_cmp(b));
        Some(skews[skews.len() / 2])
    }
}

impl ImagePreprocessor for DeskewPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        match self.estimate_skew(image) {
            Some(skew) if skew != 0.0 => {
                debug!(skew, "deskewing");
                Ok(rotate_about_center(
                    image,
                    -skew.to_radians(),
                    Interpolation::Bilinear,
                    Luma([255]),
                ))
            }
            _ => Ok(image.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(r: u8, g: u8, b: u8) -> RasterImage {
        let data = [r, g, b, 255].repeat(9);
        RasterImage::new(3, 3, data).expect("3x3 raster")
    }

    #[test]
    fn identity_enhancement_is_a_copy() {
        let raster = solid(10, 20, 30);
        assert_eq!(enhance(&raster, &Enhancements::default()).expect("valid"), raster);
    }

    #[test]
    fn invert_and_grayscale() {
        let params = Enhancements { invert: true, grayscale: true, ..Default::default() };
        let out = enhance(&solid(255, 0, 0), &params).expect("valid");
        // luma of pure red is 54
        assert_eq!(&out.data[..4], &[201, 201, 201, 255]);
    }

    #[test]
    fn threshold_splits_at_percentage() {
        let params = Enhancements { threshold: 50, ..Default::default() };
        assert_eq!(enhance(&solid(100, 100, 100), &params).expect("valid").data[0], 0);
        assert_eq!(enhance(&solid(200, 200, 200), &params).expect("valid").data[0], 255);
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let params = Enhancements { brightness: 50, ..Default::default() };
        assert_eq!(enhance(&solid(100, 230, 0), &params).expect("valid").data[..3], [150, 255, 50]);
    }

    #[test]
    fn sharpen_leaves_flat_regions_alone() {
        let params = Enhancements { sharpen: 100, ..Default::default() };
        let raster = solid(80, 80, 80);
        assert_eq!(enhance(&raster, &params).expect("valid"), raster);
    }

    #[test]
    fn median_removes_isolated_speck() {
        let mut gray = GrayImage::from_pixel(9, 9, Luma([255]));
        gray.put_pixel(4, 4, Luma([0]));
        let out = MedianDenoisePreprocessor::default().preprocess(&gray).expect("ok");
        assert_eq!(out.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn adaptive_clean_is_black_on_white() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([200]));
        for x in 5..35 {
            gray.put_pixel(x, 20, Luma([40]));
        }
        let out = AdaptiveCleanPreprocessor::default().preprocess(&gray).expect("ok");
        assert_eq!(out.get_pixel(20, 20)[0], 0);
        assert_eq!(out.get_pixel(20, 5)[0], 255);
    }

    #[test]
    fn blank_page_is_not_rotated() {
        let gray = GrayImage::from_pixel(50, 50, Luma([255]));
        let deskew = DeskewPreprocessor::default();
        assert_eq!(deskew.estimate_skew(&gray), None);
        assert_eq!(deskew.preprocess(&gray).expect("ok"), gray);
    }
}
