use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::{
    algorithms::morphology::{black_hat, close_square, open_rect},
    config::{BinarizeParams, ThresholdMethod},
    error::{Result, WireError},
    traits::Binarizer,
    types::BinaryMask,
};

/// Adaptive threshold followed by text suppression, axis emphasis and gap bridging.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveBinarizer {
    pub params: BinarizeParams,
}

impl AdaptiveBinarizer {
    pub fn new(params: BinarizeParams) -> Self {
        Self { params }
    }
}

impl Binarizer for AdaptiveBinarizer {
    fn binarize(&self, image: &GrayImage) -> Result<BinaryMask> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(WireError::InvalidImage { width, height, len: 0 });
        }
        let p = &self.params;

        let mut ink = adaptive_ink(image, p.method, p.block_size, p.offset);
        if p.ignore_text {
            let text = text_mask(image, p);
            debug!(text_pixels = text.count(), "suppressing text");
            ink = ink.subtract(&text);
        }
        let wires = emphasize_axes(&ink, p.horizontal_kernel, p.vertical_kernel);
        let bridged = close_square(&wires, p.bridge_radius);

        debug!(
            ink = ink.count(),
            wires = wires.count(),
            bridged = bridged.count(),
            "binarized"
        );
        Ok(bridged)
    }
}

/// Sigma OpenCV derives for a Gaussian kernel of the given size.
fn gaussian_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Ink where a pixel is at least `offset` darker than its local mean.
pub fn adaptive_ink(
    gray: &GrayImage,
    method: ThresholdMethod,
    block_size: u32,
    offset: i32,
) -> BinaryMask {
    let block_size = block_size.max(3) | 1;
    let mean = match method {
        ThresholdMethod::Gaussian => {
            imageproc::filter::gaussian_blur_f32(gray, gaussian_sigma(block_size))
        }
        ThresholdMethod::Mean => {
            let r = block_size / 2;
            imageproc::filter::box_filter(gray, r, r)
        }
    };
    let data = gray
        .as_raw()
        .iter()
        .zip(mean.as_raw())
        .map(|(&v, &m)| u8::from(v as i32 <= m as i32 - offset))
        .collect();
    BinaryMask::from_vec(gray.width(), gray.height(), data)
        .unwrap_or_else(|_| BinaryMask::new(gray.width(), gray.height()))
}

/// Text-sized dark blobs found by black-hat, Otsu and a component size filter.
pub fn text_mask(gray: &GrayImage, params: &BinarizeParams) -> BinaryMask {
    let (width, height) = gray.dimensions();
    let hat = black_hat(gray, params.text_kernel);
    let level = imageproc::contrast::otsu_level(&hat);
    let candidates = imageproc::contrast::threshold(&hat, level);
    let labels = connected_components(&candidates, Connectivity::Eight, Luma([0u8]));

    // label -> (min_x, min_y, max_x, max_y)
    let mut boxes: Vec<Option<(u32, u32, u32, u32)>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if boxes.len() <= label {
            boxes.resize(label + 1, None);
        }
        boxes[label] = Some(match boxes[label] {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    let keep: Vec<bool> = boxes
        .iter()
        .map(|b| {
            b.is_some_and(|(x0, y0, x1, y1)| {
                let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
                h >= params.text_min_height && h <= params.text_max_height && w <= params.text_max_width
            })
        })
        .collect();

    let mut mask = BinaryMask::new(width, height);
    for (x, y, label) in labels.enumerate_pixels() {
        if keep.get(label[0] as usize).copied().unwrap_or(false) {
            mask.set(x, y, true);
        }
    }
    mask
}

/// Union of a wide-short and a tall-narrow opening; keeps axis-aligned runs.
pub fn emphasize_axes(ink: &BinaryMask, horizontal: u32, vertical: u32) -> BinaryMask {
    open_rect(ink, horizontal, 1).union(&open_rect(ink, 1, vertical))
}
