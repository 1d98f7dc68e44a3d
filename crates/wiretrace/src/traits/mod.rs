use image::GrayImage;

use crate::{
    error::Result,
    graph::Graph,
    types::{BinaryMask, Point},
};

/// Trait for grayscale cleanup stages run before binarization
pub trait ImagePreprocessor: Send + Sync {
    /// Produce a cleaned copy of the input (denoise, deskew, ...)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for turning a grayscale page into a wire-ink mask
pub trait Binarizer: Send + Sync {
    /// Ink pixels are `1`; fails on zero-sized input
    fn binarize(&self, image: &GrayImage) -> Result<BinaryMask>;
}

/// Trait for reducing ink to one-pixel-wide centrelines
pub trait Skeletonizer: Send + Sync {
    /// Consume a mask and return its skeleton
    fn thin(&self, mask: BinaryMask) -> BinaryMask;
}

/// Trait for extracting node/edge topology from a skeleton
pub trait GraphBuilder: Send + Sync {
    /// `reference` is the grayscale page used to classify nodes; without it
    /// every node keeps the unclassified kind
    fn build(&self, skeleton: &BinaryMask, reference: Option<&GrayImage>) -> Graph;
}

/// Trait for polyline simplification algorithms
pub trait PolylineSimplifier: Send + Sync {
    /// Reduce point count while staying within `tolerance` pixels of the input
    fn simplify(&self, points: &[Point], tolerance: f64) -> Vec<Point>;
}
