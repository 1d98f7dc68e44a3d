//! Processing parameters. Everything in [`ExtractionConfig`] can change the
//! extracted graph and therefore participates in the graph cache key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use ts_rs::TS;

/// Local-mean flavour used by the adaptive threshold.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThresholdMethod {
    /// Box-filtered neighbourhood mean
    Mean,
    /// Gaussian-weighted neighbourhood mean
    #[default]
    Gaussian,
}

/// Cleanup step run on the grayscale page before binarization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema, TS, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export)]
pub enum Preprocess {
    /// 3x3 median filter against scan speckle
    Denoise,
    /// Local Gaussian threshold to pure black ink on white
    AdaptiveClean,
    /// Rotate so dominant near-axis lines become axis-aligned
    Deskew,
}

impl Preprocess {
    /// Denoise followed by the adaptive clean.
    pub const AUTO_CLEAN: [Preprocess; 2] = [Preprocess::Denoise, Preprocess::AdaptiveClean];
}

/// Raster enhancements applied before binarization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Enhancements {
    /// Additive brightness, -100..=100
    pub brightness: i32,
    /// Contrast stretch, -100..=100
    pub contrast: i32,
    /// Hard threshold in percent of full scale, 0 disables
    #[schemars(range(min = 0, max = 100))]
    pub threshold: u8,
    /// Sharpen blend in percent, 0 disables
    #[schemars(range(min = 0, max = 100))]
    pub sharpen: u8,
    pub invert: bool,
    pub grayscale: bool,
}

impl Enhancements {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BinarizeParams {
    pub method: ThresholdMethod,
    /// Odd neighbourhood size of the adaptive threshold
    #[schemars(range(min = 3, max = 101))]
    pub block_size: u32,
    /// Pixels must be this much darker than their neighbourhood to count as ink
    pub offset: i32,
    /// Width of the horizontal opening kernel
    pub horizontal_kernel: u32,
    /// Height of the vertical opening kernel
    pub vertical_kernel: u32,
    /// Closing radius that bridges broken strokes, 0 disables
    #[schemars(range(min = 0, max = 10))]
    pub bridge_radius: u8,
    /// Subtract text-like blobs before stroke emphasis
    pub ignore_text: bool,
    /// Black-hat kernel size for the text mask
    pub text_kernel: u32,
    /// Blobs shorter than this are strokes, not glyphs
    pub text_min_height: u32,
    pub text_max_height: u32,
    pub text_max_width: u32,
}

impl Default for BinarizeParams {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::Gaussian,
            block_size: 21,
            offset: 15,
            horizontal_kernel: 5,
            vertical_kernel: 5,
            bridge_radius: 1,
            ignore_text: false,
            text_kernel: 15,
            text_min_height: 4,
            text_max_height: 32,
            text_max_width: 48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GraphParams {
    /// Radius of the disk sampled around junctions for dot detection
    pub dot_radius: i32,
    /// Dark fraction of that disk above which a junction is a dot
    #[schemars(range(min = 0.0, max = 1.0))]
    pub dot_fill: f64,
    /// Gray levels below this count as dark
    pub dark_level: u8,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            dot_radius: 4,
            dot_fill: 0.55,
            dark_level: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TraceParams {
    /// Clicks farther than this from every edge find nothing
    pub snap_radius: f64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self { snap_radius: 12.0 }
    }
}

/// Complete parameter set for building a wire graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Grayscale cleanup steps, applied in order
    pub preprocess: Vec<Preprocess>,
    pub enhance: Enhancements,
    pub binarize: BinarizeParams,
    pub graph: GraphParams,
    pub trace: TraceParams,
}

impl ExtractionConfig {
    /// Fold per-request build overrides into a copy of this config.
    pub fn with_build_options(&self, options: &BuildOptions) -> Self {
        let mut config = self.clone();
        if let Some(radius) = options.bridge_radius {
            config.binarize.bridge_radius = radius;
        }
        if let Some(ignore) = options.ignore_text {
            config.binarize.ignore_text = ignore;
        }
        if let Some(steps) = &options.preprocess {
            config.preprocess = steps.clone();
        }
        config
    }
}

/// Per-request overrides accepted by `buildGraph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(default)]
#[ts(export)]
pub struct BuildOptions {
    pub bridge_radius: Option<u8>,
    pub ignore_text: Option<bool>,
    /// Replaces the configured cleanup steps when given
    pub preprocess: Option<Vec<Preprocess>>,
    /// Identity of the canvas the pixels came from; only used for cache keying
    pub canvas: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(default)]
#[ts(export)]
pub struct TraceOptions {
    /// Stop at the first node instead of running through pass-through nodes
    pub stop_at: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[serde(default)]
#[ts(export)]
pub struct VectorOptions {
    /// Douglas-Peucker tolerance in pixels
    #[schemars(range(min = 0.0, max = 50.0))]
    pub simplify: f64,
    /// Flatten near-straight edges onto their dominant axis
    pub snap: bool,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for VectorOptions {
    fn default() -> Self {
        Self {
            simplify: 1.0,
            snap: true,
            stroke: "#000000".to_string(),
            stroke_width: 2.0,
        }
    }
}
