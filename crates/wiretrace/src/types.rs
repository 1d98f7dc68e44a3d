use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{Result, WireError};

/// Integer pixel coordinate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema, TS,
)]
#[ts(export)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_f64(self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Caller-owned RGBA raster (4 bytes per pixel). Alpha is ignored by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an RGBA buffer, rejecting empty or size-mismatched input.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let image = Self { width, height, data };
        image.validate()?;
        Ok(image)
    }

    pub fn validate(&self) -> Result<()> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(4));
        if self.width == 0 || self.height == 0 || expected != Some(self.data.len()) {
            return Err(WireError::InvalidImage {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height, data: image.into_raw() }
    }

    /// Expand a grayscale image into an opaque RGBA raster.
    pub fn from_gray(image: &GrayImage) -> Self {
        Self::from_rgba(DynamicImage::ImageLuma8(image.clone()).to_rgba8())
    }

    /// Load any format supported by the `image` crate from disk.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::from_rgba(image::open(path)?.to_rgba8()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_rgba(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// Luma view of the raster used by every downstream stage.
    pub fn to_gray(&self) -> Result<GrayImage> {
        self.validate()?;
        let rgba = RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            WireError::InvalidImage {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            },
        )?;
        Ok(DynamicImage::ImageRgba8(rgba).to_luma8())
    }
}

/// One byte per pixel, `1` for ink and `0` for background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(WireError::InvalidImage { width, height, len: data.len() });
        }
        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self { width, height, data })
    }

    /// Any non-zero pixel becomes ink.
    pub fn from_gray(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| u8::from(v != 0)).collect();
        Self { width, height, data }
    }

    /// Ink as 255, background as 0.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let i = self.index(x, y);
        self.data[i] = u8::from(on);
    }

    /// Bounds-checked lookup with signed coordinates; outside pixels are background.
    #[inline]
    pub fn is_on(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < self.width
            && (y as u32) < self.height
            && self.get(x as u32, y as u32)
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Pixelwise `self AND NOT other`.
    pub fn subtract(&self, other: &BinaryMask) -> BinaryMask {
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| u8::from(a != 0 && b == 0))
            .collect();
        BinaryMask { width: self.width, height: self.height, data }
    }

    /// Pixelwise OR.
    pub fn union(&self, other: &BinaryMask) -> BinaryMask {
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| u8::from(a != 0 || b != 0))
            .collect();
        BinaryMask { width: self.width, height: self.height, data }
    }
}
