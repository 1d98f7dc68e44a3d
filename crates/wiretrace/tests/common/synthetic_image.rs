use image::{GrayImage, Luma};
use wiretrace::RasterImage;

/// White page of the given size.
pub fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

/// Paint the inclusive rectangle black.
pub fn ink(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, Luma([0]));
        }
    }
}

/// 80px long, 3px thick horizontal line centred on y=50 of a 100x100 page.
pub fn horizontal_line() -> GrayImage {
    let mut img = blank(100, 100);
    ink(&mut img, 10, 49, 89, 51);
    img
}

/// Two 1px lines crossing at (50, 50).
pub fn plus_crossing() -> GrayImage {
    let mut img = blank(100, 100);
    ink(&mut img, 15, 50, 85, 50);
    ink(&mut img, 50, 15, 50, 85);
    img
}

/// The same crossing drawn 3px thick, so the overlap reads as a filled blob.
pub fn thick_plus_crossing() -> GrayImage {
    let mut img = blank(100, 100);
    ink(&mut img, 15, 49, 85, 51);
    ink(&mut img, 49, 15, 51, 85);
    img
}

pub fn raster(img: &GrayImage) -> RasterImage {
    RasterImage::from_gray(img)
}
