use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

use crate::detection::clahe::equalize_lightness;

/// Normalise lighting with CLAHE on the lightness channel
pub fn equalize_lighting(img: &DynamicImage, tiles: u32, clip_limit: f32) -> RgbImage {
    equalize_lightness(&img.to_rgb8(), tiles, clip_limit)
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise; a non-positive sigma leaves the image as is
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(img, sigma)
    } else {
        img.clone()
    }
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Bridge small breaks in edge outlines
pub fn close_edges(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    close(edges, Norm::LInf, radius)
}
