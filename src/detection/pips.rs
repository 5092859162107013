//! Counting the pips on a die face crop.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::BTreeMap;

use crate::config::PipConfig;
use crate::detection::ensure_not_empty;
use crate::error::Result;

/// Number of pips on a tight die crop.
///
/// The crop is split at its Otsu level; the minority class holds the pips.
/// Blobs smaller than `min_pip_area`, larger than `max_pip_fraction` of the
/// crop, or touching the crop border are not pips.
pub fn count_pips(crop: &DynamicImage, config: &PipConfig) -> Result<usize> {
    ensure_not_empty(crop)?;

    let mask = pip_mask(&crop.to_luma8());
    let (w, h) = mask.dimensions();
    let max_area = (config.max_pip_fraction * (w as f32) * (h as f32)) as u32;

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0]));
    let mut blobs: BTreeMap<u32, (u32, bool)> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] == 0 {
            continue;
        }
        let on_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
        let entry = blobs.entry(label[0]).or_insert((0, false));
        entry.0 += 1;
        entry.1 |= on_border;
    }

    let pips = blobs
        .values()
        .filter(|&&(area, on_border)| !on_border && area >= config.min_pip_area && area <= max_area)
        .count();
    log::debug!("Counted {} pips among {} blobs", pips, blobs.len());
    Ok(pips)
}

/// Foreground (255) where a pixel belongs to the minority side of the Otsu split
fn pip_mask(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let dark = gray.pixels().filter(|p| p[0] <= level).count();
    let pips_are_dark = dark * 2 < gray.pixels().len();

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let is_dark = gray.get_pixel(x, y)[0] <= level;
        if is_dark == pips_are_dark {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
