//! Reading image batches and writing annotated results and crops.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{BoundingBox, Detections};

pub const CANDIDATE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const DIE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image files under `input`: the file itself, or the images directly inside
/// a directory, sorted by path.
pub fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Outline `bbox` with a border `thickness` pixels wide, growing inwards.
pub fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    for inset in 0..thickness {
        let (Some(w), Some(h)) = (
            bbox.width.checked_sub(2 * inset),
            bbox.height.checked_sub(2 * inset),
        ) else {
            break;
        };
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Copy of `image` with candidates in red and confirmed dice in magenta.
pub fn annotate(image: &DynamicImage, detections: &Detections) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for bbox in &detections.candidates {
        draw_box(&mut canvas, bbox, CANDIDATE_COLOR, 1);
    }
    for bbox in &detections.dice {
        draw_box(&mut canvas, bbox, DIE_COLOR, 2);
    }
    canvas
}

/// `<out_dir>/<stem>_dice.jpg`
pub fn annotated_path(out_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    out_dir.join(format!("{stem}_dice.jpg"))
}

/// Per-image debug directory name built from the whole file name, so
/// `a.jpg` and `a.png` get `a_jpg` and `a_png`.
pub fn debug_dir_name(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().replace('.', "_"))
        .unwrap_or_else(|| "image".to_string())
}

/// Running totals for a batch of images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    /// Processed images with at least one hit
    pub images_with_hits: usize,
    pub hits: usize,
}

impl BatchSummary {
    pub fn record(&mut self, hits: usize) {
        self.processed += 1;
        self.hits += hits;
        if hits > 0 {
            self.images_with_hits += 1;
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// One-line report, e.g. "3 dice found; 2 of 4 images contain at least one".
    pub fn report(&self, noun: &str) -> String {
        let mut line = format!(
            "{} {} found; {} of {} images contain at least one",
            self.hits, noun, self.images_with_hits, self.processed
        );
        if self.skipped > 0 {
            line.push_str(&format!(" ({} skipped)", self.skipped));
        }
        line
    }
}

/// Write every region of `image` under `boxes` to `out_dir` as
/// `<prefix><unix-nanos>_<index>.jpg`; returns the written paths.
pub fn save_crops(
    image: &DynamicImage,
    boxes: &[BoundingBox],
    out_dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let stamp = time::OffsetDateTime::now_utc().unix_timestamp_nanos();

    let mut written = Vec::with_capacity(boxes.len());
    for (idx, bbox) in boxes.iter().enumerate() {
        if !bbox.fits_within(image.width(), image.height()) {
            log::warn!("Not saving crop {bbox:?}: outside the image");
            continue;
        }
        let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height).to_rgb8();
        let path = out_dir.join(format!("{prefix}{stamp}_{idx:02}.jpg"));
        crop.save(&path)?;
        written.push(path);
    }
    Ok(written)
}
