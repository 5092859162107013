use image::imageops::{self, FilterType};
use image::DynamicImage;
use imageproc::hog::{hog, HogOptions};

use crate::config::HogConfig;
use crate::error::{DiceError, Result};
use crate::models::BoundingBox;

/// Fixed-recipe HOG extractor over a square canonical window.
#[derive(Debug, Clone)]
pub struct HogDescriptor {
    config: HogConfig,
}

impl HogDescriptor {
    pub fn new(config: HogConfig) -> Result<Self> {
        let descriptor = Self { config };
        if descriptor.descriptor_len() == 0 {
            return Err(DiceError::FeatureCompute(format!(
                "HOG window {}px does not fit blocks of {} cells of {}px",
                descriptor.config.window_side,
                descriptor.config.block_side,
                descriptor.config.cell_side
            )));
        }
        Ok(descriptor)
    }

    pub fn config(&self) -> &HogConfig {
        &self.config
    }

    fn options(&self) -> HogOptions {
        HogOptions {
            orientations: self.config.orientations,
            signed: self.config.signed,
            cell_side: self.config.cell_side,
            block_side: self.config.block_side,
            block_stride: self.config.block_stride,
        }
    }

    /// Number of values per feature vector; 0 if the recipe is inconsistent.
    pub fn descriptor_len(&self) -> usize {
        let c = &self.config;
        if c.cell_side == 0 || c.block_side == 0 || c.block_stride == 0 {
            return 0;
        }
        let window = c.window_side as usize;
        if window % c.cell_side != 0 {
            return 0;
        }
        let cells = window / c.cell_side;
        if cells < c.block_side || (cells - c.block_side) % c.block_stride != 0 {
            return 0;
        }
        let blocks = (cells - c.block_side) / c.block_stride + 1;
        blocks * blocks * c.block_side * c.block_side * c.orientations
    }

    /// Describe a whole image, resized to the canonical window.
    pub fn compute(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DiceError::FeatureCompute(format!(
                "cannot describe a {}x{} image",
                image.width(),
                image.height()
            )));
        }

        // Extra channels such as alpha are dropped before resizing.
        let rgb = image.to_rgb8();
        let side = self.config.window_side;
        let window = imageops::resize(&rgb, side, side, FilterType::Triangle);
        let gray = DynamicImage::ImageRgb8(window).to_luma8();

        hog(&gray, self.options()).map_err(DiceError::FeatureCompute)
    }

    /// Describe the region of `image` under `bbox`.
    pub fn compute_region(&self, image: &DynamicImage, bbox: &BoundingBox) -> Result<Vec<f32>> {
        if !bbox.fits_within(image.width(), image.height()) {
            return Err(DiceError::FeatureCompute(format!(
                "region {:?} does not fit a {}x{} image",
                bbox,
                image.width(),
                image.height()
            )));
        }
        let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
        self.compute(&crop)
    }
}
