pub mod hog;
pub mod model;

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ClassifierConfig;
use crate::error::{DiceError, Result};
use crate::models::{BoundingBox, DiceProbability};

pub use hog::HogDescriptor;
pub use model::{DiceModel, LinearSvm};

/// Scores regions with HOG features and a pretrained probability model.
///
/// Holds no mutable state; share one instance behind an `Arc` and call it
/// from wherever images are processed.
pub struct DiceClassifier {
    model: Arc<dyn DiceModel>,
    descriptor: HogDescriptor,
    config: ClassifierConfig,
}

impl DiceClassifier {
    pub fn new(model: Arc<dyn DiceModel>, config: ClassifierConfig) -> Result<Self> {
        let descriptor = HogDescriptor::new(config.hog.clone())?;
        if let Some(expected) = model.descriptor_len() {
            if expected != descriptor.descriptor_len() {
                return Err(DiceError::ModelLoad {
                    path: PathBuf::from("<in-memory>"),
                    reason: format!(
                        "model expects {} features but the HOG recipe produces {}",
                        expected,
                        descriptor.descriptor_len()
                    ),
                });
            }
        }
        Ok(Self {
            model,
            descriptor,
            config,
        })
    }

    /// Load a [`LinearSvm`] artifact from disk and build the extractor.
    pub fn load(model_path: impl AsRef<Path>, config: ClassifierConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = LinearSvm::load(model_path)?;
        Self::new(Arc::new(model), config).map_err(|e| match e {
            DiceError::ModelLoad { reason, .. } => DiceError::ModelLoad {
                path: model_path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &HogDescriptor {
        &self.descriptor
    }

    /// Die probability for one region.
    pub fn score_region(&self, image: &DynamicImage, bbox: &BoundingBox) -> Result<DiceProbability> {
        let features = self.descriptor.compute_region(image, bbox)?;
        self.model.predict_proba(&features)
    }

    /// Die probability for a whole image treated as a tight crop.
    pub fn score_image(&self, image: &DynamicImage) -> Result<DiceProbability> {
        let features = self.descriptor.compute(image)?;
        self.model.predict_proba(&features)
    }

    /// Keep the boxes whose die probability exceeds the classify threshold,
    /// in input order.
    ///
    /// A box whose features cannot be computed counts as "not a die"; the
    /// rest of the batch is still classified.
    pub fn classify(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Vec<BoundingBox> {
        self.accept(image, boxes.iter().copied(), self.config.classify_threshold)
    }

    /// Exhaustive non-overlapping scan with windows a quarter of the image on
    /// each axis, at the lax sliding-window threshold.
    pub fn sliding_window(&self, image: &DynamicImage) -> Vec<BoundingBox> {
        let windows = tile_windows(image.width(), image.height());
        self.accept(image, windows, self.config.sliding_window_threshold)
    }

    /// Whether a tight crop shows a die. Feature errors read as `false`.
    pub fn is_die(&self, image: &DynamicImage) -> bool {
        match self.try_is_die(image) {
            Ok(found) => found,
            Err(e) => {
                log::debug!("is_die degraded to false: {e}");
                false
            }
        }
    }

    pub fn try_is_die(&self, image: &DynamicImage) -> Result<bool> {
        Ok(self.score_image(image)?.exceeds(self.config.is_die_threshold))
    }

    fn accept(
        &self,
        image: &DynamicImage,
        boxes: impl IntoIterator<Item = BoundingBox>,
        threshold: f32,
    ) -> Vec<BoundingBox> {
        boxes
            .into_iter()
            .filter(|bbox| match self.score_region(image, bbox) {
                Ok(prob) => prob.exceeds(threshold),
                Err(e) => {
                    log::debug!("skipping region {bbox:?}: {e}");
                    false
                }
            })
            .collect()
    }
}

/// Non-overlapping tiling of a `width` x `height` image with windows of
/// `(width / 4, height / 4)`. Only windows fully inside the image are kept.
pub fn tile_windows(width: u32, height: u32) -> Vec<BoundingBox> {
    let win_w = width / 4;
    let win_h = height / 4;
    if win_w == 0 || win_h == 0 {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut y = 0;
    while y + win_h <= height {
        let mut x = 0;
        while x + win_w <= width {
            windows.push(BoundingBox::new(x, y, win_w, win_h));
            x += win_w;
        }
        y += win_h;
    }
    windows
}
