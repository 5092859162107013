pub mod clahe;
pub mod contours;
pub mod pips;
pub mod preprocessing;
pub mod steps;
pub mod template;

use image::{DynamicImage, GrayImage};
use std::sync::Arc;

use crate::classifier::DiceClassifier;
use crate::config::{DetectorConfig, ProposalConfig};
use crate::error::{DiceError, Result};
use crate::models::{BoundingBox, Detections};
use crate::pipeline::Pipeline;

/// Reject images with no pixels.
pub fn ensure_not_empty(img: &DynamicImage) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(DiceError::InvalidInput(format!(
            "image has zero dimensions ({}x{})",
            img.width(),
            img.height()
        )));
    }
    Ok(())
}

/// Finds candidate die regions from edges and contours.
#[derive(Debug, Clone, Default)]
pub struct RegionProposer {
    config: ProposalConfig,
}

impl RegionProposer {
    pub fn new(config: ProposalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProposalConfig {
        &self.config
    }

    /// Lighting equalisation, grayscale, blur, Canny and closing.
    pub fn edge_map(&self, img: &DynamicImage) -> Result<GrayImage> {
        ensure_not_empty(img)?;
        let c = &self.config;

        let equalized = preprocessing::equalize_lighting(img, c.clahe_tiles, c.clahe_clip_limit);
        let gray = preprocessing::to_grayscale(&DynamicImage::ImageRgb8(equalized));
        let blurred = preprocessing::apply_blur(&gray, c.blur_sigma);
        let edges = preprocessing::detect_edges(&blurred, c.canny_low, c.canny_high);
        Ok(preprocessing::close_edges(&edges, c.edge_closing_radius))
    }

    /// Candidate boxes in contour-discovery order. Every box is non-empty and
    /// inside the image.
    pub fn propose(&self, img: &DynamicImage) -> Result<Vec<BoundingBox>> {
        let edges = self.edge_map(img)?;
        let all_contours = contours::find_contours(&edges);
        let boxes = contours::filter_boxes(
            all_contours.iter().map(|c| c.bounding_box()),
            self.config.min_area,
            self.config.square_tolerance,
        );

        log::debug!(
            "Proposed {} regions from {} contours",
            boxes.len(),
            all_contours.len()
        );
        Ok(boxes)
    }
}

/// Region proposal followed by classification, one image at a time.
pub struct DiceDetector {
    proposer: RegionProposer,
    classifier: Arc<DiceClassifier>,
}

impl DiceDetector {
    pub fn new(proposer: RegionProposer, classifier: Arc<DiceClassifier>) -> Self {
        Self { proposer, classifier }
    }

    pub fn from_config(config: &DetectorConfig, classifier: Arc<DiceClassifier>) -> Self {
        Self::new(RegionProposer::new(config.proposal.clone()), classifier)
    }

    pub fn proposer(&self) -> &RegionProposer {
        &self.proposer
    }

    pub fn classifier(&self) -> &Arc<DiceClassifier> {
        &self.classifier
    }

    pub fn detect(&self, img: &DynamicImage) -> Result<Detections> {
        let candidates = self.proposer.propose(img)?;
        let dice = self.classifier.classify(img, &candidates);
        log::debug!("Confirmed {} of {} candidates", dice.len(), candidates.len());
        Ok(Detections { candidates, dice })
    }
}

/// Build the standard detection pipeline using the composable pipeline system.
/// Without a classifier the pipeline stops after region proposal.
pub fn build_standard_pipeline(
    config: &DetectorConfig,
    classifier: Option<Arc<DiceClassifier>>,
) -> Pipeline {
    use crate::detection::steps::*;

    let p = &config.proposal;
    let pipeline = Pipeline::new()
        .add_step(Arc::new(LightingStep {
            tiles: p.clahe_tiles,
            clip_limit: p.clahe_clip_limit,
        }))
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(BlurStep { sigma: p.blur_sigma }))
        .add_step(Arc::new(EdgeDetectionStep {
            low_threshold: p.canny_low,
            high_threshold: p.canny_high,
            closing_radius: p.edge_closing_radius,
        }))
        .add_step(Arc::new(RegionProposalStep {
            min_area: p.min_area,
            square_tolerance: p.square_tolerance,
        }));

    match classifier {
        Some(classifier) => pipeline.add_step(Arc::new(DiceClassificationStep::new(classifier))),
        None => pipeline,
    }
}
