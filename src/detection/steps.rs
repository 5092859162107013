use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;

use crate::classifier::DiceClassifier;
use crate::detection::{contours, ensure_not_empty, preprocessing};
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};

/// CLAHE on the lightness channel
pub struct LightingStep {
    pub tiles: u32,
    pub clip_limit: f32,
}

impl PipelineStep for LightingStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        data.into_iter()
            .map(|item| -> Result<PipelineData> {
                ensure_not_empty(&item.image)?;
                let equalized = preprocessing::equalize_lighting(&item.image, self.tiles, self.clip_limit);
                Ok(item.with_image(DynamicImage::ImageRgb8(equalized)))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "Lighting Equalization"
    }
}

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Apply Gaussian blur
pub struct BlurStep {
    pub sigma: f32,
}

impl PipelineStep for BlurStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let blurred = preprocessing::apply_blur(&item.image.to_luma8(), self.sigma);
                item.with_image(DynamicImage::ImageLuma8(blurred))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Detect edges using Canny, then close small gaps
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub closing_radius: u8,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| {
                let edges = preprocessing::detect_edges(
                    &item.image.to_luma8(),
                    self.low_threshold,
                    self.high_threshold,
                );
                let closed = preprocessing::close_edges(&edges, self.closing_radius);
                item.with_image(DynamicImage::ImageLuma8(closed))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

pub const REGION_PROPOSAL_STEP: &str = "Region Proposal";

/// Turn an edge map into one item per candidate region - splits one image into many
pub struct RegionProposalStep {
    pub min_area: u64,
    pub square_tolerance: Option<u32>,
}

impl PipelineStep for RegionProposalStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            ensure_not_empty(&item.image)?;
            let edges = item.image.to_luma8();
            let boxes = contours::filter_boxes(
                contours::find_contours(&edges).iter().map(|c| c.bounding_box()),
                self.min_area,
                self.square_tolerance,
            );

            // Each region becomes its own PipelineData, cropped from the original
            for bbox in boxes {
                let region = PipelineData::from_region(item.original.clone(), bbox)
                    .with_metadata("area", MetadataValue::Int(bbox.area() as i64));
                result.push(region);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        REGION_PROPOSAL_STEP
    }
}

/// Keep regions the classifier scores above `threshold`
pub struct DiceClassificationStep {
    pub classifier: Arc<DiceClassifier>,
    pub threshold: f32,
}

impl DiceClassificationStep {
    /// Step using the classifier's own `classify` threshold
    pub fn new(classifier: Arc<DiceClassifier>) -> Self {
        let threshold = classifier.config().classify_threshold;
        Self { classifier, threshold }
    }
}

impl PipelineStep for DiceClassificationStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let scored = match &item.bbox {
                Some(bbox) => self.classifier.score_region(&item.original, bbox),
                None => self.classifier.score_image(&item.image),
            };

            match scored {
                Ok(prob) if prob.exceeds(self.threshold) => {
                    result.push(
                        item.with_metadata("is_die", MetadataValue::Bool(true))
                            .with_metadata("die_probability", MetadataValue::Float(prob.die_probability)),
                    );
                }
                Ok(_) => {}
                Err(e) => log::debug!("Dropping region {:?}: {}", item.bbox, e),
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Dice Classification"
    }
}
