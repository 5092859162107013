//! Locating a reference die crop inside a larger image.

use image::DynamicImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use serde::{Deserialize, Serialize};

use crate::detection::ensure_not_empty;
use crate::error::{DiceError, Result};
use crate::models::BoundingBox;

/// Score used to compare the template against each image window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemplateMethod {
    SumOfSquaredErrors,
    #[default]
    SumOfSquaredErrorsNormalized,
    CrossCorrelation,
    CrossCorrelationNormalized,
}

impl TemplateMethod {
    /// Squared-error scores are best when lowest, correlations when highest.
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            TemplateMethod::SumOfSquaredErrors | TemplateMethod::SumOfSquaredErrorsNormalized
        )
    }

    fn imageproc_method(self) -> MatchTemplateMethod {
        match self {
            TemplateMethod::SumOfSquaredErrors => MatchTemplateMethod::SumOfSquaredErrors,
            TemplateMethod::SumOfSquaredErrorsNormalized => {
                MatchTemplateMethod::SumOfSquaredErrorsNormalized
            }
            TemplateMethod::CrossCorrelation => MatchTemplateMethod::CrossCorrelation,
            TemplateMethod::CrossCorrelationNormalized => {
                MatchTemplateMethod::CrossCorrelationNormalized
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Template-sized box at the best-scoring position.
    pub bbox: BoundingBox,
    pub score: f32,
}

/// Best placement of `template` in `image`, both compared in grayscale.
pub fn find_template(
    image: &DynamicImage,
    template: &DynamicImage,
    method: TemplateMethod,
) -> Result<TemplateMatch> {
    ensure_not_empty(image)?;
    ensure_not_empty(template)?;
    if template.width() > image.width() || template.height() > image.height() {
        return Err(DiceError::InvalidInput(format!(
            "template {}x{} is larger than the image {}x{}",
            template.width(),
            template.height(),
            image.width(),
            image.height()
        )));
    }

    let scores = match_template(&image.to_luma8(), &template.to_luma8(), method.imageproc_method());
    let extremes = find_extremes(&scores);

    let ((x, y), score) = if method.lower_is_better() {
        (extremes.min_value_location, extremes.min_value)
    } else {
        (extremes.max_value_location, extremes.max_value)
    };

    log::debug!("Best {method:?} match at ({x}, {y}), score {score}");
    Ok(TemplateMatch {
        bbox: BoundingBox::new(x, y, template.width(), template.height()),
        score,
    })
}
