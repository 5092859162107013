use dicefinder::{DiceError, DiceModel, DiceProbability, HogConfig, HogDescriptor, LinearSvm};
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::NamedTempFile;

/// Model that reports the same die probability for every input.
pub struct ConstantModel(pub f32);

impl DiceModel for ConstantModel {
    fn descriptor_len(&self) -> Option<usize> {
        None
    }

    fn predict_proba(&self, _features: &[f32]) -> Result<DiceProbability, DiceError> {
        Ok(DiceProbability::from_die_probability(self.0))
    }
}

/// Model that accepts any region with gradient energy, so textured regions
/// score differently from flat ones.
pub struct TextureModel;

impl DiceModel for TextureModel {
    fn descriptor_len(&self) -> Option<usize> {
        None
    }

    fn predict_proba(&self, features: &[f32]) -> Result<DiceProbability, DiceError> {
        let energy: f32 = features.iter().filter(|v| v.is_finite()).sum();
        Ok(DiceProbability::from_die_probability(if energy > 0.0 { 0.95 } else { 0.05 }))
    }
}

/// White `size` x `size` RGB image.
pub fn blank_image(size: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([255, 255, 255])))
}

/// White `size` x `size` image with a black square of side `side` at (`x`, `y`).
pub fn square_image(size: u32, x: u32, y: u32, side: u32) -> DynamicImage {
    let img = RgbImage::from_fn(size, size, |px, py| {
        if px >= x && px < x + side && py >= y && py < y + side {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    DynamicImage::ImageRgb8(img)
}

/// Several black squares of different sizes on white.
pub fn scattered_squares_image() -> DynamicImage {
    let squares = [(10u32, 10u32, 40u32), (120, 20, 70), (30, 130, 25), (150, 150, 45)];
    let img = RgbImage::from_fn(240, 220, |px, py| {
        let inside = squares
            .iter()
            .any(|&(x, y, s)| px >= x && px < x + s && py >= y && py < y + s);
        if inside { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
    });
    DynamicImage::ImageRgb8(img)
}

/// A linear SVM sized for the default HOG recipe, written to a temp file.
/// All-zero weights give P(die) = 1 / (1 + exp(platt_b)).
pub fn write_linear_model(platt_b: f32) -> anyhow::Result<(LinearSvm, NamedTempFile)> {
    let len = HogDescriptor::new(HogConfig::default())?.descriptor_len();
    let model = LinearSvm::new(vec![0.0; len], 0.0, -1.0, platt_b);
    let file = tempfile::Builder::new().suffix(".json").tempfile()?;
    model.save(file.path())?;
    Ok((model, file))
}

/// Assert two boxes agree within `tol` pixels on every field.
pub fn assert_box_near(actual: &dicefinder::BoundingBox, expected: (u32, u32, u32, u32), tol: u32) {
    let (x, y, w, h) = expected;
    let close = actual.x.abs_diff(x) <= tol
        && actual.y.abs_diff(y) <= tol
        && actual.width.abs_diff(w) <= tol
        && actual.height.abs_diff(h) <= tol;
    assert!(close, "box {actual:?} not within {tol}px of {expected:?}");
}
