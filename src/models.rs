use serde::{Deserialize, Serialize};

/// Upright rectangle in image pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Box spanning the inclusive pixel range `min..=max` on both axes.
    pub fn from_extent(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the box is non-empty and lies entirely inside a
    /// `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty() && self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Dice faces are roughly square: width and height differ by less than
    /// `tolerance` pixels.
    pub fn is_near_square(&self, tolerance: u32) -> bool {
        self.width.abs_diff(self.height) < tolerance
    }
}

/// Class probabilities reported by a dice model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiceProbability {
    pub not_die_probability: f32,
    pub die_probability: f32,
}

impl DiceProbability {
    /// Two-class distribution from the probability of the "die" class.
    pub fn from_die_probability(die_probability: f32) -> Self {
        let die_probability = die_probability.clamp(0.0, 1.0);
        Self {
            not_die_probability: 1.0 - die_probability,
            die_probability,
        }
    }

    /// Strictly above `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.die_probability > threshold
    }
}

/// Result of running both stages on one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detections {
    /// Every region the proposer produced.
    pub candidates: Vec<BoundingBox>,
    /// The subset of `candidates` the classifier accepted, in the same order.
    pub dice: Vec<BoundingBox>,
}
