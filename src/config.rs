use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DiceError, Result};

/// Tunables for the region proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// CLAHE clip limit, relative to a flat histogram.
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (tiles per axis).
    pub clahe_tiles: u32,
    /// Gaussian sigma before edge detection; `<= 0` disables smoothing.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// L-infinity radius of the closing applied to the edge map; 0 disables it.
    pub edge_closing_radius: u8,
    /// Smallest accepted `width * height`.
    pub min_area: u64,
    /// When set, only keep boxes with `|width - height| < tolerance`.
    pub square_tolerance: Option<u32>,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 3.0,
            clahe_tiles: 8,
            blur_sigma: 1.1,
            canny_low: 100.0,
            canny_high: 200.0,
            edge_closing_radius: 1,
            min_area: 400,
            square_tolerance: None,
        }
    }
}

/// HOG descriptor recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HogConfig {
    /// Side of the square window every crop is resized to.
    pub window_side: u32,
    pub cell_side: usize,
    /// Block side, in cells.
    pub block_side: usize,
    /// Block stride, in cells.
    pub block_stride: usize,
    pub orientations: usize,
    pub signed: bool,
}

impl Default for HogConfig {
    fn default() -> Self {
        Self {
            window_side: 144,
            cell_side: 8,
            block_side: 2,
            block_stride: 1,
            orientations: 9,
            signed: false,
        }
    }
}

/// Acceptance thresholds and descriptor settings for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub hog: HogConfig,
    /// Die probability a proposed region must exceed in `classify`.
    pub classify_threshold: f32,
    /// Laxer threshold for the exhaustive tile scan.
    pub sliding_window_threshold: f32,
    /// Threshold for whole-image checks of tight crops.
    pub is_die_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            hog: HogConfig::default(),
            classify_threshold: 0.8,
            sliding_window_threshold: 0.1,
            is_die_threshold: 0.3,
        }
    }
}

/// Blob limits for pip counting on die crops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipConfig {
    /// Smallest blob, in pixels, that counts as a pip.
    pub min_pip_area: u32,
    /// Largest blob as a fraction of the crop area.
    pub max_pip_fraction: f32,
}

impl Default for PipConfig {
    fn default() -> Self {
        Self {
            min_pip_area: 4,
            max_pip_fraction: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub proposal: ProposalConfig,
    pub classifier: ClassifierConfig,
    pub pips: PipConfig,
}

impl DetectorConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DiceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| DiceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| DiceError::Config {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
