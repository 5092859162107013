#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from dicefinder for tests
pub use dicefinder::{
    BoundingBox, ClassifierConfig, Detections, DetectorConfig, DiceClassifier, DiceDetector,
    DiceError, ProposalConfig, RegionProposer,
};
