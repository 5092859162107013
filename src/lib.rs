pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;

pub use classifier::{DiceClassifier, DiceModel, HogDescriptor, LinearSvm};
pub use config::{ClassifierConfig, DetectorConfig, HogConfig, PipConfig, ProposalConfig};
pub use detection::pips::count_pips;
pub use detection::template::{find_template, TemplateMatch, TemplateMethod};
pub use detection::{build_standard_pipeline, DiceDetector, RegionProposer};
pub use error::DiceError;
pub use models::{BoundingBox, Detections, DiceProbability};
pub use pipeline::{MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};
