use anyhow::{Context, Result};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::BoundingBox;

/// Data that flows through the pipeline.
/// Each PipelineData is one image region plus what earlier steps learned about it.
#[derive(Clone)]
pub struct PipelineData {
    /// Working image for this item (full frame, edge map, crop, ...)
    pub image: DynamicImage,

    /// The frame the pipeline started from, shared by every item
    pub original: Arc<DynamicImage>,

    /// Region in the original frame (None means the full frame)
    pub bbox: Option<BoundingBox>,

    pub metadata: HashMap<String, MetadataValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Float(f32),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            bbox: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData for a region of the original image
    pub fn from_region(original: Arc<DynamicImage>, bbox: BoundingBox) -> Self {
        let image = original.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
        Self {
            image,
            original,
            bbox: Some(bbox),
            metadata: HashMap::new(),
        }
    }

    /// Same item with its working image replaced
    pub fn with_image(self, image: DynamicImage) -> Self {
        Self { image, ..self }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key) {
            Some(MetadataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Where intermediate images are written
#[derive(Clone, Debug)]
pub struct DebugConfig {
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name, also used for debug directory names
    fn name(&self) -> &str;
}

/// Composable pipeline builder
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run only the first `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        self.run_steps(input, num_steps, |_, _| {})
    }

    /// Run every step, handing each step's output to `inspect` by step name
    pub fn run_inspect(
        &self,
        input: DynamicImage,
        inspect: impl FnMut(&str, &[PipelineData]),
    ) -> Result<Vec<PipelineData>> {
        self.run_steps(input, self.steps.len(), inspect)
    }

    fn run_steps(
        &self,
        input: DynamicImage,
        num_steps: usize,
        mut inspect: impl FnMut(&str, &[PipelineData]),
    ) -> Result<Vec<PipelineData>> {
        let mut data = vec![PipelineData::from_image(input)];
        self.save_debug(0, "input", &data)?;

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            log::debug!("Running step: {} (processing {} items)", step.name(), data.len());
            data = step
                .process(data, &self.context)
                .with_context(|| format!("step '{}' failed", step.name()))?;
            log::debug!("  → {} items", data.len());

            self.save_debug(step_idx + 1, step.name(), &data)?;
            inspect(step.name(), &data);
        }

        Ok(data)
    }

    fn save_debug(&self, step_idx: usize, step_name: &str, data: &[PipelineData]) -> Result<()> {
        let Some(debug) = &self.context.debug else {
            return Ok(());
        };

        let step_dir = debug.output_dir.join(step_dir_name(step_idx, step_name));
        std::fs::create_dir_all(&step_dir)?;

        for (idx, item) in data.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            item.image
                .save(&output_path)
                .with_context(|| format!("Failed to save debug image {}", output_path.display()))?;
        }

        log::debug!("  Debug: saved {} images to {}", data.len(), step_dir.display());
        Ok(())
    }
}

/// "Edge Detection" at index 3 → "03_edge_detection"
pub fn step_dir_name(step_idx: usize, step_name: &str) -> String {
    format!("{:02}_{}", step_idx, step_name.to_lowercase().replace(' ', "_"))
}

/// Regions carried by pipeline output, in order
pub fn regions(data: &[PipelineData]) -> Vec<BoundingBox> {
    data.iter().filter_map(|item| item.bbox).collect()
}
