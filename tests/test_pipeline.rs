//! Integration tests for the detector and the composable step pipeline.
//!
//! Tests cover:
//! - End-to-end detection on synthetic images
//! - The standard pipeline agreeing with the direct proposer
//! - Partial runs and debug output directories

mod common;

use dicefinder::detection::build_standard_pipeline;
use dicefinder::detection::steps::REGION_PROPOSAL_STEP;
use dicefinder::pipeline::{regions, step_dir_name};
use dicefinder::{MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};
use image::DynamicImage;
use std::sync::Arc;

use common::*;

fn accepting_classifier(prob: f32) -> anyhow::Result<Arc<DiceClassifier>> {
    Ok(Arc::new(DiceClassifier::new(
        Arc::new(ConstantModel(prob)),
        ClassifierConfig::default(),
    )?))
}

#[test]
fn test_detector_end_to_end() -> anyhow::Result<()> {
    let detector = DiceDetector::from_config(&DetectorConfig::default(), accepting_classifier(0.95)?);

    let detections = detector.detect(&square_image(200, 70, 70, 60))?;
    assert_eq!(detections.candidates.len(), 1);
    assert_eq!(detections.dice, detections.candidates);
    assert_box_near(&detections.dice[0], (70, 70, 60, 60), 3);

    let blank = detector.detect(&blank_image(100))?;
    assert_eq!(blank, Detections::default());
    Ok(())
}

#[test]
fn test_detector_rejects_with_unconfident_model() -> anyhow::Result<()> {
    let detector = DiceDetector::from_config(&DetectorConfig::default(), accepting_classifier(0.2)?);
    let detections = detector.detect(&square_image(200, 70, 70, 60))?;
    assert_eq!(detections.candidates.len(), 1);
    assert!(detections.dice.is_empty());
    Ok(())
}

#[test]
fn test_detector_propagates_invalid_input() -> anyhow::Result<()> {
    let detector = DiceDetector::from_config(&DetectorConfig::default(), accepting_classifier(0.95)?);
    let result = detector.detect(&DynamicImage::new_rgb8(0, 0));
    assert!(matches!(result, Err(DiceError::InvalidInput(_))));
    Ok(())
}

#[test]
fn test_standard_pipeline_matches_proposer() -> anyhow::Result<()> {
    let config = DetectorConfig::default();
    let img = scattered_squares_image();

    let direct = RegionProposer::new(config.proposal.clone()).propose(&img)?;
    let via_pipeline = build_standard_pipeline(&config, None).run(img)?;

    assert_eq!(regions(&via_pipeline), direct);
    for item in &via_pipeline {
        let bbox = item.bbox.expect("region items carry a box");
        assert_eq!(item.get_int("area"), Some(bbox.area() as i64));
        assert_eq!((item.image.width(), item.image.height()), (bbox.width, bbox.height));
    }
    Ok(())
}

#[test]
fn test_standard_pipeline_classifies() -> anyhow::Result<()> {
    let pipeline = build_standard_pipeline(&DetectorConfig::default(), Some(accepting_classifier(0.95)?));
    assert_eq!(pipeline.step_names().last(), Some(&"Dice Classification"));

    let result = pipeline.run(square_image(200, 70, 70, 60))?;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get_bool("is_die"), Some(true));
    let prob = result[0].get_float("die_probability").expect("probability recorded");
    assert!((prob - 0.95).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_pipeline_rejects_empty_image() {
    let pipeline = build_standard_pipeline(&DetectorConfig::default(), None);
    assert!(pipeline.run(DynamicImage::new_rgb8(0, 0)).is_err());
}

#[test]
fn test_run_partial_stops_after_edges() -> anyhow::Result<()> {
    let pipeline = build_standard_pipeline(&DetectorConfig::default(), None);
    let result = pipeline.run_partial(square_image(200, 70, 70, 60), 4)?;

    assert_eq!(result.len(), 1);
    let edges = result[0].image.as_luma8().expect("edge map is grayscale");
    assert_eq!(edges.dimensions(), (200, 200));
    assert!(edges.pixels().any(|p| p[0] > 0));
    assert!(result[0].bbox.is_none());
    Ok(())
}

#[test]
fn test_debug_output_directories() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");

    let pipeline = build_standard_pipeline(&DetectorConfig::default(), Some(accepting_classifier(0.95)?))
        .with_debug(debug_dir.clone())?;
    pipeline.run(square_image(200, 70, 70, 60))?;

    let expected = [
        "00_input",
        "01_lighting_equalization",
        "02_grayscale_conversion",
        "03_gaussian_blur",
        "04_edge_detection",
        "05_region_proposal",
        "06_dice_classification",
    ];
    for name in expected {
        let step_dir = debug_dir.join(name);
        assert!(step_dir.is_dir(), "missing {}", step_dir.display());
        assert!(step_dir.join("01.png").is_file(), "missing image in {name}");
    }
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = Pipeline::new().with_debug(dir.path().to_path_buf());
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_step_dir_name() {
    assert_eq!(step_dir_name(3, "Edge Detection"), "03_edge_detection");
    assert_eq!(step_dir_name(0, "input"), "00_input");
}

/// Splits every item into two copies tagged with their index
struct DuplicateStep;

impl PipelineStep for DuplicateStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> anyhow::Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .flat_map(|item| {
                (0..2).map(move |i| item.clone().with_metadata("copy", MetadataValue::Int(i)))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Duplicate"
    }
}

#[test]
fn test_custom_steps_compose() -> anyhow::Result<()> {
    let pipeline = Pipeline::new()
        .add_step_boxed(Box::new(DuplicateStep))
        .add_step(Arc::new(DuplicateStep));

    let result = pipeline.run(blank_image(10))?;
    assert_eq!(result.len(), 4);
    assert_eq!(result[0].get_int("copy"), Some(0));
    assert_eq!(result[1].get_int("copy"), Some(1));
    assert_eq!(pipeline.run_partial(blank_image(10), 1)?.len(), 2);
    Ok(())
}

#[test]
fn test_run_inspect_reports_each_step() -> anyhow::Result<()> {
    let pipeline = build_standard_pipeline(&DetectorConfig::default(), Some(accepting_classifier(0.2)?));

    let mut seen = Vec::new();
    let mut candidates = Vec::new();
    let confirmed = pipeline.run_inspect(square_image(200, 70, 70, 60), |step, data| {
        seen.push(step.to_string());
        if step == REGION_PROPOSAL_STEP {
            candidates = regions(data);
        }
    })?;

    assert_eq!(seen, pipeline.step_names());
    assert_eq!(candidates.len(), 1);
    assert!(confirmed.is_empty());
    Ok(())
}
