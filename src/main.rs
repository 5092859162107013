use anyhow::Context;
use clap::{Parser, ValueEnum};
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dicefinder::detection::build_standard_pipeline;
use dicefinder::detection::steps::REGION_PROPOSAL_STEP;
use dicefinder::output::{self, BatchSummary};
use dicefinder::pipeline::regions;
use dicefinder::{
    count_pips, find_template, BoundingBox, Detections, DetectorConfig, DiceClassifier,
    RegionProposer, TemplateMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Propose regions from contours, then classify them
    Detect,
    /// Classify every tile of a 4x4 grid
    Scan,
    /// Treat each input image as a tight crop and check whether it is a die
    Check,
    /// Locate a reference die crop (--template) in each image
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatchMethod {
    Ssd,
    SsdNormed,
    Ccorr,
    CcorrNormed,
}

impl From<MatchMethod> for TemplateMethod {
    fn from(method: MatchMethod) -> Self {
        match method {
            MatchMethod::Ssd => TemplateMethod::SumOfSquaredErrors,
            MatchMethod::SsdNormed => TemplateMethod::SumOfSquaredErrorsNormalized,
            MatchMethod::Ccorr => TemplateMethod::CrossCorrelation,
            MatchMethod::CcorrNormed => TemplateMethod::CrossCorrelationNormalized,
        }
    }
}

#[derive(Parser)]
#[command(name = "dicefinder")]
#[command(about = "Find dice in photographs")]
struct Cli {
    /// Image file, or a directory of .jpg/.jpeg/.png files
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Trained model (JSON linear SVM)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Detector configuration (JSON); missing fields use defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Detect)]
    mode: Mode,

    /// Reference die crop for match mode
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Template comparison score for match mode
    #[arg(long, value_enum, default_value_t = MatchMethod::SsdNormed)]
    match_method: MatchMethod,

    /// Count the pips on every die found
    #[arg(long)]
    count_pips: bool,

    /// Write annotated copies of the input images to this directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Also write annotated images where no die was found
    #[arg(long)]
    keep_empty: bool,

    /// Save a crop of every confirmed die to this directory
    #[arg(long, value_name = "DIR")]
    crops: Option<PathBuf>,

    /// Stop after region proposal (detect mode, no model needed)
    #[arg(long)]
    proposals_only: bool,

    /// Save every pipeline stage per image to directory (detect mode)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Reject flag combinations the chosen mode would silently ignore.
    fn validate(&self) -> anyhow::Result<()> {
        if self.mode != Mode::Detect {
            if self.proposals_only {
                anyhow::bail!("--proposals-only only applies to detect mode");
            }
            if self.debug_out.is_some() {
                anyhow::bail!("--debug-out only applies to detect mode");
            }
        }
        match (self.mode, &self.template) {
            (Mode::Match, None) => anyhow::bail!("--template is required for match mode"),
            (Mode::Match, Some(_)) => {}
            (_, Some(_)) => anyhow::bail!("--template only applies to match mode"),
            (_, None) => {}
        }
        if self.proposals_only && self.count_pips {
            anyhow::bail!("--count-pips needs confirmed dice; drop --proposals-only");
        }
        if self.mode == Mode::Match && self.model.is_some() {
            log::warn!("--model is not used in match mode");
        }
        Ok(())
    }

    fn needs_model(&self) -> bool {
        match self.mode {
            Mode::Detect => !self.proposals_only,
            Mode::Scan | Mode::Check => true,
            Mode::Match => false,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    args.validate()?;

    let config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    };

    let images = output::collect_images(&args.input)
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;
    if images.is_empty() {
        anyhow::bail!("No images found in {}", args.input.display());
    }
    log::info!("Processing {} image(s)", images.len());

    let classifier = match (&args.model, args.needs_model()) {
        (Some(path), true) => Some(Arc::new(DiceClassifier::load(path, config.classifier.clone())?)),
        (None, true) => anyhow::bail!("--model is required for {:?} mode", args.mode),
        (_, false) => None,
    };
    let template = match &args.template {
        Some(path) => Some(load_image(path).context("Failed to load template")?),
        None => None,
    };

    let mut summary = BatchSummary::default();

    for path in &images {
        match process_image(&args, &config, classifier.clone(), template.as_ref(), path) {
            Ok(hits) => summary.record(hits),
            Err(e) => {
                log::warn!("Skipping {}: {:#}", path.display(), e);
                summary.skip();
            }
        }
    }

    println!("\n=== Summary ===");
    let line = match args.mode {
        Mode::Check => format!(
            "{} of {} images recognised as dice",
            summary.images_with_hits, summary.processed
        ),
        Mode::Detect if args.proposals_only => summary.report("candidate(s)"),
        Mode::Match => summary.report("match(es)"),
        _ => summary.report("dice"),
    };
    if summary.skipped > 0 && args.mode == Mode::Check {
        println!("{line} ({} skipped)", summary.skipped);
    } else {
        println!("{line}");
    }

    Ok(())
}

/// Run the selected mode on one image; returns the number of hits.
fn process_image(
    args: &Cli,
    config: &DetectorConfig,
    classifier: Option<Arc<DiceClassifier>>,
    template: Option<&DynamicImage>,
    path: &Path,
) -> anyhow::Result<usize> {
    let img = load_image(path)?;
    log::debug!("Image loaded: {}x{}", img.width(), img.height());

    let detections = match args.mode {
        Mode::Detect => detect(args, config, classifier, path, &img)?,
        Mode::Scan => {
            let classifier = classifier.context("classifier not loaded")?;
            Detections { candidates: Vec::new(), dice: classifier.sliding_window(&img) }
        }
        Mode::Match => {
            let template = template.context("template not loaded")?;
            let found = find_template(&img, template, args.match_method.into())?;
            println!("{}: match score {}", path.display(), found.score);
            Detections { candidates: Vec::new(), dice: vec![found.bbox] }
        }
        Mode::Check => {
            let classifier = classifier.context("classifier not loaded")?;
            let found = classifier.is_die(&img);
            print!("{}: {}", path.display(), if found { "die" } else { "not a die" });
            if found && args.count_pips {
                print!(", {} pip(s)", count_pips(&img, &config.pips)?);
            }
            println!();
            return Ok(usize::from(found));
        }
    };

    let found = if args.proposals_only { &detections.candidates } else { &detections.dice };
    println!(
        "{}: {} candidate(s), {} die/dice",
        path.display(),
        detections.candidates.len(),
        detections.dice.len()
    );
    for bbox in found {
        print!("  ({}, {}) {}x{}", bbox.x, bbox.y, bbox.width, bbox.height);
        if args.count_pips {
            print!(", {} pip(s)", pips_in(&img, bbox, config)?);
        }
        println!();
    }

    if let Some(out_dir) = &args.out {
        if args.keep_empty || !found.is_empty() {
            std::fs::create_dir_all(out_dir)?;
            let target = output::annotated_path(out_dir, path);
            output::annotate(&img, &detections).save(&target)?;
            log::debug!("Saved {}", target.display());
        }
    }

    if let Some(crops_dir) = &args.crops {
        let written = output::save_crops(&img, &detections.dice, crops_dir, "die_")?;
        log::debug!("Saved {} crop(s) to {}", written.len(), crops_dir.display());
    }

    Ok(found.len())
}

fn load_image(path: &Path) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))
}

fn pips_in(img: &DynamicImage, bbox: &BoundingBox, config: &DetectorConfig) -> anyhow::Result<usize> {
    let crop = img.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
    Ok(count_pips(&crop, &config.pips)?)
}

fn detect(
    args: &Cli,
    config: &DetectorConfig,
    classifier: Option<Arc<DiceClassifier>>,
    path: &Path,
    img: &DynamicImage,
) -> anyhow::Result<Detections> {
    if let Some(debug_root) = &args.debug_out {
        let classifier = if args.proposals_only { None } else { classifier };
        let pipeline = build_standard_pipeline(config, classifier)
            .with_debug(debug_root.join(output::debug_dir_name(path)))?;

        let mut candidates = Vec::new();
        let confirmed = pipeline.run_inspect(img.clone(), |step, data| {
            if step == REGION_PROPOSAL_STEP {
                candidates = regions(data);
            }
        })?;

        let dice = if args.proposals_only { Vec::new() } else { regions(&confirmed) };
        return Ok(Detections { candidates, dice });
    }

    let candidates = RegionProposer::new(config.proposal.clone()).propose(img)?;
    let dice = match &classifier {
        Some(classifier) if !args.proposals_only => classifier.classify(img, &candidates),
        _ => Vec::new(),
    };
    Ok(Detections { candidates, dice })
}
