//! Batch behaviour of the `dicefinder` binary.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::*;

fn dicefinder(args: &[&str]) -> anyhow::Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_dicefinder")).args(args).output()?)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

#[test]
fn test_debug_out_handles_shared_stems() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = dir.path().join("in");
    let debug = dir.path().join("debug");
    std::fs::create_dir(&input)?;
    let img = square_image(200, 70, 70, 60);
    for name in ["a.jpg", "a.png", "b.png"] {
        img.save(input.join(name))?;
    }

    let output = dicefinder(&[
        path_str(&input),
        "--proposals-only",
        "--debug-out",
        path_str(&debug),
    ])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    for name in ["a_jpg", "a_png", "b_png"] {
        assert!(debug.join(name).join("05_region_proposal").is_dir(), "missing {name}");
    }
    assert!(stdout.contains("b.png: 1 candidate(s)"), "{stdout}");
    assert!(stdout.contains("of 3 images contain at least one"), "{stdout}");
    assert!(!stdout.contains("skipped"), "{stdout}");
    Ok(())
}

#[test]
fn test_summary_counts_only_processed_images() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    square_image(200, 70, 70, 60).save(dir.path().join("die.png"))?;
    blank_image(100).save(dir.path().join("empty.png"))?;
    std::fs::write(dir.path().join("broken.png"), b"not an image")?;

    let output = dicefinder(&[path_str(dir.path()), "--proposals-only"])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(
        stdout.contains("1 candidate(s) found; 1 of 2 images contain at least one (1 skipped)"),
        "{stdout}"
    );
    Ok(())
}

#[test]
fn test_flags_unused_by_mode_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let image = dir.path().join("die.png");
    square_image(200, 70, 70, 60).save(&image)?;

    for args in [
        vec![path_str(&image), "--mode", "scan", "--proposals-only"],
        vec![path_str(&image), "--mode", "check", "--debug-out", path_str(dir.path())],
        vec![path_str(&image), "--mode", "match"],
        vec![path_str(&image), "--template", path_str(&image)],
    ] {
        let output = dicefinder(&args)?;
        assert!(!output.status.success(), "accepted {args:?}");
    }
    Ok(())
}

#[test]
fn test_match_mode_finds_template() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let scene = square_image(120, 30, 40, 20);
    let scene_path = dir.path().join("scene.png");
    let template_path = dir.path().join("template.png");
    scene.save(&scene_path)?;
    scene.crop_imm(25, 35, 30, 30).save(&template_path)?;

    let output = dicefinder(&[
        path_str(&scene_path),
        "--mode",
        "match",
        "--template",
        path_str(&template_path),
        "--count-pips",
    ])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    // The matched block is one blob too large to be a pip.
    assert!(stdout.contains("(25, 35) 30x30, 0 pip(s)"), "{stdout}");
    Ok(())
}
