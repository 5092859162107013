//! Tests for template matching and pip counting on synthetic dice.

mod common;

use dicefinder::{count_pips, find_template, PipConfig, TemplateMethod};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use common::*;

/// Die face of `side` px in `face` colour with round pips at `centres`.
fn die_face(side: u32, face: Rgb<u8>, pip: Rgb<u8>, centres: &[(i32, i32)]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(side, side, face);
    for &centre in centres {
        draw_filled_circle_mut(&mut img, centre, 6, pip);
    }
    DynamicImage::ImageRgb8(img)
}

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[test]
fn test_squared_error_methods_take_minimum() -> anyhow::Result<()> {
    let scene = square_image(100, 30, 40, 20);
    let template = scene.crop_imm(25, 35, 30, 30);

    for method in [
        TemplateMethod::SumOfSquaredErrors,
        TemplateMethod::SumOfSquaredErrorsNormalized,
    ] {
        let found = find_template(&scene, &template, method)?;
        assert_eq!(found.bbox, BoundingBox::new(25, 35, 30, 30), "{method:?}");
        assert!(found.score.abs() < 1e-3, "{method:?} score {}", found.score);
    }
    Ok(())
}

#[test]
fn test_correlation_methods_take_maximum() -> anyhow::Result<()> {
    // Bright square on a dark background, so raw correlation peaks where the
    // squares overlap.
    let scene = DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, y| {
        if (30..50).contains(&x) && (40..60).contains(&y) { WHITE } else { Rgb([40, 40, 40]) }
    }));
    let template = scene.crop_imm(25, 35, 30, 30);

    for method in [
        TemplateMethod::CrossCorrelation,
        TemplateMethod::CrossCorrelationNormalized,
    ] {
        assert!(!method.lower_is_better());
        let found = find_template(&scene, &template, method)?;
        assert_eq!(found.bbox, BoundingBox::new(25, 35, 30, 30), "{method:?}");
    }
    Ok(())
}

#[test]
fn test_template_larger_than_image_is_rejected() {
    let scene = blank_image(20);
    let template = blank_image(30);
    assert!(matches!(
        find_template(&scene, &template, TemplateMethod::default()),
        Err(DiceError::InvalidInput(_))
    ));
    assert!(matches!(
        find_template(&scene, &DynamicImage::new_rgb8(0, 5), TemplateMethod::default()),
        Err(DiceError::InvalidInput(_))
    ));
}

#[test]
fn test_counts_dark_pips_on_light_face() -> anyhow::Result<()> {
    let config = PipConfig::default();
    let three = die_face(100, WHITE, BLACK, &[(25, 25), (50, 50), (75, 75)]);
    assert_eq!(count_pips(&three, &config)?, 3);

    let five = die_face(100, WHITE, BLACK, &[(25, 25), (75, 25), (50, 50), (25, 75), (75, 75)]);
    assert_eq!(count_pips(&five, &config)?, 5);
    Ok(())
}

#[test]
fn test_counts_light_pips_on_dark_face() -> anyhow::Result<()> {
    let two = die_face(100, BLACK, WHITE, &[(30, 30), (70, 70)]);
    assert_eq!(count_pips(&two, &PipConfig::default())?, 2);
    Ok(())
}

#[test]
fn test_background_around_face_is_not_a_pip() -> anyhow::Result<()> {
    let mut img = RgbImage::from_pixel(120, 120, BLACK);
    for y in 10..110 {
        for x in 10..110 {
            img.put_pixel(x, y, WHITE);
        }
    }
    for centre in [(35, 35), (85, 35), (35, 85), (85, 85)] {
        draw_filled_circle_mut(&mut img, centre, 6, BLACK);
    }

    assert_eq!(count_pips(&DynamicImage::ImageRgb8(img), &PipConfig::default())?, 4);
    Ok(())
}

#[test]
fn test_blank_face_and_tiny_specks() -> anyhow::Result<()> {
    assert_eq!(count_pips(&blank_image(60), &PipConfig::default())?, 0);

    let mut img = RgbImage::from_pixel(60, 60, WHITE);
    img.put_pixel(30, 30, BLACK);
    img.put_pixel(10, 40, BLACK);
    assert_eq!(count_pips(&DynamicImage::ImageRgb8(img), &PipConfig::default())?, 0);

    assert!(matches!(
        count_pips(&DynamicImage::new_rgb8(0, 0), &PipConfig::default()),
        Err(DiceError::InvalidInput(_))
    ));
    Ok(())
}
