//! Contrast-limited adaptive histogram equalisation on the L\*a\*b\* lightness
//! channel.

use image::{GrayImage, Luma, Rgb, RgbImage};

// D65 reference white.
const XN: f32 = 0.950_47;
const YN: f32 = 1.0;
const ZN: f32 = 1.088_83;

const EPSILON: f32 = 216.0 / 24389.0;
const KAPPA: f32 = 24389.0 / 27.0;

/// Equalise a single-channel image with a `tiles` x `tiles` grid.
///
/// Each tile's histogram is clipped at `clip_limit` times the flat-histogram
/// height and the excess is spread evenly over all bins. Pixels are mapped by
/// bilinear interpolation between the four nearest tile mappings. Images too
/// small to split into tiles are returned unchanged.
pub fn clahe(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || tiles == 0 {
        return gray.clone();
    }
    let tile_w = w / tiles;
    let tile_h = h / tiles;
    if tile_w == 0 || tile_h == 0 {
        return gray.clone();
    }

    let n = tiles as usize;
    let mut maps = vec![[0u8; 256]; n * n];

    for ty in 0..tiles {
        for tx in 0..tiles {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = if tx == tiles - 1 { w } else { x0 + tile_w };
            let y1 = if ty == tiles - 1 { h } else { y0 + tile_h };
            let tile_pixels = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let clip = ((clip_limit * tile_pixels as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let per_bin = excess / 256;
            let remainder = (excess % 256) as usize;
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += per_bin;
                if i < remainder {
                    *bin += 1;
                }
            }

            let mut cdf = [0u32; 256];
            let mut running = 0u32;
            for (i, bin) in hist.iter().enumerate() {
                running += bin;
                cdf[i] = running;
            }
            let cdf_min = cdf.iter().copied().find(|&v| v > 0).unwrap_or(0);
            let denom = cdf[255].saturating_sub(cdf_min);

            let map = &mut maps[(ty * tiles + tx) as usize];
            for (i, slot) in map.iter_mut().enumerate() {
                *slot = if denom == 0 {
                    i as u8
                } else {
                    let v = cdf[i].saturating_sub(cdf_min) as f32 / denom as f32 * 255.0;
                    v.round().min(255.0) as u8
                };
            }
        }
    }

    let last = tiles as i64 - 1;
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let v = pixel[0] as usize;

        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = (fx.floor() as i64).clamp(0, last) as usize;
        let tx1 = (fx.floor() as i64 + 1).clamp(0, last) as usize;
        let ty0 = (fy.floor() as i64).clamp(0, last) as usize;
        let ty1 = (fy.floor() as i64 + 1).clamp(0, last) as usize;
        let ax = fx - fx.floor();
        let ay = fy - fy.floor();

        let v00 = maps[ty0 * n + tx0][v] as f32;
        let v10 = maps[ty0 * n + tx1][v] as f32;
        let v01 = maps[ty1 * n + tx0][v] as f32;
        let v11 = maps[ty1 * n + tx1][v] as f32;

        let top = v00 * (1.0 - ax) + v10 * ax;
        let bottom = v01 * (1.0 - ax) + v11 * ax;
        let value = top * (1.0 - ay) + bottom * ay;
        out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }

    out
}

/// Normalise lighting: CLAHE on the L\*a\*b\* lightness of an sRGB image,
/// keeping the chroma channels.
pub fn equalize_lightness(rgb: &RgbImage, tiles: u32, clip_limit: f32) -> RgbImage {
    let (w, h) = rgb.dimensions();
    let lab: Vec<[f32; 3]> = rgb.pixels().map(|p| srgb_to_lab(*p)).collect();

    let lightness = GrayImage::from_fn(w, h, |x, y| {
        let l = lab[(y * w + x) as usize][0];
        Luma([(l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8])
    });
    let equalized = clahe(&lightness, tiles, clip_limit);

    RgbImage::from_fn(w, h, |x, y| {
        let [_, a, b] = lab[(y * w + x) as usize];
        let l = equalized.get_pixel(x, y)[0] as f32 * 100.0 / 255.0;
        lab_to_srgb([l, a, b])
    })
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let t = f * f * f;
    if t > EPSILON {
        t
    } else {
        (116.0 * f - 16.0) / KAPPA
    }
}

/// sRGB (D65) to L\*a\*b\* with L in `0..=100`.
pub fn srgb_to_lab(p: Rgb<u8>) -> [f32; 3] {
    let r = srgb_to_linear(p[0]);
    let g = srgb_to_linear(p[1]);
    let b = srgb_to_linear(p[2]);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y / YN);
    let fz = lab_f(z / ZN);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub fn lab_to_srgb([l, a, b]: [f32; 3]) -> Rgb<u8> {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = XN * lab_f_inv(fx);
    let y = YN * lab_f_inv(fy);
    let z = ZN * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let bl = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    Rgb([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)])
}
