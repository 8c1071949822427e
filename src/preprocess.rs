//! Contrast enhancement applied before annotation: CLAHE on the lightness
//! channel of CIE L*a*b*, then a gamma curve on every channel.

use image::RgbImage;
use palette::{white_point::D65, FromColor, Lab, Srgb};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClaheParams {
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

pub const DEFAULT_GAMMA: f32 = 0.8;

/// CLAHE on lightness followed by the [`DEFAULT_GAMMA`] curve.
pub fn enhance(image: &RgbImage) -> RgbImage {
    let mut out = equalize_lightness(image, ClaheParams::default());
    apply_lut(&mut out, &gamma_lut(DEFAULT_GAMMA));
    log::debug!("enhanced {}x{} image", image.width(), image.height());
    out
}

// ── Gamma ───────────────────────────────────────────────────────────────────

/// `out = (i / 255) ^ (1 / gamma) * 255`, truncated.
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inv = 1.0 / gamma as f64;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = ((i as f64 / 255.0).powf(inv) * 255.0) as u8;
    }
    lut
}

pub fn apply_lut(image: &mut RgbImage, lut: &[u8; 256]) {
    for channel in image.iter_mut() {
        *channel = lut[*channel as usize];
    }
}

// ── Lab conversion (8-bit lightness: L scaled from 0..=100 to 0..=255) ─────

fn rgb_to_lab(rgb: [u8; 3]) -> Lab<D65, f32> {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    Lab::from_color(srgb)
}

fn lab_to_rgb(lab: Lab<D65, f32>) -> [u8; 3] {
    let srgb: Srgb<f32> = Srgb::from_color(lab);
    [srgb.red, srgb.green, srgb.blue].map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Equalize the L channel with CLAHE and convert back, keeping a/b.
pub fn equalize_lightness(image: &RgbImage, params: ClaheParams) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut lightness = Vec::with_capacity((w * h) as usize);
    let mut chroma = Vec::with_capacity((w * h) as usize);
    for pixel in image.pixels() {
        let lab = rgb_to_lab(pixel.0);
        lightness.push((lab.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8);
        chroma.push((lab.a, lab.b));
    }

    let equalized = clahe(&lightness, w, h, params);

    let mut out = RgbImage::new(w, h);
    for ((pixel, &l8), &(a, b)) in out.pixels_mut().zip(&equalized).zip(&chroma) {
        pixel.0 = lab_to_rgb(Lab::new(l8 as f32 * 100.0 / 255.0, a, b));
    }
    out
}

// ── CLAHE ───────────────────────────────────────────────────────────────────

/// Contrast-limited adaptive histogram equalization of a single 8-bit plane.
///
/// The plane is split into a `tiles_x` x `tiles_y` grid (fewer tiles if the
/// plane is smaller than the grid); each tile gets a clipped, redistributed
/// histogram turned into a mapping, and pixels are bilinearly interpolated
/// between the four nearest tile mappings.
pub fn clahe(plane: &[u8], width: u32, height: u32, params: ClaheParams) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let (w, h) = (width as usize, height as usize);
    let tile_w = w.div_ceil(params.tiles_x.clamp(1, width) as usize);
    let tile_h = h.div_ceil(params.tiles_y.clamp(1, height) as usize);
    // Rounding the tile size up can leave trailing grid cells empty; drop them.
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx * tile_w).min(w);
            let x1 = ((tx + 1) * tile_w).min(w);
            let y0 = (ty * tile_h).min(h);
            let y1 = ((ty + 1) * tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for &v in &plane[y * w + x0..y * w + x1] {
                    hist[v as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            luts[ty * tiles_x + tx] = tile_mapping(&mut hist, area, params.clip_limit);
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        let (ty0, ty1, fy) = neighbours(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, fx) = neighbours(x, tile_w, tiles_x);
            let v = plane[y * w + x] as usize;
            let at = |tx: usize, ty: usize| luts[ty * tiles_x + tx][v] as f32;
            let top = at(tx0, ty0) * (1.0 - fx) + at(tx1, ty0) * fx;
            let bottom = at(tx0, ty1) * (1.0 - fx) + at(tx1, ty1) * fx;
            out[y * w + x] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Clip `hist`, spread the excess evenly, and build the cumulative mapping.
fn tile_mapping(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0;
        for count in hist.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }
        let batch = excess / 256;
        let residual = (excess % 256) as usize;
        for count in hist.iter_mut() {
            *count += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for count in hist.iter_mut().step_by(step).take(residual) {
                *count += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut sum = 0;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// The two tiles whose centres bracket `pos`, and the weight of the second.
fn neighbours(pos: usize, tile: usize, tiles: usize) -> (usize, usize, f32) {
    let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
    let first = t.floor();
    let weight = t - first;
    let lo = (first.max(0.0) as usize).min(tiles - 1);
    let hi = ((first + 1.0).max(0.0) as usize).min(tiles - 1);
    (lo, hi, weight)
}
