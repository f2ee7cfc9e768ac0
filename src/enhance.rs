//! Raster enhancement applied to every fetched satellite image.
//!
//! Two passes, both pure functions over [`RgbImage`]:
//! 1. per-channel histogram equalization (256-bin CDF remap);
//! 2. contrast stretch mapping the 2nd..98th intensity percentiles onto the
//!    full 0..255 range.
//!
//! Satellite true-color captures are often hazy and low-contrast; this is
//! the same clean-up the upstream layers get before interpolation.

use image::RgbImage;

/// Lower percentile anchored to 0 by the contrast stretch.
pub const STRETCH_LO_PERCENTILE: f64 = 2.0;

/// Upper percentile anchored to 255 by the contrast stretch.
pub const STRETCH_HI_PERCENTILE: f64 = 98.0;

/// Equalize each channel's histogram independently.
///
/// Returns the input unchanged when a channel is constant (its CDF has no
/// spread to remap).
pub fn equalize_histogram(img: &RgbImage) -> RgbImage {
    let total = (img.width() as u64) * (img.height() as u64);
    if total == 0 {
        return img.clone();
    }

    // Per-channel lookup tables built from the cumulative histogram.
    let mut luts = [[0u8; 256]; 3];
    for ch in 0..3 {
        let mut hist = [0u64; 256];
        for px in img.pixels() {
            hist[px.0[ch] as usize] += 1;
        }
        let mut cdf = [0u64; 256];
        let mut acc = 0u64;
        for (v, count) in hist.iter().enumerate() {
            acc += count;
            cdf[v] = acc;
        }
        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
        let denom = total.saturating_sub(cdf_min);
        for v in 0..256 {
            luts[ch][v] = if denom == 0 {
                v as u8
            } else {
                (((cdf[v].saturating_sub(cdf_min)) as f64 / denom as f64) * 255.0).round() as u8
            };
        }
    }

    let mut out = img.clone();
    for px in out.pixels_mut() {
        for ch in 0..3 {
            px.0[ch] = luts[ch][px.0[ch] as usize];
        }
    }
    out
}

/// Stretch intensities so the joint 2nd percentile maps to 0 and the joint
/// 98th percentile maps to 255, clamped.
///
/// Percentiles are computed over all channels together, matching how the
/// whole raster is treated as one intensity distribution.
pub fn stretch_contrast(img: &RgbImage) -> RgbImage {
    let samples = img.as_raw();
    if samples.is_empty() {
        return img.clone();
    }

    let mut hist = [0u64; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let lo = percentile_of(&hist, samples.len() as u64, STRETCH_LO_PERCENTILE);
    let hi = percentile_of(&hist, samples.len() as u64, STRETCH_HI_PERCENTILE);
    if hi <= lo {
        return img.clone();
    }

    let scale = 255.0 / (hi - lo) as f64;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let stretched = ((v as f64 - lo as f64) * scale).round();
        *slot = stretched.clamp(0.0, 255.0) as u8;
    }

    let mut out = img.clone();
    for v in out.iter_mut() {
        *v = lut[*v as usize];
    }
    out
}

/// Full enhancement pass: equalize, then stretch.
pub fn enhance(img: &RgbImage) -> RgbImage {
    stretch_contrast(&equalize_histogram(img))
}

/// Smallest intensity whose cumulative count reaches `pct` percent of `total`.
fn percentile_of(hist: &[u64; 256], total: u64, pct: f64) -> u8 {
    let target = (total as f64 * pct / 100.0).ceil() as u64;
    let mut acc = 0u64;
    for (v, count) in hist.iter().enumerate() {
        acc += count;
        if acc >= target {
            return v as u8;
        }
    }
    255
}
