//! Linear frame interpolation — cross-dissolve between consecutive frames.
//!
//! The core operation is [`blend`]: a per-pixel weighted average of two
//! equally-sized frames. [`interpolate_sequence`] applies it pairwise over
//! an ordered frame list, emitting `n_between` synthetic frames between
//! each pair so the assembled video plays smoothly.

use image::RgbImage;
use tracing::debug;

use crate::error::AppError;

// ── Easing ────────────────────────────────────────────────────────────────────

/// Weighting curve for intermediate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Uniform spacing: frame k gets weight `k/(n+1)`.
    #[default]
    Linear,
    /// Cubic smooth-step `t²(3−2t)` biasing weights toward the endpoints.
    SmoothStep,
}

/// Cubic smooth-step easing: `x²(3−2x)` for x in [0,1].
pub fn smoothstep(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

// ── Blending ──────────────────────────────────────────────────────────────────

/// Cross-dissolve two frames at weight `t`.
///
/// Each output channel is `round((1−t)·a + t·b)` clamped to u8. The frames
/// must share dimensions and `t` must lie in [0,1].
pub fn blend(a: &RgbImage, b: &RgbImage, t: f64) -> Result<RgbImage, AppError> {
    if a.dimensions() != b.dimensions() {
        return Err(AppError::Interp(format!(
            "frame size mismatch: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }
    if !(0.0..=1.0).contains(&t) {
        return Err(AppError::Interp(format!("blend weight {t} outside [0,1]")));
    }

    let mut out = b.clone();
    for (dst, (pa, pb)) in out.iter_mut().zip(a.as_raw().iter().zip(b.as_raw().iter())) {
        let v = (1.0 - t) * f64::from(*pa) + t * f64::from(*pb);
        *dst = v.round().clamp(0.0, 255.0) as u8;
    }
    Ok(out)
}

// ── Sequence interpolation ────────────────────────────────────────────────────

/// Interpolate `n_between` frames between each consecutive pair.
///
/// Frame k of a pair (k = 1..=n_between) is blended at `t = k/(n_between+1)`,
/// smooth-stepped when `easing` is [`Easing::SmoothStep`]. Endpoints are
/// emitted once each, so the output length is exactly
/// `(frames.len() − 1) × (n_between + 1) + 1`.
pub fn interpolate_sequence(
    frames: &[RgbImage],
    n_between: u32,
    easing: Easing,
) -> Result<Vec<RgbImage>, AppError> {
    if frames.len() < 2 {
        return Err(AppError::Interp(format!(
            "need at least 2 frames to interpolate, got {}",
            frames.len()
        )));
    }

    let total_pairs = frames.len() - 1;
    let mut out = Vec::with_capacity(total_pairs * (n_between as usize + 1) + 1);

    for (i, pair) in frames.windows(2).enumerate() {
        let (start, end) = (&pair[0], &pair[1]);
        out.push(start.clone());

        for k in 1..=n_between {
            let x = f64::from(k) / f64::from(n_between + 1);
            let t = match easing {
                Easing::Linear => x,
                Easing::SmoothStep => smoothstep(x),
            };
            out.push(blend(start, end, t)?);
        }

        debug!(pair = i + 1, total_pairs, "interpolated frame pair");
    }

    out.push(frames[frames.len() - 1].clone());
    Ok(out)
}
