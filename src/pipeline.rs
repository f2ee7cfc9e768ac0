//! Render pipelines — fetch imagery, interpolate, encode, name the output.
//!
//! Four pipelines mirror the four API routes: an explicit time-window
//! time-lapse, a whole-day render, a multi-day render, and the neural
//! animation. Each splits into a frames step (fetch + interpolate, testable
//! against a stub source) and a render step that encodes and returns the
//! output path.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use image::RgbImage;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::BoundingBox;
use crate::interp::{self, Easing};
use crate::neural::NeuralInterpolator;
use crate::video;
use crate::wms::{self, ImagerySource};

/// Intermediate frames per pair for the explicit-window time-lapse.
pub const DEFAULT_FRAMES_BETWEEN: u32 = 7;

/// Parameters for the explicit time-window pipeline.
#[derive(Debug, Clone)]
pub struct TimelapseParams {
    pub bbox: BoundingBox,
    pub size: (u32, u32),
    pub time_start: chrono::NaiveDateTime,
    pub time_end: chrono::NaiveDateTime,
    pub interval_minutes: u32,
    pub frames_between: u32,
    pub fps: u32,
}

// ── Frame-count arithmetic ────────────────────────────────────────────────────

/// Intermediate frames between a pair for the daily/range pipelines.
///
/// One real frame pair covers `interval_minutes` of wall time; emitting
/// `interval_secs / fps` total frames per pair keeps the historical pacing.
/// The left endpoint accounts for one of those, hence the `− 1`.
pub fn frames_between_for(interval_minutes: u32, fps: u32) -> u32 {
    ((interval_minutes * 60) / fps.max(1)).max(1) - 1
}

/// `<prefix>_<stamp>_<uuid8>.mp4` (or `<prefix>_<uuid8>.mp4` with no stamp).
fn unique_filename(prefix: &str, stamp: Option<&str>) -> String {
    let uid = Uuid::new_v4().simple().to_string();
    match stamp {
        Some(s) => format!("{prefix}_{s}_{}.mp4", &uid[..8]),
        None => format!("{prefix}_{}.mp4", &uid[..8]),
    }
}

// ── Explicit window ───────────────────────────────────────────────────────────

/// Fetch and interpolate an explicit time window.
pub async fn timelapse_frames<S: ImagerySource>(
    source: &S,
    params: &TimelapseParams,
) -> Result<Vec<RgbImage>, AppError> {
    let images = wms::fetch_sequence(
        source,
        params.bbox,
        params.size,
        params.time_start,
        params.time_end,
        params.interval_minutes,
    )
    .await?;
    if images.len() < 2 {
        return Err(AppError::Wms(format!(
            "not enough images in window to interpolate (got {})",
            images.len()
        )));
    }
    interp::interpolate_sequence(&images, params.frames_between, Easing::Linear)
}

/// Full explicit-window pipeline: fetch → interpolate → encode.
pub async fn render_timelapse<S: ImagerySource>(
    source: &S,
    video_dir: &Path,
    params: &TimelapseParams,
) -> Result<PathBuf, AppError> {
    let frames = timelapse_frames(source, params).await?;
    let path = video_dir.join(unique_filename("timelapse", None));
    video::write_video(&frames, &path, params.fps).await
}

// ── Daily ─────────────────────────────────────────────────────────────────────

/// Fetch one day of imagery and interpolate it for playback at `fps`.
///
/// When fewer than 2 images come back the raw frames are returned as-is —
/// there is nothing to interpolate.
pub async fn daily_frames<S: ImagerySource>(
    source: &S,
    bbox: BoundingBox,
    size: (u32, u32),
    date: NaiveDate,
    interval_minutes: u32,
    fps: u32,
) -> Result<Vec<RgbImage>, AppError> {
    let time_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let time_end = date.and_hms_opt(23, 59, 59).expect("end of day is always valid");

    let images = wms::fetch_sequence(source, bbox, size, time_start, time_end, interval_minutes)
        .await?;

    if images.len() < 2 {
        warn!(%date, count = images.len(), "not enough images found for date to interpolate");
        return Ok(images);
    }

    let n_between = frames_between_for(interval_minutes, fps);
    interp::interpolate_sequence(&images, n_between, Easing::Linear)
}

/// Full daily pipeline; errors when the day has too little imagery to encode.
pub async fn render_daily<S: ImagerySource>(
    source: &S,
    video_dir: &Path,
    bbox: BoundingBox,
    size: (u32, u32),
    date: NaiveDate,
    interval_minutes: u32,
    fps: u32,
) -> Result<PathBuf, AppError> {
    let frames = daily_frames(source, bbox, size, date, interval_minutes, fps).await?;
    if frames.len() < 2 {
        return Err(AppError::Wms(format!(
            "not enough images found for date {date} to create a video"
        )));
    }
    let stamp = date.format("%Y%m%d").to_string();
    let path = video_dir.join(unique_filename("daily", Some(&stamp)));
    video::write_video(&frames, &path, fps).await
}

// ── Multi-day range ───────────────────────────────────────────────────────────

/// Fetch imagery for every day in `start_date..=end_date` and interpolate the
/// concatenated sequence.
pub async fn range_frames<S: ImagerySource>(
    source: &S,
    bbox: BoundingBox,
    size: (u32, u32),
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval_minutes: u32,
    fps: u32,
) -> Result<Vec<RgbImage>, AppError> {
    if end_date < start_date {
        return Err(AppError::Wms(format!(
            "end date {end_date} is before start date {start_date}"
        )));
    }

    let mut all_images = Vec::new();
    let mut current = start_date;
    while current <= end_date {
        let time_start = current.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let time_end = current.and_hms_opt(23, 59, 59).expect("end of day is always valid");
        let daily =
            wms::fetch_sequence(source, bbox, size, time_start, time_end, interval_minutes)
                .await?;
        all_images.extend(daily);
        current = current + Duration::days(1);
    }

    if all_images.len() < 2 {
        return Err(AppError::Wms(format!(
            "not enough images found between {start_date} and {end_date}"
        )));
    }

    let n_between = frames_between_for(interval_minutes, fps);
    interp::interpolate_sequence(&all_images, n_between, Easing::Linear)
}

/// Full multi-day pipeline: per-day fetches → interpolate → encode.
pub async fn render_range<S: ImagerySource>(
    source: &S,
    video_dir: &Path,
    bbox: BoundingBox,
    size: (u32, u32),
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval_minutes: u32,
    fps: u32,
) -> Result<PathBuf, AppError> {
    let frames =
        range_frames(source, bbox, size, start_date, end_date, interval_minutes, fps).await?;
    let stamp = format!("{}_{}", start_date.format("%Y%m%d"), end_date.format("%Y%m%d"));
    let path = video_dir.join(unique_filename("range", Some(&stamp)));
    video::write_video(&frames, &path, fps).await
}

// ── Neural animation ──────────────────────────────────────────────────────────

/// Interval for the neural pipeline: one image per day.
const NEURAL_INTERVAL_MINUTES: u32 = 1440;

/// Stitch per-pair neural output into one sequence, dropping the shared
/// endpoint between consecutive pairs.
fn stitch_neural(
    interp: &mut NeuralInterpolator,
    images: &[RgbImage],
    frames_between: u32,
) -> Result<Vec<RgbImage>, AppError> {
    let mut all_frames = Vec::new();
    let last_pair = images.len() - 2;
    for i in 0..images.len() - 1 {
        let mut frames = interp.interpolate_pair(&images[i], &images[i + 1], frames_between)?;
        if i < last_pair {
            frames.pop(); // next pair re-emits this frame as its left endpoint
        }
        all_frames.extend(frames);
    }
    Ok(all_frames)
}

/// Full neural pipeline: daily imagery → model interpolation → encode.
///
/// Model inference is CPU-bound, so the stitching loop runs on the blocking
/// thread pool.
pub async fn render_neural<S: ImagerySource>(
    source: &S,
    mut interpolator: NeuralInterpolator,
    video_dir: &Path,
    bbox: BoundingBox,
    size: (u32, u32),
    start_date: NaiveDate,
    end_date: NaiveDate,
    frames_between: u32,
    fps: u32,
) -> Result<PathBuf, AppError> {
    if end_date <= start_date {
        return Err(AppError::Wms(format!(
            "end date {end_date} must be after start date {start_date}"
        )));
    }

    let time_start = start_date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let time_end = end_date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let images =
        wms::fetch_sequence(source, bbox, size, time_start, time_end, NEURAL_INTERVAL_MINUTES)
            .await?;

    if images.len() < 2 {
        return Err(AppError::Wms(format!(
            "not enough images found between {start_date} and {end_date}"
        )));
    }

    info!(count = images.len(), frames_between, "running neural interpolation");
    let frames = tokio::task::spawn_blocking(move || {
        stitch_neural(&mut interpolator, &images, frames_between)
    })
    .await
    .map_err(|e| AppError::Neural(format!("interpolation task failed: {e}")))??;

    let stamp = format!("{}_{}", start_date.format("%Y%m%d"), end_date.format("%Y%m%d"));
    let path = video_dir.join(unique_filename("neural", Some(&stamp)));
    video::write_video(&frames, &path, fps).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_between_matches_historical_pacing() {
        // 60-minute interval at 10 fps → 360 frames per pair, 359 synthetic.
        assert_eq!(frames_between_for(60, 10), 359);
        // Daily interval at 60 fps → 1440 frames per pair.
        assert_eq!(frames_between_for(1440, 60), 1439);
        // Degenerate settings never underflow.
        assert_eq!(frames_between_for(1, 120), 0);
        assert_eq!(frames_between_for(1, 0), 59);
    }

    #[test]
    fn unique_filenames_differ() {
        let a = unique_filename("daily", Some("20240301"));
        let b = unique_filename("daily", Some("20240301"));
        assert_ne!(a, b);
        assert!(a.starts_with("daily_20240301_"));
        assert!(a.ends_with(".mp4"));
    }

    #[test]
    fn unique_filename_without_stamp() {
        let name = unique_filename("timelapse", None);
        assert!(name.starts_with("timelapse_"));
        assert!(name.ends_with(".mp4"));
    }
}
