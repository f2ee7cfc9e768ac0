//! Pipeline tests against an in-memory imagery source — no network, no
//! ffmpeg.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use image::{Rgb, RgbImage};

use skylapse::error::AppError;
use skylapse::geo::BoundingBox;
use skylapse::pipeline::{self, TimelapseParams};
use skylapse::wms::{self, ImagerySource};

/// Counts fetches; returns a solid frame whose intensity varies with the
/// call number so interpolation has something to blend.
struct CountingSource {
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new() -> Self {
        Self { fetches: AtomicUsize::new(0) }
    }

    fn count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ImagerySource for CountingSource {
    async fn fetch(
        &self,
        _bbox: BoundingBox,
        size: (u32, u32),
        _time: NaiveDateTime,
    ) -> Result<RgbImage, AppError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        let v = (n * 50 % 256) as u8;
        Ok(RgbImage::from_pixel(size.0, size.1, Rgb([v, v, v])))
    }
}

fn bbox() -> BoundingBox {
    BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn one_day_window_at_daily_interval_fetches_exactly_two_images() {
    let source = CountingSource::new();
    let params = TimelapseParams {
        bbox: bbox(),
        size: (8, 8),
        time_start: date("2024-03-01").and_hms_opt(0, 0, 0).unwrap(),
        time_end: date("2024-03-02").and_hms_opt(0, 0, 0).unwrap(),
        interval_minutes: 1440,
        frames_between: 7,
        fps: 10,
    };

    let frames = pipeline::timelapse_frames(&source, &params).await.unwrap();

    assert_eq!(source.count(), 2, "exactly 2 raw images should be fetched");
    assert!(frames.len() >= 2);
    // (num_images − 1) × (frames_between + 1) + 1
    assert_eq!(frames.len(), (2 - 1) * (7 + 1) + 1);
}

#[tokio::test]
async fn timelapse_with_single_image_errors() {
    let source = CountingSource::new();
    let params = TimelapseParams {
        bbox: bbox(),
        size: (8, 8),
        // 2-hour window at a daily interval: one fetch only
        time_start: date("2024-03-01").and_hms_opt(0, 0, 0).unwrap(),
        time_end: date("2024-03-01").and_hms_opt(2, 0, 0).unwrap(),
        interval_minutes: 1440,
        frames_between: 7,
        fps: 10,
    };

    assert!(pipeline::timelapse_frames(&source, &params).await.is_err());
    assert_eq!(source.count(), 1);
}

#[tokio::test]
async fn daily_frames_cover_the_whole_day() {
    let source = CountingSource::new();
    // Every 8 hours: 00:00, 08:00, 16:00 → 3 raw images.
    let frames =
        pipeline::daily_frames(&source, bbox(), (8, 8), date("2024-03-01"), 480, 60)
            .await
            .unwrap();

    assert_eq!(source.count(), 3);
    let n_between = pipeline::frames_between_for(480, 60);
    assert_eq!(frames.len(), 2 * (n_between as usize + 1) + 1);
}

#[tokio::test]
async fn daily_frames_with_single_image_returns_raw() {
    let source = CountingSource::new();
    // Daily interval within one day: only the midnight image exists.
    let frames =
        pipeline::daily_frames(&source, bbox(), (8, 8), date("2024-03-01"), 1440, 10)
            .await
            .unwrap();

    assert_eq!(source.count(), 1);
    assert_eq!(frames.len(), 1, "too little imagery: raw frames pass through");
}

#[tokio::test]
async fn render_daily_with_single_image_errors_without_writing() {
    let source = CountingSource::new();
    let dir = tempfile::tempdir().unwrap();

    let result = pipeline::render_daily(
        &source,
        dir.path(),
        bbox(),
        (8, 8),
        date("2024-03-01"),
        1440,
        10,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0, "no file should be written");
}

#[tokio::test]
async fn range_concatenates_per_day_sequences() {
    let source = CountingSource::new();
    // Two days, every 12 hours → 2 images per day, 4 total.
    let frames = pipeline::range_frames(
        &source,
        bbox(),
        (8, 8),
        date("2024-03-01"),
        date("2024-03-02"),
        720,
        60,
    )
    .await
    .unwrap();

    assert_eq!(source.count(), 4);
    let n_between = pipeline::frames_between_for(720, 60);
    assert_eq!(frames.len(), 3 * (n_between as usize + 1) + 1);
}

#[tokio::test]
async fn range_with_inverted_dates_errors() {
    let source = CountingSource::new();
    let result = pipeline::range_frames(
        &source,
        bbox(),
        (8, 8),
        date("2024-03-02"),
        date("2024-03-01"),
        720,
        60,
    )
    .await;
    assert!(result.is_err());
    assert_eq!(source.count(), 0);
}

#[tokio::test]
async fn oversized_bbox_never_reaches_the_source_unclamped() {
    struct AssertingSource;
    impl ImagerySource for AssertingSource {
        async fn fetch(
            &self,
            bbox: BoundingBox,
            size: (u32, u32),
            _time: NaiveDateTime,
        ) -> Result<RgbImage, AppError> {
            assert!(bbox.min_lon >= -180.0 && bbox.max_lon <= 180.0);
            assert!(bbox.min_lat >= -90.0 && bbox.max_lat <= 90.0);
            assert!(bbox.lon_span() <= 360.0);
            Ok(RgbImage::new(size.0, size.1))
        }
    }

    let wild = BoundingBox::new(-250.0, -95.0, 250.0, 95.0).unwrap();
    wms::fetch_sequence(
        &AssertingSource,
        wild,
        (8, 8),
        date("2024-03-01").and_hms_opt(0, 0, 0).unwrap(),
        date("2024-03-01").and_hms_opt(1, 0, 0).unwrap(),
        60,
    )
    .await
    .unwrap();
}
