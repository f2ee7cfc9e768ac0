//! Imagery acquisition from a WMS endpoint.
//!
//! [`ImagerySource`] is the seam between the pipeline and the network: the
//! production implementation is [`WmsClient`]; tests substitute an in-memory
//! stub. Callers are generic over the source, so no trait-object machinery
//! is needed.

pub mod client;

pub use client::WmsClient;

use chrono::{Duration, NaiveDateTime};
use image::RgbImage;
use tracing::{debug, info};

use crate::enhance;
use crate::error::AppError;
use crate::geo::BoundingBox;

/// A provider of timestamped map imagery.
pub trait ImagerySource {
    /// Fetch one rendered raster for `bbox` at `time`.
    ///
    /// `bbox` is already normalised by the caller; implementations issue it
    /// as-is.
    fn fetch(
        &self,
        bbox: BoundingBox,
        size: (u32, u32),
        time: NaiveDateTime,
    ) -> impl Future<Output = Result<RgbImage, AppError>> + Send;
}

/// Fetch a sequence of satellite images between `time_start` and `time_end`
/// (inclusive), stepping `interval_minutes` at a time.
///
/// The bounding box is normalised once, before any request is issued. Each
/// returned raster is run through the enhancement pass
/// ([`enhance::enhance`]) so downstream interpolation works on cleaned-up
/// frames.
pub async fn fetch_sequence<S: ImagerySource>(
    source: &S,
    bbox: BoundingBox,
    size: (u32, u32),
    time_start: NaiveDateTime,
    time_end: NaiveDateTime,
    interval_minutes: u32,
) -> Result<Vec<RgbImage>, AppError> {
    if time_end <= time_start {
        return Err(AppError::Wms(format!(
            "end time {time_end} must be after start time {time_start}"
        )));
    }
    if interval_minutes == 0 {
        return Err(AppError::Wms("interval_minutes must be non-zero".into()));
    }

    let adjusted = bbox.normalized();
    info!(bbox = %adjusted.to_wms_param(), "adjusted bbox");

    let mut images = Vec::new();
    let mut current = time_start;
    while current <= time_end {
        debug!(time = %current, "fetching frame");
        let raw = source.fetch(adjusted, size, current).await?;
        images.push(enhance::enhance(&raw));
        current = current + Duration::minutes(i64::from(interval_minutes));
    }

    info!(count = images.len(), "fetched image sequence");
    Ok(images)
}
