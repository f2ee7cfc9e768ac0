//! Geographic bounding boxes in EPSG:4326.
//!
//! A [`BoundingBox`] arrives from the HTTP API as `[min_lon, min_lat,
//! max_lon, max_lat]` and must be normalised before any WMS request is
//! issued: longitude spans wider than 360° are truncated, coordinates are
//! clamped to Earth bounds, and boxes that wrap the antimeridian are pinned
//! to the nearer edge so the rendered imagery does not repeat.

use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;

/// Valid Earth bounds in EPSG:4326: (min_lon, min_lat, max_lon, max_lat).
pub const EARTH_BOUNDS: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

/// An axis-aligned geographic bounding box, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = AppError;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl BoundingBox {
    /// Build a bounding box, rejecting non-finite or inverted coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, AppError> {
        for c in [min_lon, min_lat, max_lon, max_lat] {
            if !c.is_finite() {
                return Err(AppError::Geo(format!("non-finite coordinate: {c}")));
            }
        }
        if min_lon >= max_lon {
            return Err(AppError::Geo(format!(
                "min_lon ({min_lon}) must be less than max_lon ({max_lon})"
            )));
        }
        if min_lat >= max_lat {
            return Err(AppError::Geo(format!(
                "min_lat ({min_lat}) must be less than max_lat ({max_lat})"
            )));
        }
        Ok(Self { min_lon, min_lat, max_lon, max_lat })
    }

    /// Normalise the box so it is safe to hand to a WMS GetMap request.
    ///
    /// Applied in order:
    /// 1. longitude span > 360° → truncate `max_lon` to `min_lon + 360`;
    /// 2. antimeridian guard: a box spanning both the -180° and 180° edges
    ///    is pinned to whichever edge is nearer;
    /// 3. clamp all coordinates to Earth bounds.
    ///
    /// Idempotent: normalising a normalised box is a no-op.
    pub fn normalized(&self) -> Self {
        let Self { min_lon: mut minx, min_lat: mut miny, max_lon: mut maxx, max_lat: mut maxy } =
            *self;
        let (lo_x, lo_y, hi_x, hi_y) = EARTH_BOUNDS;

        // Prevent wrapping around the globe.
        if maxx - minx > 360.0 {
            maxx = minx + 360.0;
            warn!(min_lon = minx, max_lon = maxx, "longitude span too large, limiting to 360 degrees");
        }

        // A box crossing the antimeridian would make the imagery repeat;
        // pin it to the nearer edge.
        if minx < lo_x && maxx > hi_x {
            warn!("bbox crosses antimeridian, adjusting to prevent image repetition");
            if (minx - lo_x).abs() < (maxx - hi_x).abs() {
                minx = lo_x;
            } else {
                maxx = hi_x;
            }
        }

        minx = minx.max(lo_x);
        miny = miny.max(lo_y);
        maxx = maxx.min(hi_x);
        maxy = maxy.min(hi_y);

        Self { min_lon: minx, min_lat: miny, max_lon: maxx, max_lat: maxy }
    }

    /// Longitude span in degrees.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Render as the WMS `bbox=` parameter value.
    pub fn to_wms_param(&self) -> String {
        format!("{},{},{},{}", self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_box_constructs() {
        let b = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
        assert_eq!(b.lon_span(), 20.0);
    }

    #[test]
    fn inverted_axes_rejected() {
        assert!(BoundingBox::new(10.0, -10.0, -10.0, 10.0).is_err());
        assert!(BoundingBox::new(-10.0, 10.0, 10.0, -10.0).is_err());
        assert!(BoundingBox::new(5.0, -1.0, 5.0, 1.0).is_err());
    }

    #[test]
    fn non_finite_rejected() {
        assert!(BoundingBox::new(f64::NAN, -10.0, 10.0, 10.0).is_err());
        assert!(BoundingBox::new(-10.0, -10.0, f64::INFINITY, 10.0).is_err());
    }

    #[test]
    fn out_of_bounds_clamped() {
        let b = BoundingBox::new(-200.0, -95.0, 190.0, 95.0).unwrap().normalized();
        assert_eq!(b.min_lon, -180.0);
        assert_eq!(b.min_lat, -90.0);
        assert_eq!(b.max_lon, 180.0);
        assert_eq!(b.max_lat, 90.0);
    }

    #[test]
    fn oversized_span_truncated_to_360() {
        let b = BoundingBox::new(-180.0, -10.0, 540.0, 10.0).unwrap().normalized();
        assert_eq!(b.lon_span(), 360.0);
        assert_eq!(b.min_lon, -180.0);
        assert_eq!(b.max_lon, 180.0);
    }

    #[test]
    fn antimeridian_pins_to_nearer_edge() {
        // Closer to the west edge: min_lon is pinned.
        let b = BoundingBox::new(-190.0, -10.0, 200.0, 10.0).unwrap().normalized();
        assert_eq!(b.min_lon, -180.0);
        assert!(b.max_lon <= 180.0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let cases = [
            BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap(),
            BoundingBox::new(-200.0, -95.0, 190.0, 95.0).unwrap(),
            BoundingBox::new(-180.0, -10.0, 540.0, 10.0).unwrap(),
        ];
        for b in cases {
            let once = b.normalized();
            assert_eq!(once, once.normalized());
        }
    }

    #[test]
    fn in_bounds_box_untouched() {
        let b = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
        assert_eq!(b, b.normalized());
    }

    #[test]
    fn wms_param_format() {
        let b = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
        assert_eq!(b.to_wms_param(), "-10,-10,10,10");
    }

    #[test]
    fn deserializes_from_json_array() {
        let b: BoundingBox = serde_json::from_str("[-10.0, -10.0, 10.0, 10.0]").unwrap();
        assert_eq!(b.min_lon, -10.0);
        assert!(serde_json::from_str::<BoundingBox>("[10.0, -10.0, -10.0, 10.0]").is_err());
    }
}
