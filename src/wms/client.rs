//! Reqwest-based WMS GetMap client.
//!
//! One client per layer. Constructed once at startup, then cheaply cloned
//! because `reqwest::Client` is an `Arc` internally.

use chrono::NaiveDateTime;
use image::RgbImage;
use reqwest::Client;
use tracing::{debug, trace};

use crate::error::AppError;
use crate::geo::BoundingBox;

use super::ImagerySource;

/// WMS protocol version sent with every GetMap request.
const WMS_VERSION: &str = "1.1.1";

/// Spatial reference system — the whole service works in EPSG:4326.
const WMS_SRS: &str = "EPSG:4326";

#[derive(Debug, Clone)]
pub struct WmsClient {
    client: Client,
    base_url: String,
    layer: String,
}

impl WmsClient {
    /// Build a client for one WMS layer with a per-request timeout.
    pub fn new(base_url: String, layer: String, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| AppError::Wms(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url, layer })
    }

    /// Layer this client requests.
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Assemble the GetMap query parameters for one request.
    ///
    /// The `time` dimension is sent date-granular (`YYYY-MM-DD`): daily
    /// composite layers ignore the intra-day component anyway.
    fn getmap_query(
        &self,
        bbox: &BoundingBox,
        size: (u32, u32),
        time: NaiveDateTime,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("service", "WMS".to_string()),
            ("version", WMS_VERSION.to_string()),
            ("request", "GetMap".to_string()),
            ("layers", self.layer.clone()),
            ("styles", String::new()),
            ("srs", WMS_SRS.to_string()),
            ("bbox", bbox.to_wms_param()),
            ("width", size.0.to_string()),
            ("height", size.1.to_string()),
            ("format", "image/png".to_string()),
            ("time", time.format("%Y-%m-%d").to_string()),
        ]
    }
}

impl ImagerySource for WmsClient {
    async fn fetch(
        &self,
        bbox: BoundingBox,
        size: (u32, u32),
        time: NaiveDateTime,
    ) -> Result<RgbImage, AppError> {
        let query = self.getmap_query(&bbox, size, time);
        debug!(layer = %self.layer, time = %time.format("%Y-%m-%d"), "GetMap request");
        trace!(?query, "GetMap query parameters");

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Wms(format!("GetMap request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Wms(format!("GetMap returned HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Wms(format!("failed to read GetMap body: {e}")))?;

        let img = image::load_from_memory(&bytes)
            .map_err(|e| AppError::Wms(format!("failed to decode GetMap image: {e}")))?;

        Ok(img.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> WmsClient {
        WmsClient::new(
            "https://example.org/wms".to_string(),
            "MODIS_Terra_CorrectedReflectance_TrueColor".to_string(),
            30,
        )
        .unwrap()
    }

    #[test]
    fn query_contains_required_getmap_fields() {
        let bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
        let time = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(6, 30, 0).unwrap();
        let query = client().getmap_query(&bbox, (800, 600), time);

        let get = |k: &str| {
            query
                .iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| panic!("missing query key {k}"))
        };
        assert_eq!(get("service"), "WMS");
        assert_eq!(get("request"), "GetMap");
        assert_eq!(get("srs"), "EPSG:4326");
        assert_eq!(get("bbox"), "-10,-10,10,10");
        assert_eq!(get("width"), "800");
        assert_eq!(get("height"), "600");
        assert_eq!(get("format"), "image/png");
        // Time is date-granular regardless of the intra-day component.
        assert_eq!(get("time"), "2024-03-01");
        assert_eq!(get("layers"), "MODIS_Terra_CorrectedReflectance_TrueColor");
    }
}
