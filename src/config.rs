//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `SKYLAPSE_BIND`, `SKYLAPSE_VIDEO_DIR`, `SKYLAPSE_WMS_URL`
//! and `SKYLAPSE_LOG_LEVEL` env overrides.

use std::{env, fs, path::PathBuf};

use serde::Deserialize;

use crate::error::AppError;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the API listener to.
    pub bind: String,
}

/// Remote WMS endpoint configuration.
#[derive(Debug, Clone)]
pub struct WmsConfig {
    /// GetMap base URL.
    pub url: String,
    /// Layer requested for linear time-lapses.
    pub layer: String,
    /// Layer requested for neural animations.
    pub neural_layer: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Imagery request defaults.
#[derive(Debug, Clone)]
pub struct ImageryConfig {
    /// Requested raster width in pixels.
    pub width: u32,
    /// Requested raster height in pixels.
    pub height: u32,
    /// Default interval in minutes between satellite images.
    pub interval_minutes: u32,
}

/// Video assembly configuration.
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Directory encoded videos are written to (created on demand).
    pub dir: PathBuf,
    /// Default frame rate for linear time-lapses.
    pub fps: u32,
    /// Default frame rate for neural animations.
    pub neural_fps: u32,
}

/// Neural interpolation configuration.
#[derive(Debug, Clone)]
pub struct NeuralConfig {
    /// Path to the two-frame interpolation ONNX model.
    /// `None` disables the neural route even when the feature is compiled in.
    pub model_path: Option<PathBuf>,
    /// Intermediate frames generated between each pair of daily images.
    pub frames_between: u32,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub server: ServerConfig,
    pub wms: WmsConfig,
    pub imagery: ImageryConfig,
    pub video: VideoConfig,
    pub neural: NeuralConfig,
}

// ── Raw TOML shape — serde target before resolution ───────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    service: RawService,
    #[serde(default)]
    server: RawServer,
    wms: RawWms,
    #[serde(default)]
    imagery: RawImagery,
    #[serde(default)]
    video: RawVideo,
    #[serde(default)]
    neural: RawNeural,
}

#[derive(Deserialize, Default)]
struct RawService {
    #[serde(default = "default_log_level")]
    log_level: String,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Deserialize, Default)]
struct RawWms {
    url: String,
    layer: String,
    #[serde(default)]
    neural_layer: Option<String>,
    #[serde(default = "default_wms_timeout")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawImagery {
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    #[serde(default = "default_interval")]
    interval_minutes: u32,
}

impl Default for RawImagery {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            interval_minutes: default_interval(),
        }
    }
}

#[derive(Deserialize)]
struct RawVideo {
    #[serde(default = "default_video_dir")]
    dir: String,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_neural_fps")]
    neural_fps: u32,
}

impl Default for RawVideo {
    fn default() -> Self {
        Self {
            dir: default_video_dir(),
            fps: default_fps(),
            neural_fps: default_neural_fps(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawNeural {
    #[serde(default)]
    model_path: Option<String>,
    #[serde(default = "default_frames_between")]
    frames_between: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_wms_timeout() -> u64 {
    60
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_interval() -> u32 {
    60
}
fn default_video_dir() -> String {
    "videos".to_string()
}
fn default_fps() -> u32 {
    10
}
fn default_neural_fps() -> u32 {
    60
}
fn default_frames_between() -> u32 {
    15
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Path of the config file, relative to the working directory.
const CONFIG_PATH: &str = "config/default.toml";

/// Load `config/default.toml` and apply env overrides.
pub fn load() -> Result<Config, AppError> {
    let text = fs::read_to_string(CONFIG_PATH)
        .map_err(|e| AppError::Config(format!("failed to read {CONFIG_PATH}: {e}")))?;
    from_toml_str(&text)
}

/// Parse a config from TOML text and apply env overrides. Split out from
/// [`load`] so tests can feed literal TOML.
pub fn from_toml_str(text: &str) -> Result<Config, AppError> {
    let raw: RawConfig =
        toml::from_str(text).map_err(|e| AppError::Config(format!("invalid config TOML: {e}")))?;
    resolve(raw)
}

fn resolve(raw: RawConfig) -> Result<Config, AppError> {
    let log_level = env::var("SKYLAPSE_LOG_LEVEL").unwrap_or(raw.service.log_level);
    let bind = env::var("SKYLAPSE_BIND").unwrap_or(raw.server.bind);
    let wms_url = env::var("SKYLAPSE_WMS_URL").unwrap_or(raw.wms.url);
    let video_dir = env::var("SKYLAPSE_VIDEO_DIR").unwrap_or(raw.video.dir);

    if wms_url.is_empty() {
        return Err(AppError::Config("wms.url must not be empty".into()));
    }
    if raw.wms.layer.is_empty() {
        return Err(AppError::Config("wms.layer must not be empty".into()));
    }
    if raw.imagery.width == 0 || raw.imagery.height == 0 {
        return Err(AppError::Config("imagery size must be non-zero".into()));
    }
    if raw.imagery.interval_minutes == 0 {
        return Err(AppError::Config("imagery.interval_minutes must be non-zero".into()));
    }
    if raw.video.fps == 0 || raw.video.neural_fps == 0 {
        return Err(AppError::Config("video fps must be non-zero".into()));
    }

    let neural_layer = raw.wms.neural_layer.unwrap_or_else(|| raw.wms.layer.clone());

    Ok(Config {
        log_level,
        server: ServerConfig { bind },
        wms: WmsConfig {
            url: wms_url,
            layer: raw.wms.layer,
            neural_layer,
            timeout_seconds: raw.wms.timeout_seconds,
        },
        imagery: ImageryConfig {
            width: raw.imagery.width,
            height: raw.imagery.height,
            interval_minutes: raw.imagery.interval_minutes,
        },
        video: VideoConfig {
            dir: PathBuf::from(video_dir),
            fps: raw.video.fps,
            neural_fps: raw.video.neural_fps,
        },
        neural: NeuralConfig {
            model_path: raw.neural.model_path.map(PathBuf::from),
            frames_between: raw.neural.frames_between,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [wms]
        url = "https://example.org/wms"
        layer = "TrueColor"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let c = from_toml_str(MINIMAL).unwrap();
        assert_eq!(c.server.bind, "127.0.0.1:8080");
        assert_eq!(c.imagery.width, 800);
        assert_eq!(c.imagery.height, 600);
        assert_eq!(c.imagery.interval_minutes, 60);
        assert_eq!(c.video.fps, 10);
        assert_eq!(c.video.neural_fps, 60);
        assert_eq!(c.neural.frames_between, 15);
        assert!(c.neural.model_path.is_none());
        // neural layer falls back to the linear layer
        assert_eq!(c.wms.neural_layer, "TrueColor");
    }

    #[test]
    fn full_config_parses() {
        let c = from_toml_str(
            r#"
            [service]
            log_level = "debug"

            [server]
            bind = "0.0.0.0:9000"

            [wms]
            url = "https://example.org/wms"
            layer = "TrueColor"
            neural_layer = "ViirsTrueColor"
            timeout_seconds = 30

            [imagery]
            width = 1024
            height = 768
            interval_minutes = 30

            [video]
            dir = "/tmp/videos"
            fps = 24
            neural_fps = 48

            [neural]
            model_path = "models/rife.onnx"
            frames_between = 7
            "#,
        )
        .unwrap();
        assert_eq!(c.log_level, "debug");
        assert_eq!(c.server.bind, "0.0.0.0:9000");
        assert_eq!(c.wms.neural_layer, "ViirsTrueColor");
        assert_eq!(c.wms.timeout_seconds, 30);
        assert_eq!(c.imagery.interval_minutes, 30);
        assert_eq!(c.video.dir, PathBuf::from("/tmp/videos"));
        assert_eq!(c.neural.model_path, Some(PathBuf::from("models/rife.onnx")));
        assert_eq!(c.neural.frames_between, 7);
    }

    #[test]
    fn missing_wms_section_errors() {
        assert!(from_toml_str("[server]\nbind = \"x\"").is_err());
    }

    #[test]
    fn zero_values_rejected() {
        let bad = r#"
            [wms]
            url = "https://example.org/wms"
            layer = "TrueColor"

            [imagery]
            interval_minutes = 0
        "#;
        assert!(from_toml_str(bad).is_err());
    }
}
