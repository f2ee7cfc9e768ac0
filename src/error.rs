//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("bounding box error: {0}")]
    Geo(String),

    #[error("wms error: {0}")]
    Wms(String),

    #[error("interpolation error: {0}")]
    Interp(String),

    #[error("neural interpolation error: {0}")]
    Neural(String),

    #[error("video encoding error: {0}")]
    Video(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
