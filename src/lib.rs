//! Skylapse — satellite time-lapse service.
//!
//! Fetches time-sequenced imagery from a WMS endpoint, interpolates
//! intermediate frames (linear cross-dissolve or a neural two-frame model),
//! assembles the result into an MP4 with ffmpeg, and exposes the whole
//! pipeline over a JSON HTTP API.

pub mod config;
pub mod enhance;
pub mod error;
pub mod geo;
pub mod interp;
pub mod logger;
pub mod neural;
pub mod pipeline;
pub mod server;
pub mod video;
pub mod wms;
