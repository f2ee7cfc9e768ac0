//! Video assembly — pipes raw frames into an `ffmpeg` child process.
//!
//! Frames are written as packed `rgb24` on stdin; ffmpeg handles the pixel
//! format conversion and container muxing. Encoders are tried in
//! [`CODEC_FALLBACKS`] order; a non-zero exit (or failure to spawn) moves on
//! to the next. The written file must be non-empty or the whole write is an
//! error.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::RgbImage;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::AppError;

/// Encoders tried in order of preference.
pub const CODEC_FALLBACKS: &[&str] = &["libx264", "mpeg4", "libxvid"];

/// Encode `frames` into an MP4 at `output_path`.
///
/// All frames must share one size; the list must be non-empty; `fps` must be
/// non-zero. Returns the output path on success.
pub async fn write_video(
    frames: &[RgbImage],
    output_path: &Path,
    fps: u32,
) -> Result<PathBuf, AppError> {
    let first = frames
        .first()
        .ok_or_else(|| AppError::Video("no frames to create video from".into()))?;
    let (width, height) = first.dimensions();
    if fps == 0 {
        return Err(AppError::Video("fps must be non-zero".into()));
    }
    for (i, frame) in frames.iter().enumerate() {
        if frame.dimensions() != (width, height) {
            return Err(AppError::Video(format!(
                "frame {i} size {:?} does not match first frame {:?}",
                frame.dimensions(),
                (width, height)
            )));
        }
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    info!(
        width,
        height,
        frame_count = frames.len(),
        fps,
        path = %output_path.display(),
        "encoding video"
    );

    let mut last_error = String::new();
    for codec in CODEC_FALLBACKS {
        match encode_with_codec(frames, output_path, (width, height), fps, codec).await {
            Ok(()) => {
                let size = tokio::fs::metadata(output_path).await.map(|m| m.len()).unwrap_or(0);
                if size == 0 {
                    return Err(AppError::Video("output video file is empty".into()));
                }
                info!(codec, size_bytes = size, "video encoded");
                return Ok(output_path.to_path_buf());
            }
            Err(e) => {
                warn!(codec, "codec attempt failed: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(AppError::Video(format!(
        "failed to open video writer with any codec: {last_error}"
    )))
}

/// One encode attempt with a specific encoder.
async fn encode_with_codec(
    frames: &[RgbImage],
    output_path: &Path,
    size: (u32, u32),
    fps: u32,
    codec: &str,
) -> Result<(), AppError> {
    let mut child = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", size.0, size.1),
            "-r",
            &fps.to_string(),
            "-i",
            "-",
            "-c:v",
            codec,
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(output_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AppError::Video(format!("failed to spawn ffmpeg: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Video("ffmpeg stdin not captured".into()))?;

    for frame in frames {
        stdin
            .write_all(frame.as_raw())
            .await
            .map_err(|e| AppError::Video(format!("failed to write frame to ffmpeg: {e}")))?;
    }
    drop(stdin); // close the pipe so ffmpeg finalises the container

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| AppError::Video(format!("failed to wait for ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Video(format!(
            "ffmpeg ({codec}) exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[tokio::test]
    async fn empty_frame_list_rejected() {
        let err = write_video(&[], Path::new("/tmp/out.mp4"), 10).await.unwrap_err();
        assert!(err.to_string().contains("no frames"));
    }

    #[tokio::test]
    async fn mismatched_frame_sizes_rejected() {
        let frames = vec![RgbImage::new(8, 8), RgbImage::new(8, 10)];
        let err = write_video(&frames, Path::new("/tmp/out.mp4"), 10).await.unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[tokio::test]
    async fn zero_fps_rejected() {
        let frames = vec![RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))];
        assert!(write_video(&frames, Path::new("/tmp/out.mp4"), 0).await.is_err());
    }

    #[test]
    fn fallback_list_is_populated() {
        assert!(!CODEC_FALLBACKS.is_empty());
        assert_eq!(CODEC_FALLBACKS[0], "libx264");
    }
}
