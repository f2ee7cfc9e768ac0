//! Serving encoded videos under `/videos/{filename}`.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::warn;

use super::AppState;

/// Only bare filenames are served — anything that could walk out of the
/// video directory is rejected.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.starts_with('.')
}

/// GET /videos/{filename}
pub(super) async fn serve_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return (StatusCode::BAD_REQUEST, "invalid filename\n").into_response();
    }

    // Encoded videos can be large; stream the file instead of buffering it.
    let path = state.config.video.dir.join(&filename);
    match tokio::fs::File::open(&path).await {
        Ok(file) => {
            let body = Body::from_stream(ReaderStream::new(file));
            ([(header::CONTENT_TYPE, "video/mp4")], body).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "video not found\n").into_response()
        }
        Err(e) => {
            warn!(%filename, "failed to open video: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to open video\n").into_response()
        }
    }
}
