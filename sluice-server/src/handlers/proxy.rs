//! The range-aware streaming proxy route.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use sluice_core::engine::{EngineError, TorrentSnapshot, TorrentStatus};
use sluice_core::streaming::{ByteRange, parse_byte_range};

use super::{json_error, parse_info_hash};
use crate::server::AppState;

/// `GET /proxy/{hash}` — stream the selected file, honoring Range requests.
///
/// Waits up to the metadata timeout for the torrent to become streamable,
/// then answers `200` (whole file) or `206` (range) with a body that blocks
/// per-read on pieces not yet downloaded.
pub async fn proxy_stream(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
    headers: HeaderMap,
) -> Response {
    let info_hash = match parse_info_hash(&raw_hash) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };

    let snapshot = match wait_for_metadata(&state, info_hash).await {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };
    // metadata_ready implies a selected file; guard anyway.
    let Some(selected) = snapshot.selected else {
        return json_error(StatusCode::SERVICE_UNAVAILABLE, "File not selected yet");
    };
    let file_size = selected.size;

    let range_header = match headers.get(header::RANGE) {
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid Range header"),
        },
        None => None,
    };

    if file_size == 0 {
        return match range_header {
            // No byte of an empty file is addressable.
            Some(_) => json_error(StatusCode::BAD_REQUEST, "Unsatisfiable Range"),
            None => empty_response(&selected.name),
        };
    }

    let (status, range) = match &range_header {
        None => (
            StatusCode::OK,
            ByteRange {
                start: 0,
                end: file_size - 1,
            },
        ),
        Some(value) => match parse_byte_range(value, file_size) {
            Ok(range) => (StatusCode::PARTIAL_CONTENT, range),
            Err(error) => {
                tracing::debug!(%info_hash, %error, "rejected range request");
                return json_error(StatusCode::BAD_REQUEST, &error.to_string());
            }
        },
    };

    let source = match state.engine.open_stream(info_hash, range.start, range.end).await {
        Ok(source) => source,
        Err(EngineError::UnknownTorrent { .. }) => {
            return json_error(StatusCode::NOT_FOUND, "Torrent not started");
        }
        Err(EngineError::NotReady { .. }) => {
            return json_error(StatusCode::SERVICE_UNAVAILABLE, "File not available yet");
        }
        Err(EngineError::TorrentFailed { message, .. }) => {
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &message);
        }
        Err(error) => {
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string());
        }
    };

    let cursor = match source.open().await {
        Ok(cursor) => cursor,
        Err(error) => {
            tracing::warn!(%info_hash, %error, "selected file failed to open");
            return json_error(StatusCode::SERVICE_UNAVAILABLE, "File not available yet");
        }
    };

    tracing::info!(
        %info_hash,
        file = %selected.name,
        start = range.start,
        end = range.end,
        partial = status == StatusCode::PARTIAL_CONTENT,
        "streaming"
    );

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type_for(&selected.name))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, range.content_length().to_string())
        .header(header::CACHE_CONTROL, "no-cache");
    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(header::CONTENT_RANGE, range.content_range(file_size));
    }

    match builder.body(Body::from_stream(cursor.into_byte_stream())) {
        Ok(response) => response,
        Err(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "response build failed"),
    }
}

/// Polls torrent state until metadata is ready, the torrent errors, or the
/// wait times out. Missing torrents fail immediately.
async fn wait_for_metadata(
    state: &AppState,
    info_hash: sluice_core::session::InfoHash,
) -> Result<TorrentSnapshot, Response> {
    let deadline = tokio::time::Instant::now() + state.config.engine.metadata_wait_timeout;
    loop {
        let snapshot = match state.engine.state(info_hash).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                return Err(json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &error.to_string(),
                ));
            }
        };
        let Some(snapshot) = snapshot else {
            return Err(json_error(StatusCode::NOT_FOUND, "Torrent not started"));
        };
        if snapshot.status == TorrentStatus::Error {
            let message = snapshot
                .error
                .unwrap_or_else(|| "torrent failed".to_string());
            return Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, &message));
        }
        if snapshot.metadata_ready {
            return Ok(snapshot);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Metadata not ready",
            ));
        }
        tokio::time::sleep(state.config.engine.metadata_poll_interval).await;
    }
}

/// MIME type from the file extension. Matroska is special-cased and the
/// fallback is mp4, so players always get a video type.
fn content_type_for(file_name: &str) -> String {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("mkv") => "video/x-matroska".to_string(),
        Some(ext) => mime_guess::from_ext(ext)
            .first()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "video/mp4".to_string()),
        None => "video/mp4".to_string(),
    }
}

fn empty_response(file_name: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(file_name))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, "0")
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::content_type_for;

    #[test]
    fn matroska_is_special_cased() {
        assert_eq!(content_type_for("Show.S01E02.720p.mkv"), "video/x-matroska");
        assert_eq!(content_type_for("SHOW.MKV"), "video/x-matroska");
    }

    #[test]
    fn known_extensions_use_their_mime() {
        assert_eq!(content_type_for("movie.mp4"), "video/mp4");
        assert_eq!(content_type_for("movie.webm"), "video/webm");
    }

    #[test]
    fn unknown_extensions_default_to_mp4() {
        assert_eq!(content_type_for("movie"), "video/mp4");
        assert_eq!(content_type_for("movie.zzvid"), "video/mp4");
    }
}
