//! Non-streaming control routes.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use sluice_core::engine::{StartOptions, TorrentLiveStatus};

use super::{json_error, parse_info_hash};
use crate::server::AppState;

/// Health probe.
pub async fn status_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "platform": std::env::consts::OS,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Query parameters accepted by `/start/{hash}`.
#[derive(Debug, Deserialize)]
pub struct StartParams {
    #[serde(rename = "fileIdx")]
    file_idx: Option<usize>,
    season: Option<u32>,
    episode: Option<u32>,
}

/// `GET /start/{hash}` — ensure a torrent exists, possibly re-selecting the
/// episode.
pub async fn start_torrent(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
    Query(params): Query<StartParams>,
) -> Response {
    let info_hash = match parse_info_hash(&raw_hash) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };
    let options = StartOptions {
        file_index: params.file_idx,
        season: params.season,
        episode: params.episode,
    };

    match state.engine.start_torrent(info_hash, options).await {
        Ok(_) => Json(json!({
            "status": "started",
            "hash": info_hash.to_string(),
            "fileIdx": params.file_idx,
            "season": params.season,
            "episode": params.episode,
        }))
        .into_response(),
        Err(error) => {
            tracing::warn!(%info_hash, %error, "start failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string())
        }
    }
}

/// `GET /status/{hash}` — live status, or `not_started` for unknown hashes.
pub async fn torrent_status(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
) -> Response {
    let info_hash = match parse_info_hash(&raw_hash) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };

    match state.engine.live_status(info_hash).await {
        Ok(Some(status)) => Json(status_payload(&status)).into_response(),
        Ok(None) => Json(json!({
            "status": "not_started",
            "metadataReady": null,
            "fileName": null,
            "fileSize": null,
            "fileIdx": null,
            "totalFiles": null,
            "duration": null,
            "peers": null,
            "seeds": null,
            "speed": null,
            "progress": null,
        }))
        .into_response(),
        Err(error) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

fn status_payload(status: &TorrentLiveStatus) -> Value {
    let snapshot = &status.snapshot;
    let selected = snapshot.selected.as_ref();
    json!({
        "status": snapshot.status.as_str(),
        "metadataReady": snapshot.metadata_ready,
        "fileName": selected.map(|f| f.name.clone()),
        "fileSize": selected.map(|f| f.size),
        "fileIdx": selected.map(|f| f.index),
        "totalFiles": snapshot.total_files,
        "duration": null,
        "peers": status.peers,
        "seeds": status.seeds,
        "speed": format!("{:.2}", status.download_rate_bps as f64 / 1024.0),
        "progress": format!("{:.1}", status.progress * 100.0),
    })
}

/// `GET /pause/{hash}`.
pub async fn pause_torrent(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
) -> Response {
    let info_hash = match parse_info_hash(&raw_hash) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };
    match state.engine.pause_torrent(info_hash).await {
        Ok(()) => Json(json!({
            "status": "paused",
            "hash": info_hash.to_string(),
        }))
        .into_response(),
        Err(error) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

/// `GET /stop/{hash}` — remove the torrent and delete its files.
pub async fn stop_torrent(
    State(state): State<AppState>,
    Path(raw_hash): Path<String>,
) -> Response {
    let info_hash = match parse_info_hash(&raw_hash) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };
    match state.engine.remove_torrent(info_hash).await {
        Ok(()) => Json(json!({
            "status": "removed",
            "hash": info_hash.to_string(),
        }))
        .into_response(),
        Err(error) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

/// Query parameters accepted by `/network/metered`.
#[derive(Debug, Deserialize)]
pub struct MeteredParams {
    value: Option<bool>,
}

/// `GET /network/metered?value=` — global pause/resume for metered networks.
pub async fn set_metered(
    State(state): State<AppState>,
    Query(params): Query<MeteredParams>,
) -> Response {
    let Some(value) = params.value else {
        return json_error(StatusCode::BAD_REQUEST, "missing value parameter");
    };
    match state.engine.set_metered(value).await {
        Ok(()) => Json(json!({ "status": "ok", "metered": value })).into_response(),
        Err(error) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string()),
    }
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "uri": uri.to_string() })),
    )
        .into_response()
}
