//! Request handlers for the control API.

mod control;
mod proxy;

pub use control::{
    not_found, pause_torrent, set_metered, start_torrent, status_check, stop_torrent,
    torrent_status,
};
pub use proxy::proxy_stream;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use sluice_core::session::InfoHash;

/// JSON error body with the given status.
pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Parses the route's hash segment, rejecting anything but 40 hex digits.
pub(crate) fn parse_info_hash(raw: &str) -> Result<InfoHash, Response> {
    InfoHash::from_hex(raw)
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "Invalid info hash"))
}
