//! End-to-end tests: real HTTP client against a bound server over a
//! simulated swarm.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use sluice_core::config::SluiceConfig;
use sluice_core::engine::{StreamEngineHandle, spawn_stream_engine};
use sluice_core::session::{FixtureFile, InfoHash, SimulatedSession, SwarmFixture};
use sluice_server::AppState;

const SHOW_HASH: &str = "aabbccddeeff00112233445566778899aabbccdd";

struct TestServer {
    base: String,
    client: reqwest::Client,
    session: Arc<SimulatedSession>,
    engine: StreamEngineHandle,
    downloads: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self.get(path).await;
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    /// Polls `/status/{hash}` until the reported status matches.
    async fn wait_for_status(&self, hash: &str, wanted: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let (_, body) = self.get_json(&format!("/status/{hash}")).await;
            if body["status"] == wanted {
                return body;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "status never became {wanted}: {body}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn save_dir(&self, hash: &str) -> std::path::PathBuf {
        self.downloads.path().join(&hash[..20])
    }
}

async fn spawn_server(fixtures: Vec<SwarmFixture>) -> TestServer {
    spawn_server_with(fixtures, |_| {}).await
}

async fn spawn_server_with(
    fixtures: Vec<SwarmFixture>,
    tweak: impl FnOnce(&mut SluiceConfig),
) -> TestServer {
    let downloads = tempfile::tempdir().unwrap();
    let mut config = SluiceConfig::default();
    config.engine.downloads_root = downloads.path().to_path_buf();
    config.engine.metadata_poll_interval = Duration::from_millis(20);
    tweak(&mut config);

    let session = Arc::new(SimulatedSession::new());
    for fixture in fixtures {
        session.register_swarm(fixture);
    }
    let engine = spawn_stream_engine(config.clone(), session.clone());

    let state = AppState {
        engine: engine.clone(),
        config,
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, sluice_server::router(state))
            .await
            .unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        session,
        engine,
        downloads,
    }
}

fn show_fixture() -> SwarmFixture {
    SwarmFixture::new(
        InfoHash::from_hex(SHOW_HASH).unwrap(),
        256 * 1024,
        vec![
            FixtureFile::new("Show.S01E02.720p.mkv", 2 * 1024 * 1024),
            FixtureFile::new("Show.S01E02.720p.srt", 4_000),
        ],
    )
}

#[tokio::test]
async fn status_check_reports_ok() {
    let server = spawn_server(vec![]).await;
    let (status, body) = server.get_json("/status/check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["platform"], std::env::consts::OS);
    assert_eq!(body["version"], "1.0.0");
}

#[tokio::test]
async fn start_and_status_reach_ready_with_episode_selection() {
    let server = spawn_server(vec![show_fixture()]).await;

    let (status, body) = server
        .get_json(&format!("/start/{SHOW_HASH}?season=1&episode=2"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["hash"], SHOW_HASH);
    assert_eq!(body["season"], 1);
    assert_eq!(body["episode"], 2);
    assert_eq!(body["fileIdx"], Value::Null);

    let ready = server.wait_for_status(SHOW_HASH, "ready").await;
    assert_eq!(ready["metadataReady"], true);
    assert!(
        ready["fileName"].as_str().unwrap().contains("S01E02"),
        "{ready}"
    );
    assert_eq!(ready["fileSize"], 2 * 1024 * 1024);
    assert_eq!(ready["fileIdx"], 0);
    assert_eq!(ready["totalFiles"], 2);
    assert_eq!(ready["duration"], Value::Null);
    assert!(ready["speed"].is_string());
    assert!(ready["progress"].is_string());
}

#[tokio::test]
async fn proxy_without_range_serves_whole_file() {
    let server = spawn_server(vec![show_fixture()]).await;
    server
        .get(&format!("/start/{SHOW_HASH}?season=1&episode=2"))
        .await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let response = server.get(&format!("/proxy/{SHOW_HASH}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "video/x-matroska"
    );
    assert_eq!(
        response.headers()["content-length"].to_str().unwrap(),
        (2 * 1024 * 1024).to_string()
    );
    assert_eq!(response.headers()["accept-ranges"].to_str().unwrap(), "bytes");

    let body = response.bytes().await.unwrap();
    let on_disk = tokio::fs::read(server.save_dir(SHOW_HASH).join("Show.S01E02.720p.mkv"))
        .await
        .unwrap();
    assert_eq!(body.len(), on_disk.len());
    assert_eq!(&body[..], &on_disk[..]);
}

#[tokio::test]
async fn proxy_range_serves_exact_window() {
    let server = spawn_server(vec![show_fixture()]).await;
    server
        .get(&format!("/start/{SHOW_HASH}?season=1&episode=2"))
        .await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let file_size = 2 * 1024 * 1024u64;
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", "bytes=0-1048575")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()["content-range"].to_str().unwrap(),
        format!("bytes 0-1048575/{file_size}")
    );
    assert_eq!(
        response.headers()["content-length"].to_str().unwrap(),
        "1048576"
    );

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), 1_048_576);
    let on_disk = tokio::fs::read(server.save_dir(SHOW_HASH).join("Show.S01E02.720p.mkv"))
        .await
        .unwrap();
    assert_eq!(&body[..16], &on_disk[..16]);
    assert_eq!(&body[..], &on_disk[..1_048_576]);
}

#[tokio::test]
async fn proxy_range_boundaries() {
    let server = spawn_server(vec![show_fixture()]).await;
    server
        .get(&format!("/start/{SHOW_HASH}?season=1&episode=2"))
        .await;
    server.wait_for_status(SHOW_HASH, "ready").await;
    let file_size = 2 * 1024 * 1024u64;

    // Suffix of one byte.
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", "bytes=-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()["content-range"].to_str().unwrap(),
        format!("bytes {}-{}/{file_size}", file_size - 1, file_size - 1)
    );
    assert_eq!(response.bytes().await.unwrap().len(), 1);

    // First byte only.
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", "bytes=0-0")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.bytes().await.unwrap().len(), 1);

    // Over-long end is capped at the file size.
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", "bytes=0-999999999")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()["content-range"].to_str().unwrap(),
        format!("bytes 0-{}/{file_size}", file_size - 1)
    );

    // Start past the end of the file.
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", format!("bytes={file_size}-"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Multi-range is not supported.
    let response = server
        .client
        .get(server.url(&format!("/proxy/{SHOW_HASH}")))
        .header("Range", "bytes=0-10,20-30")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metered_mode_pauses_everything_until_cleared() {
    let server = spawn_server(vec![show_fixture()]).await;
    server.get(&format!("/start/{SHOW_HASH}")).await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let (status, body) = server.get_json("/network/metered?value=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metered"], true);
    server.wait_for_status(SHOW_HASH, "paused").await;

    let (_, body) = server.get_json("/network/metered?value=false").await;
    assert_eq!(body["metered"], false);
    server.wait_for_status(SHOW_HASH, "ready").await;
}

#[tokio::test]
async fn metered_without_value_is_rejected() {
    let server = spawn_server(vec![]).await;
    let response = server.get("/network/metered").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stop_removes_torrent_and_files() {
    let server = spawn_server(vec![show_fixture()]).await;
    server.get(&format!("/start/{SHOW_HASH}")).await;
    server.wait_for_status(SHOW_HASH, "ready").await;
    assert!(server.save_dir(SHOW_HASH).exists());

    let (status, body) = server.get_json(&format!("/stop/{SHOW_HASH}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "removed");
    assert_eq!(body["hash"], SHOW_HASH);

    let (status, body) = server.get_json(&format!("/status/{SHOW_HASH}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_started");
    assert_eq!(body["fileName"], Value::Null);
    assert!(!server.save_dir(SHOW_HASH).exists());
}

#[tokio::test]
async fn pause_route_pauses() {
    let server = spawn_server(vec![show_fixture()]).await;
    server.get(&format!("/start/{SHOW_HASH}")).await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let (status, body) = server.get_json(&format!("/pause/{SHOW_HASH}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paused");
    server.wait_for_status(SHOW_HASH, "paused").await;
}

#[tokio::test]
async fn proxy_for_unknown_torrent_is_404() {
    let server = spawn_server(vec![]).await;
    let response = server
        .get("/proxy/0000000000000000000000000000000000000000")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn proxy_without_metadata_times_out_to_503() {
    let slow = SwarmFixture::new(
        InfoHash::from_hex(SHOW_HASH).unwrap(),
        256 * 1024,
        vec![FixtureFile::new("slow.mkv", 1024)],
    )
    .with_metadata_delay(Duration::from_secs(30));
    let server = spawn_server_with(vec![slow], |config| {
        config.engine.metadata_wait_timeout = Duration::from_millis(300);
    })
    .await;

    server.get(&format!("/start/{SHOW_HASH}")).await;
    let response = server.get(&format!("/proxy/{SHOW_HASH}")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn proxy_for_errored_torrent_is_500() {
    let server = spawn_server(vec![show_fixture()]).await;
    server.get(&format!("/start/{SHOW_HASH}")).await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let hash = InfoHash::from_hex(SHOW_HASH).unwrap();
    server.session.inject_error(hash, "swarm collapsed").await;
    server.wait_for_status(SHOW_HASH, "error").await;

    let response = server.get(&format!("/proxy/{SHOW_HASH}")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_route_is_404_with_uri() {
    let server = spawn_server(vec![]).await;
    let (status, body) = server.get_json("/definitely/not/here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["uri"], "/definitely/not/here");
}

#[tokio::test]
async fn malformed_hash_is_400() {
    let server = spawn_server(vec![]).await;
    for path in ["/start/nothex", "/status/abc123", "/proxy/abcd"] {
        let response = server.get(path).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    }
}

#[tokio::test]
async fn options_preflight_succeeds_everywhere() {
    let server = spawn_server(vec![]).await;
    let proxy_path = format!("/proxy/{SHOW_HASH}");
    for path in ["/status/check", proxy_path.as_str(), "/nowhere"] {
        let response = server
            .client
            .request(reqwest::Method::OPTIONS, server.url(path))
            .header("Origin", "http://localhost:3000")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(response.content_length().unwrap_or(0), 0);
    }
}

#[tokio::test]
async fn responses_carry_cors_allow_origin() {
    let server = spawn_server(vec![]).await;
    let response = server
        .client
        .get(server.url("/status/check"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"]
            .to_str()
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn start_is_idempotent_over_http() {
    let server = spawn_server(vec![show_fixture()]).await;
    server.get(&format!("/start/{SHOW_HASH}")).await;
    server.wait_for_status(SHOW_HASH, "ready").await;

    let (status, body) = server.get_json(&format!("/start/{SHOW_HASH}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    let again = server.wait_for_status(SHOW_HASH, "ready").await;
    assert_eq!(again["metadataReady"], true);
    // Engine still tracks a single live torrent for the hash.
    assert!(server.engine.state(InfoHash::from_hex(SHOW_HASH).unwrap())
        .await
        .unwrap()
        .is_some());
}
