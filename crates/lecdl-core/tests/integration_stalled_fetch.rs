//! Integration test: a server that goes silent mid-body cannot hold a
//! media fetch past its time limit.

mod common;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lecdl_core::config::HttpConfig;
use lecdl_core::fetch::fetch_direct;
use lecdl_core::http::CurlClient;
use lecdl_core::storage::{artifact_state, temp_path, ArtifactState};
use tempfile::tempdir;

use common::media_server::{self, MediaServerOptions};

#[test]
fn stalled_server_is_cut_at_the_limit() {
    let mut routes = HashMap::new();
    routes.insert("/media/stall.mp4".to_string(), vec![9u8; 20]);
    let server = media_server::start_with_options(
        routes,
        MediaServerOptions {
            chunk_size: 10,
            stall_after: Some((10, Duration::from_secs(8))),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let dest = dir.path().join("stall.mp4");
    let client = CurlClient::new(&HttpConfig::default());

    let started = Instant::now();
    let out = fetch_direct(
        &client,
        &server.url("/media/stall.mp4"),
        &dest,
        Duration::from_millis(500),
    )
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    assert!(out.partial);
    assert_eq!(out.bytes, 10);
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 10);
    assert_eq!(artifact_state(&dest), ArtifactState::Partial);
    assert!(!temp_path(&dest).exists());
}

#[test]
fn unknown_media_leaves_no_temp_file() {
    let server = media_server::start(HashMap::new());
    let dir = tempdir().unwrap();
    let dest = dir.path().join("gone.mp4");
    let client = CurlClient::new(&HttpConfig::default());

    let err = fetch_direct(
        &client,
        &server.url("/media/gone.mp4"),
        &dest,
        Duration::from_secs(5),
    )
    .unwrap_err();

    assert!(format!("{err:#}").contains("gone.mp4"));
    assert!(!dest.exists());
    assert!(!temp_path(&dest).exists());
}
