//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths (playlists, media files, slide images) with
//! `200`, everything else with `404`. Bodies can be trickled out in chunks
//! to exercise fetch time limits. Request counts per path are recorded.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct MediaServerOptions {
    pub chunk_size: usize,
    /// Pause before each chunk of a body.
    pub chunk_delay: Duration,
    /// Go silent for the given time once this many body bytes are out.
    pub stall_after: Option<(usize, Duration)>,
}

impl Default for MediaServerOptions {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            chunk_delay: Duration::ZERO,
            stall_after: None,
        }
    }
}

pub struct MediaServer {
    /// e.g. "http://127.0.0.1:12345" (no trailing slash).
    pub base: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl MediaServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

/// Starts a server in a background thread serving `routes` (path → body).
/// The server runs until the process exits.
pub fn start(routes: HashMap<String, Vec<u8>>) -> MediaServer {
    start_with_options(routes, MediaServerOptions::default())
}

pub fn start_with_options(routes: HashMap<String, Vec<u8>>, opts: MediaServerOptions) -> MediaServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&server_hits);
            thread::spawn(move || handle(stream, &routes, &hits, opts));
        }
    });
    MediaServer {
        base: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Vec<u8>>,
    hits: &Mutex<HashMap<String, usize>>,
    opts: MediaServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target).to_string();
    *hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }
    let Some(body) = routes.get(&path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let chunk_size = match opts.stall_after {
        Some((at, _)) => opts.chunk_size.min(at).max(1),
        None => opts.chunk_size.max(1),
    };
    let mut sent = 0;
    let mut stalled = false;
    for chunk in body.chunks(chunk_size) {
        if let Some((at, pause)) = opts.stall_after {
            if sent >= at && !stalled {
                stalled = true;
                thread::sleep(pause);
            }
        }
        if !opts.chunk_delay.is_zero() {
            thread::sleep(opts.chunk_delay);
        }
        if stream.write_all(chunk).is_err() || stream.flush().is_err() {
            return;
        }
        sent += chunk.len();
    }
}
