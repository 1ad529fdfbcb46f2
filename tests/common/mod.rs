//! Shared fixtures: loopback HTTP servers and temp files.
#![allow(dead_code)]

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bwstats::StreamConfig;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Small buffer and fast retries so tests exercise refills without waiting.
pub fn test_config(buffer_size: usize) -> StreamConfig {
    StreamConfig {
        buffer_size,
        max_attempts: 3,
        backoff_ms: 1,
        readiness_timeout_secs: 5,
    }
}

pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

fn range_start(headers: &HeaderMap) -> usize {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.trim_end_matches('-').parse().ok())
        .unwrap_or(0)
}

async fn serve_range(State(data): State<Arc<Vec<u8>>>, headers: HeaderMap) -> Response {
    let start = range_start(&headers);
    let total = data.len();
    if start >= total {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", total))],
        )
            .into_response();
    }
    (
        StatusCode::PARTIAL_CONTENT,
        [(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, total - 1, total),
        )],
        data[start..].to_vec(),
    )
        .into_response()
}

/// Serve `data` at `/signal.bw` with range support; returns the base URL.
pub async fn range_server(data: Vec<u8>) -> String {
    let app = Router::new()
        .route("/signal.bw", get(serve_range))
        .with_state(Arc::new(data));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> u64 {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8_lossy(&request);
    text.lines()
        .find_map(|line| line.strip_prefix("Range: bytes="))
        .and_then(|v| v.trim_end_matches('-').parse().ok())
        .unwrap_or(0)
}

/// Hand-rolled server: `respond(start, data)` builds the full response bytes,
/// and the connection is closed after writing them.
pub async fn raw_server(data: Vec<u8>, respond: fn(u64, &[u8]) -> Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_raw(listener, data, respond);
    format!("http://{}", addr)
}

/// Same as [`raw_server`] on `[::1]`, or `None` if the host has no IPv6 loopback.
pub async fn raw_server_v6(data: Vec<u8>, respond: fn(u64, &[u8]) -> Vec<u8>) -> Option<String> {
    let listener = TcpListener::bind("[::1]:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    serve_raw(listener, data, respond);
    Some(format!("http://{}", addr))
}

fn serve_raw(listener: TcpListener, data: Vec<u8>, respond: fn(u64, &[u8]) -> Vec<u8>) {
    let data = Arc::new(data);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            let data = data.clone();
            tokio::spawn(async move {
                let start = read_request(&mut socket).await;
                let response = respond(start, &data);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Accepts connections and never answers.
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
