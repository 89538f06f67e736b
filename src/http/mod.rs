//! # HTTP Delivery Module
//!
//! Minimal HTTP/1.1 POST client used to deliver position reports.
//!
//! The report protocol needs exactly one interaction: open a connection,
//! write a JSON body, read the status line, close. There is no keep-alive,
//! no redirect handling, and no response body consumption, so the client is
//! a direct `TcpStream` exchange rather than a full HTTP stack.

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::error::{FleetBeaconError, Result};

pub mod client_trait;
pub use client_trait::HttpClient;

/// Connect and read deadlines for one POST exchange
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl HttpTimeouts {
    /// Build timeouts from millisecond configuration values
    pub fn from_millis(connect_ms: u64, read_ms: u64) -> Self {
        Self {
            connect: Duration::from_millis(connect_ms),
            read: Duration::from_millis(read_ms),
        }
    }
}

/// Decomposed `http://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Parse a plain `http://host[:port][/path]` URL
///
/// Only the `http` scheme is supported; the report endpoint is a plain
/// unauthenticated HTTP service. Port defaults to 80, path to `/`.
///
/// # Errors
///
/// Returns `InvalidUrl` for non-`http` schemes, an empty host, or an
/// unparseable port.
pub fn parse_url(url: &str) -> Result<ParsedUrl> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| FleetBeaconError::InvalidUrl(format!("{} (expected http:// scheme)", url)))?;

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| {
                FleetBeaconError::InvalidUrl(format!("{} (bad port)", url))
            })?;
            (host, port)
        }
        None => (authority, 80),
    };

    if host.is_empty() {
        return Err(FleetBeaconError::InvalidUrl(format!("{} (missing host)", url)));
    }

    Ok(ParsedUrl {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Assemble the request head for a JSON POST
fn build_request_head(url: &ParsedUrl, body_len: usize) -> String {
    format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}:{}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        url.path, url.host, url.port, body_len
    )
}

/// Extract the numeric status code from an HTTP status line
fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => {
            code.parse().map_err(|_| {
                FleetBeaconError::Http(format!("malformed status line: {}", line))
            })
        }
        _ => Err(FleetBeaconError::Http(format!(
            "malformed status line: {}",
            line
        ))),
    }
}

/// HTTP client over a tokio TCP connection
///
/// One connection per report: connect (bounded by the connect timeout),
/// write the request, read the status line (bounded by the read timeout),
/// drop the connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioHttpClient;

impl TokioHttpClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl HttpClient for TokioHttpClient {
    async fn post_json(&self, url: &str, body: &[u8], timeouts: &HttpTimeouts) -> Result<u16> {
        let parsed = parse_url(url)?;
        let addr = format!("{}:{}", parsed.host, parsed.port);

        let mut stream = timeout(timeouts.connect, TcpStream::connect(&addr))
            .await
            .map_err(|_| FleetBeaconError::Http(format!("connect to {} timed out", addr)))?
            .map_err(|e| FleetBeaconError::Http(format!("connect to {} failed: {}", addr, e)))?;

        // Head and body go out in a single write
        let head = build_request_head(&parsed, body.len());
        let mut request = BytesMut::with_capacity(head.len() + body.len());
        request.extend_from_slice(head.as_bytes());
        request.extend_from_slice(body);

        stream
            .write_all(&request)
            .await
            .map_err(|e| FleetBeaconError::Http(format!("write to {} failed: {}", addr, e)))?;
        stream
            .flush()
            .await
            .map_err(|e| FleetBeaconError::Http(format!("flush to {} failed: {}", addr, e)))?;

        let mut reader = BufReader::new(stream);
        let mut status_line = String::new();
        timeout(timeouts.read, reader.read_line(&mut status_line))
            .await
            .map_err(|_| FleetBeaconError::Http(format!("response from {} timed out", addr)))?
            .map_err(|e| FleetBeaconError::Http(format!("read from {} failed: {}", addr, e)))?;

        let status = parse_status_line(status_line.trim_end())?;
        debug!("POST {} -> {}", url, status);

        Ok(status)
    }
}
