//! HTTP upgrade handshake (RFC 6455 section 4).
//!
//! Runs once per connection, before it is marked Open. Reads the upgrade
//! request line by line from the socket, validates the required headers and
//! produces the `101 Switching Protocols` response.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this server negotiates.
pub const SUPPORTED_VERSION: u8 = 13;

/// Upper bound on a single header line, newline included.
pub const MAX_HEADER_LINE: usize = 1024;

/// Upper bound on the number of header lines in an upgrade request.
pub const MAX_HEADER_COUNT: usize = 64;

/// Computes the Sec-WebSocket-Accept value from the client's
/// Sec-WebSocket-Key: `base64(sha1(key + GUID))`.
///
/// # Example
///
/// ```
/// use wsrv::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// A validated WebSocket upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// The raw request line (`GET /path HTTP/1.1`), kept for the
    /// `on_connect` callback.
    pub request_line: String,
    /// The Host header value.
    pub host: String,
    /// The Origin header value, echoed back in the response.
    pub origin: String,
    /// The Sec-WebSocket-Key header value.
    pub key: String,
    /// The negotiated Sec-WebSocket-Version.
    pub version: u8,
}

/// Read one header line, byte by byte, until `\n` or the line cap.
async fn read_header_line<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = Vec::with_capacity(64);
    loop {
        let byte = reader.read_u8().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            _ => Error::Io(e.to_string()),
        })?;
        line.push(byte);
        if byte == b'\n' {
            break;
        }
        if line.len() == MAX_HEADER_LINE {
            return Err(Error::MalformedHeaderLine("line exceeds 1024 bytes".into()));
        }
    }
    String::from_utf8(line)
        .map_err(|_| Error::MalformedHeaderLine("line is not valid UTF-8".into()))
}

impl UpgradeRequest {
    /// Read and validate an upgrade request from the connection's byte
    /// stream.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the peer leaves mid-handshake
    /// - `Error::MalformedHeaderLine` for oversized or non-`key: value` lines
    /// - `Error::TooManyHeaders` past [`MAX_HEADER_COUNT`] lines
    /// - `Error::MissingHeader` when `sec-websocket-version`,
    ///   `sec-websocket-key`, `host` or `origin` is absent
    /// - `Error::UnsupportedVersion` for anything other than version 13
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let request_line = read_header_line(reader).await?;
        debug!(request = %request_line.trim_end(), "upgrade request");

        let mut headers: HashMap<String, String> = HashMap::new();
        loop {
            if headers.len() > MAX_HEADER_COUNT {
                return Err(Error::TooManyHeaders {
                    count: headers.len(),
                    max: MAX_HEADER_COUNT,
                });
            }
            let line = read_header_line(reader).await?;
            if line == "\r\n" || line == "\n" {
                break;
            }
            let trimmed = line.trim();
            // Split on the first colon only; values may contain colons.
            match trimmed.split_once(':') {
                Some((key, value)) => {
                    headers.insert(key.trim().to_lowercase(), value.trim().to_string());
                }
                None => {
                    return Err(Error::MalformedHeaderLine(trimmed.to_string()));
                }
            }
        }

        let required = |name: &str| -> Result<String> {
            headers
                .get(name)
                .cloned()
                .ok_or_else(|| Error::MissingHeader(name.to_string()))
        };
        let version_str = required("sec-websocket-version")?;
        let key = required("sec-websocket-key")?;
        let host = required("host")?;
        let origin = required("origin")?;

        let version: u8 = version_str
            .parse()
            .map_err(|_| Error::UnsupportedVersion(version_str.clone()))?;
        if version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version_str));
        }

        for (name, value) in &headers {
            debug!(header = %name, value = %value, "received header");
        }

        Ok(Self {
            request_line,
            host,
            origin,
            key,
            version,
        })
    }

    /// Build the `101 Switching Protocols` response, echoing Origin, Host
    /// and the negotiated version.
    #[must_use]
    pub fn response(&self) -> Bytes {
        let accept = compute_accept_key(&self.key);
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Origin: {}\r\n\
             Sec-WebSocket-Location: ws://{}\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             Sec-WebSocket-Version: {}\r\n\
             \r\n",
            self.origin, self.host, accept, self.version
        );
        Bytes::from(response)
    }
}
