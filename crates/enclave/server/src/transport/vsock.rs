//! Vsock JSON-RPC listener.
//!
//! A connection carries JSON-RPC requests back to back, each answered before the next is
//! read. There is no framing beyond the JSON values themselves.

use std::{
    io::{self, Read},
    mem,
    time::Duration,
};

use jsonrpsee::server::Methods;
use serde::de::IgnoredAny;

use super::TransportConfig;

/// How long a connection may sit idle mid-request or between requests.
pub const VSOCK_READ_TIMEOUT: Duration = Duration::from_secs(300);

const READ_CHUNK: usize = 64 * 1024;

/// Splits a byte stream into complete JSON values.
#[derive(Debug)]
pub struct RequestReader<R> {
    inner: R,
    buf: Vec<u8>,
    limit: usize,
}

impl<R: Read> RequestReader<R> {
    /// Reads from `inner`, rejecting any request over `limit` bytes.
    pub const fn new(inner: R, limit: usize) -> Self {
        Self { inner, buf: Vec::new(), limit }
    }

    /// The underlying stream, for writing responses.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// The next complete request, or `None` on a clean EOF between requests.
    ///
    /// Malformed JSON and oversized requests are [`io::ErrorKind::InvalidData`]; EOF inside a
    /// request is [`io::ErrorKind::UnexpectedEof`].
    pub fn next_request(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            if self.may_be_complete()
                && let Some(end) = complete_value(&self.buf)?
            {
                let rest = self.buf.split_off(end);
                return Ok(Some(mem::replace(&mut self.buf, rest)));
            }
            if self.buf.len() > self.limit {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("request exceeds {} bytes", self.limit),
                ));
            }

            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                if self.buf.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-request",
                ));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Requests end with `}` (single call) or `]` (batch).
    fn may_be_complete(&self) -> bool {
        matches!(self.buf.iter().rev().find(|b| !b.is_ascii_whitespace()), Some(b'}' | b']'))
    }
}

/// End offset of the first JSON value in `buf`, if it is complete.
fn complete_value(buf: &[u8]) -> io::Result<Option<usize>> {
    let mut values = serde_json::Deserializer::from_slice(buf).into_iter::<IgnoredAny>();
    match values.next() {
        Some(Ok(_)) => Ok(Some(values.byte_offset())),
        Some(Err(e)) if e.is_eof() => Ok(None),
        None => Ok(None),
        Some(Err(e)) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

fn error_response(code: i32, message: impl std::fmt::Display) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message.to_string() },
        "id": null,
    })
    .to_string()
}

/// Serves `methods` on the vsock port until the listener fails.
///
/// Returns an error straight away if the port cannot be bound, so the caller can fall back.
#[cfg(unix)]
pub async fn serve_vsock(methods: Methods, config: &TransportConfig) -> eyre::Result<()> {
    use tokio::runtime::Handle;
    use tracing::info;
    use vsock::{VMADDR_CID_ANY, VsockAddr, VsockListener};

    let listener = VsockListener::bind(&VsockAddr::new(VMADDR_CID_ANY, config.vsock_port))?;
    info!(port = config.vsock_port, body_limit = config.http_body_limit, "listening on vsock");

    let limit = config.http_body_limit as usize;
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || accept_loop(&listener, &methods, limit, &handle)).await?;
    Ok(())
}

/// Vsock needs a Unix host.
#[cfg(not(unix))]
pub async fn serve_vsock(_methods: Methods, _config: &TransportConfig) -> eyre::Result<()> {
    Err(eyre::eyre!("vsock is not supported on this platform"))
}

#[cfg(unix)]
fn accept_loop(
    listener: &vsock::VsockListener,
    methods: &Methods,
    limit: usize,
    handle: &tokio::runtime::Handle,
) {
    use tracing::{debug, warn};

    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "vsock accept failed");
                continue;
            }
        };
        if let Err(e) = stream.set_read_timeout(Some(VSOCK_READ_TIMEOUT)) {
            warn!(error = %e, "failed to set vsock read timeout");
        }
        if let Ok(peer) = stream.peer_addr() {
            debug!(cid = peer.cid(), port = peer.port(), "accepted vsock connection");
        }

        let methods = methods.clone();
        let runtime = handle.clone();
        handle.spawn_blocking(move || {
            serve_connection(RequestReader::new(stream, limit), &methods, &runtime);
        });
    }
}

#[cfg(unix)]
fn serve_connection<S: Read + io::Write>(
    mut reader: RequestReader<S>,
    methods: &Methods,
    runtime: &tokio::runtime::Handle,
) {
    use std::io::Write;

    use tracing::{debug, warn};

    loop {
        let response = match reader.next_request() {
            Ok(Some(request)) => dispatch(methods, runtime, &request),
            Ok(None) => {
                debug!("vsock connection closed");
                return;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %e, "rejecting vsock request");
                let _ = reader.get_mut().write_all(error_response(-32700, e).as_bytes());
                return;
            }
            Err(e) => {
                warn!(error = %e, "vsock read failed");
                return;
            }
        };
        if let Err(e) = reader.get_mut().write_all(response.as_bytes()) {
            warn!(error = %e, "vsock write failed");
            return;
        }
    }
}

fn dispatch(methods: &Methods, runtime: &tokio::runtime::Handle, request: &[u8]) -> String {
    let Ok(request) = std::str::from_utf8(request) else {
        return error_response(-32700, "request is not UTF-8");
    };
    match runtime.block_on(methods.raw_json_request(request, 1)) {
        Ok((response, _)) => response.to_string(),
        Err(e) => error_response(-32700, e),
    }
}
