//! Host-side HTTP proxy.
//!
//! Accepts JSON-RPC over HTTP and relays each POST body to the enclave's vsock listener,
//! answering with whatever single JSON value comes back.

use std::{collections::VecDeque, net::SocketAddr, sync::Arc};

use http_body_util::{BodyExt, Full};
use hyper::{
    Method, Request, Response, StatusCode,
    body::{Bytes, Incoming},
    header::{CONTENT_TYPE, HeaderValue},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ProxyConfig;

/// Idle vsock connections kept for reuse.
const MAX_IDLE_CONNECTIONS: usize = 10;

/// Upper bound on a relayed response.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Idle vsock connections, reused most-recent-last.
#[derive(Debug)]
struct ConnectionPool<C> {
    idle: Mutex<VecDeque<C>>,
}

impl<C> ConnectionPool<C> {
    const fn new() -> Self {
        Self { idle: Mutex::new(VecDeque::new()) }
    }

    fn take(&self) -> Option<C> {
        self.idle.lock().pop_front()
    }

    /// Returns a healthy connection; dropped when the pool is full.
    fn give_back(&self, conn: C) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push_back(conn);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.idle.lock().len()
    }
}

fn response(status: StatusCode, body: Bytes, json: bool) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if json {
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    response
}

/// Sends `request` and reads back one JSON value.
fn exchange<C: std::io::Read + std::io::Write>(
    conn: &mut C,
    request: &[u8],
) -> std::io::Result<Vec<u8>> {
    conn.write_all(request)?;
    let mut reader = crate::transport::RequestReader::new(conn, MAX_RESPONSE_BYTES);
    reader.next_request()?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "enclave closed the connection")
    })
}

/// Runs the proxy until the TCP listener fails.
#[cfg(unix)]
pub async fn run(config: ProxyConfig) -> eyre::Result<()> {
    use vsock::{VsockAddr, VsockStream};

    let ProxyConfig { vsock_cid, vsock_port, http_port } = config;
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, vsock_cid, vsock_port, "proxying HTTP to vsock");

    let pool = Arc::new(ConnectionPool::<VsockStream>::new());
    let connect = move || VsockStream::connect(&VsockAddr::new(vsock_cid, vsock_port));

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted connection");

        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&pool), connect));
            if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await
            {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}

/// Vsock needs a Unix host.
#[cfg(not(unix))]
pub async fn run(_config: ProxyConfig) -> eyre::Result<()> {
    Err(eyre::eyre!("the vsock proxy is only supported on Unix platforms"))
}

async fn handle<C, F>(
    req: Request<Incoming>,
    pool: Arc<ConnectionPool<C>>,
    connect: F,
) -> Result<Response<Full<Bytes>>, hyper::Error>
where
    C: std::io::Read + std::io::Write + Send + 'static,
    F: Fn() -> std::io::Result<C> + Send + 'static,
{
    // Health checks and browsers get an empty 200.
    if req.method() != Method::POST {
        return Ok(response(StatusCode::OK, Bytes::new(), false));
    }

    let body = req.collect().await?.to_bytes();
    match tokio::task::spawn_blocking(move || forward(&pool, connect, &body)).await {
        Ok(Ok(data)) => Ok(response(StatusCode::OK, Bytes::from(data), true)),
        Ok(Err(e)) => {
            warn!(error = %e, "enclave request failed");
            Ok(response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new(), false))
        }
        Err(e) => {
            error!(error = %e, "forwarding task failed");
            Ok(response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new(), false))
        }
    }
}

/// Relays one request, retrying once on a fresh connection if a pooled one has gone stale.
fn forward<C, F>(pool: &ConnectionPool<C>, connect: F, request: &[u8]) -> std::io::Result<Vec<u8>>
where
    C: std::io::Read + std::io::Write,
    F: Fn() -> std::io::Result<C>,
{
    if let Some(mut conn) = pool.take() {
        match exchange(&mut conn, request) {
            Ok(data) => {
                pool.give_back(conn);
                return Ok(data);
            }
            Err(e) => debug!(error = %e, "dropping stale vsock connection"),
        }
    }

    let mut conn = connect()?;
    let data = exchange(&mut conn, request)?;
    pool.give_back(conn);
    Ok(data)
}
