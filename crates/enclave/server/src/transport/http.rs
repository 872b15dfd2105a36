//! HTTP JSON-RPC listener.

use std::net::SocketAddr;

use jsonrpsee::server::{Methods, ServerBuilder, ServerConfig};
use tracing::info;

use super::TransportConfig;

/// Serves `methods` over HTTP on all interfaces until the server stops.
pub async fn serve_http(methods: Methods, config: &TransportConfig) -> eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let server_config =
        ServerConfig::builder().max_request_body_size(config.http_body_limit).build();
    let server = ServerBuilder::with_config(server_config).build(addr).await?;

    info!(addr = %server.local_addr()?, body_limit = config.http_body_limit, "listening on HTTP");
    let handle = server.start(methods);
    handle.stopped().await;
    Ok(())
}
