//! Listeners for the RPC module.
//!
//! Inside an enclave the only channel to the host is vsock; the host runs the HTTP proxy in
//! [`crate::run_proxy`]. Outside an enclave the module is served over HTTP directly.

mod config;
pub use config::{
    DEFAULT_HTTP_BODY_LIMIT, DEFAULT_HTTP_PORT, DEFAULT_PROXY_PORT, DEFAULT_VSOCK_CID,
    DEFAULT_VSOCK_PORT, HTTP_BODY_LIMIT_ENV, TransportConfig,
};

mod http;
pub use self::http::serve_http;

mod vsock;
pub use self::vsock::{RequestReader, VSOCK_READ_TIMEOUT, serve_vsock};
