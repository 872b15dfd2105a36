//! JSON-RPC surface.

mod api;
pub use api::{EnclaveApiClient, EnclaveApiServer};

mod server;
pub use server::{RpcServerImpl, to_rpc_error};
