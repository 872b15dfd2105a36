//! Command line for the enclave and its host proxy.

use std::time::Duration;

use clap::{Parser, Subcommand};
use rollup_enclave_server::{
    EnclaveConfig, LaunchConfig, ProxyConfig, TransportConfig,
    config::DEFAULT_REQUEST_TIMEOUT,
    transport::{
        DEFAULT_HTTP_BODY_LIMIT, DEFAULT_HTTP_PORT, DEFAULT_PROXY_PORT, DEFAULT_VSOCK_CID,
        DEFAULT_VSOCK_PORT,
    },
};

use crate::logging::LogArgs;

/// Rollup enclave.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub(crate) struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the enclave server.
    Nitro(NitroArgs),
    /// Run the host-side HTTP-to-vsock proxy.
    Proxy(ProxyArgs),
}

#[derive(Debug, Parser)]
struct NitroArgs {
    /// HTTP port, used when vsock cannot be bound.
    #[arg(long, env = "OP_ENCLAVE_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    http_port: u16,

    /// Vsock port to listen on.
    #[arg(long, env = "OP_ENCLAVE_VSOCK_PORT", default_value_t = DEFAULT_VSOCK_PORT)]
    vsock_port: u32,

    /// Maximum request body size in bytes.
    #[arg(long, env = "OP_ENCLAVE_HTTP_BODY_LIMIT", default_value_t = DEFAULT_HTTP_BODY_LIMIT)]
    http_body_limit: u32,

    /// Per-request timeout in seconds.
    #[arg(
        long = "request-timeout",
        env = "OP_ENCLAVE_REQUEST_TIMEOUT",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs()
    )]
    request_timeout_secs: u64,

    /// Exit instead of falling back to local mode when no hardware module answers.
    #[arg(long, env = "OP_ENCLAVE_REQUIRE_HARDWARE")]
    require_hardware: bool,

    /// Allow `--signer-key` on hosts without a hardware module. Never use in production.
    #[arg(long, env = "OP_ENCLAVE_INSECURE_LOCAL_MODE")]
    insecure_local_mode: bool,

    /// Hex secp256k1 key to sign with instead of a generated one.
    #[arg(long, env = "OP_ENCLAVE_SIGNER_KEY", hide_env_values = true)]
    signer_key: Option<String>,
}

#[derive(Debug, Parser)]
struct ProxyArgs {
    /// Vsock CID of the enclave.
    #[arg(long, env = "VSOCK_CID", default_value_t = DEFAULT_VSOCK_CID)]
    vsock_cid: u32,

    /// Vsock port to connect to.
    #[arg(long, env = "VSOCK_PORT", default_value_t = DEFAULT_VSOCK_PORT)]
    vsock_port: u32,

    /// HTTP port to listen on.
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_PROXY_PORT)]
    http_port: u16,
}

impl TryFrom<Cli> for LaunchConfig {
    type Error = eyre::Report;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        match cli.command {
            Command::Nitro(args) => {
                if args.request_timeout_secs == 0 {
                    eyre::bail!("request timeout must be at least one second");
                }
                if args.http_body_limit == 0 {
                    eyre::bail!("HTTP body limit must be non-zero");
                }
                Ok(Self::Nitro {
                    enclave: EnclaveConfig {
                        require_hardware: args.require_hardware,
                        insecure_local_mode: args.insecure_local_mode,
                        signer_key: args.signer_key,
                        request_timeout: Duration::from_secs(args.request_timeout_secs),
                    },
                    transport: TransportConfig::new(
                        args.vsock_port,
                        args.http_port,
                        args.http_body_limit,
                    ),
                })
            }
            Command::Proxy(args) => Ok(Self::Proxy(ProxyConfig {
                vsock_cid: args.vsock_cid,
                vsock_port: args.vsock_port,
                http_port: args.http_port,
            })),
        }
    }
}

impl Cli {
    /// Installs logging and runs the selected subcommand.
    pub(crate) async fn run(self) -> eyre::Result<()> {
        self.log.init()?;
        let config = LaunchConfig::try_from(self)?;
        tracing::info!(?config, "starting");
        config.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(args: &[&str]) -> eyre::Result<LaunchConfig> {
        let cli = Cli::try_parse_from(std::iter::once("rollup-enclave").chain(args.iter().copied()))?;
        LaunchConfig::try_from(cli)
    }

    #[test]
    fn nitro_flags_map_onto_configs() {
        let config = launch(&[
            "nitro",
            "--vsock-port",
            "5000",
            "--http-port",
            "8545",
            "--http-body-limit",
            "1024",
            "--request-timeout",
            "30",
            "--require-hardware",
        ])
        .unwrap();
        let LaunchConfig::Nitro { enclave, transport } = config else {
            panic!("expected nitro");
        };
        assert!(enclave.require_hardware);
        assert!(!enclave.insecure_local_mode);
        assert!(enclave.signer_key.is_none());
        assert_eq!(enclave.request_timeout, Duration::from_secs(30));
        assert_eq!((transport.vsock_port, transport.http_port), (5000, 8545));
        assert_eq!(transport.http_body_limit, 1024);
    }

    #[test]
    fn signer_key_and_local_mode() {
        let config =
            launch(&["nitro", "--insecure-local-mode", "--signer-key", "0xabcd"]).unwrap();
        let LaunchConfig::Nitro { enclave, .. } = config else {
            panic!("expected nitro");
        };
        assert!(enclave.insecure_local_mode);
        assert_eq!(enclave.signer_key.as_deref(), Some("0xabcd"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(launch(&["nitro", "--request-timeout", "0"]).is_err());
    }

    #[test]
    fn proxy_flags() {
        let config = launch(&["proxy", "--vsock-cid", "3", "--http-port", "9000"]).unwrap();
        let LaunchConfig::Proxy(proxy) = config else {
            panic!("expected proxy");
        };
        assert_eq!(
            proxy,
            ProxyConfig { vsock_cid: 3, vsock_port: DEFAULT_VSOCK_PORT, http_port: 9000 }
        );
    }

    #[test]
    fn global_log_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["rollup-enclave", "proxy", "-vv", "--log-format", "json"])
            .unwrap();
        assert_eq!(cli.log.verbosity, 2);
    }
}
