//! Listener settings.

use std::env;

/// Port the enclave listens on over vsock.
pub const DEFAULT_VSOCK_PORT: u32 = 1234;

/// Port the enclave listens on over HTTP when vsock is unavailable.
pub const DEFAULT_HTTP_PORT: u16 = 1234;

/// Port the host proxy listens on.
pub const DEFAULT_PROXY_PORT: u16 = 7333;

/// Enclave CID as seen from the host.
pub const DEFAULT_VSOCK_CID: u32 = 16;

/// Request size limit (50 MiB); witnesses for busy blocks exceed the usual 5 MiB.
pub const DEFAULT_HTTP_BODY_LIMIT: u32 = 50 * 1024 * 1024;

/// Environment override for [`DEFAULT_HTTP_BODY_LIMIT`].
pub const HTTP_BODY_LIMIT_ENV: &str = "OP_ENCLAVE_HTTP_BODY_LIMIT";

/// Transport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Vsock port to listen on.
    pub vsock_port: u32,
    /// HTTP port to listen on when vsock is unavailable.
    pub http_port: u16,
    /// Maximum request size in bytes, on either transport.
    pub http_body_limit: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            vsock_port: DEFAULT_VSOCK_PORT,
            http_port: DEFAULT_HTTP_PORT,
            http_body_limit: Self::http_body_limit_from_env(),
        }
    }
}

impl TransportConfig {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(vsock_port: u32, http_port: u16, http_body_limit: u32) -> Self {
        Self { vsock_port, http_port, http_body_limit }
    }

    /// The body limit from [`HTTP_BODY_LIMIT_ENV`], or the default when unset, unparsable or
    /// zero.
    #[must_use]
    pub fn http_body_limit_from_env() -> u32 {
        parse_body_limit(env::var(HTTP_BODY_LIMIT_ENV).ok().as_deref())
    }
}

fn parse_body_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse().ok()).filter(|&v| v > 0).unwrap_or(DEFAULT_HTTP_BODY_LIMIT)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, DEFAULT_HTTP_BODY_LIMIT)]
    #[case(Some("1048576"), 1_048_576)]
    #[case(Some(" 42 "), 42)]
    #[case(Some("0"), DEFAULT_HTTP_BODY_LIMIT)]
    #[case(Some("lots"), DEFAULT_HTTP_BODY_LIMIT)]
    fn body_limit(#[case] raw: Option<&str>, #[case] expected: u32) {
        assert_eq!(parse_body_limit(raw), expected);
    }

    #[test]
    fn new_keeps_values() {
        let config = TransportConfig::new(1, 2, 3);
        assert_eq!((config.vsock_port, config.http_port, config.http_body_limit), (1, 2, 3));
    }
}
