//! Subscriber setup.

use clap::{ArgAction, Args, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Stdout log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Timestamp, level, target and fields.
    #[default]
    Full,
    /// Level and message only.
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging flags shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub(crate) struct LogArgs {
    /// Raise verbosity above INFO (-v DEBUG, -vv TRACE).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub(crate) verbosity: u8,

    /// Stdout log format.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Full, global = true)]
    pub(crate) format: LogFormat,
}

impl LogArgs {
    /// The level used when `RUST_LOG` is unset.
    pub(crate) const fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Installs the global subscriber. `RUST_LOG` directives override the default level.
    pub(crate) fn init(&self) -> eyre::Result<()> {
        let filter = EnvFilter::builder().with_default_directive(self.level().into()).from_env_lossy();
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = match self.format {
            LogFormat::Full => builder.try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.map_err(|e| eyre::eyre!("failed to initialize tracing subscriber: {e}"))
    }
}
