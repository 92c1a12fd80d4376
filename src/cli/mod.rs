//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Skycam - HTTP service for ZWO ASI cameras.
///
/// Serves live MJPEG, long-exposure JPEG snapshots and runtime camera
/// settings over a small JSON API.
#[derive(Parser, Debug)]
#[command(name = "skycam", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: <config dir>/skycam/config.toml)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, default_value = "auto")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Log output selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Pretty on a terminal, compact otherwise
    #[default]
    Auto,
    /// JSON lines
    Json,
    /// Compact plain text
    Compact,
}

impl LogFormat {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP camera service
    Serve(ServeArgs),

    /// List attached cameras without opening them
    Probe(SdkArgs),

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Camera backend selection shared by `serve` and `probe`.
#[derive(Args, Debug, Clone, Default)]
pub struct SdkArgs {
    /// Path to libASICamera2 (repeatable, tried first)
    #[arg(long = "sdk-lib", value_name = "PATH", env = "ASI_SDK_LIB", value_delimiter = ',')]
    pub sdk_lib: Vec<PathBuf>,

    /// Use a simulated camera instead of the SDK
    #[arg(long)]
    pub mock: bool,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Bind address [config: server.bind, default 0.0.0.0]
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on [config: server.port, default 8080]
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Do not open the camera at startup
    #[arg(long)]
    pub no_connect: bool,

    #[command(flatten)]
    pub sdk: SdkArgs,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
