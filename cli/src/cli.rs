//! # CLI Interface
//!
//! Defines the command-line argument structure for `ignition` using
//! `clap` derive. Subcommands: `venues`, `manifest open|close|mint`,
//! `positions` and `version`.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Ignition liquidity protocol client.
///
/// Lists configured venues, prints transaction manifests for an external
/// signer, and reads open positions from a Radix Gateway.
#[derive(Parser, Debug)]
#[command(
    name = "ignition",
    about = "Ignition liquidity protocol client",
    version,
    propagate_version = true
)]
pub struct IgnitionCli {
    /// Path to the protocol configuration bundle (JSON).
    #[arg(long, short = 'c', env = "IGNITION_CONFIG", default_value = "config.json", global = true)]
    pub config: PathBuf,

    /// Log output format. Logs go to stderr.
    #[arg(
        long,
        env = "IGNITION_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    /// More log detail: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List venues, their pools and the offered lockup periods.
    Venues(VenuesArgs),
    /// Print a transaction manifest to stdout.
    #[command(subcommand)]
    Manifest(ManifestCommand),
    /// Show the open positions of an account.
    Positions(PositionsArgs),
    /// Print version information and exit.
    Version,
}

/// How results are printed.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns for humans.
    Table,
    /// One JSON document.
    Json,
}

/// Arguments for the `venues` subcommand.
#[derive(Args, Debug)]
pub struct VenuesArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Manifest kinds.
#[derive(Subcommand, Debug)]
pub enum ManifestCommand {
    /// Contribute a resource to a venue pool for a lockup period.
    Open(OpenArgs),
    /// Redeem a liquidity receipt.
    Close(CloseArgs),
    /// Mint test resources (test networks only).
    Mint(MintArgs),
}

/// Arguments for `manifest open`.
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Account that pays and receives the receipt.
    #[arg(long)]
    pub account: String,

    /// Logical venue name, e.g. `Caviarnine`.
    #[arg(long)]
    pub venue: String,

    /// Address of the resource to contribute.
    #[arg(long)]
    pub resource: String,

    /// Amount to contribute. `,` and `_` separators are accepted.
    #[arg(long)]
    pub amount: String,

    /// Lockup period in seconds; see `ignition venues` for offered values.
    #[arg(long)]
    pub lockup: u64,
}

/// Arguments for `manifest close`.
#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Account holding the receipt.
    #[arg(long)]
    pub account: String,

    /// Receipt resource address.
    #[arg(long)]
    pub receipt_resource: String,

    /// Local id of the receipt, e.g. `#1#`.
    #[arg(long)]
    pub id: String,
}

/// Arguments for `manifest mint`.
#[derive(Args, Debug)]
pub struct MintArgs {
    /// Account that receives the minted resource.
    #[arg(long)]
    pub account: String,

    /// Resource to mint.
    #[arg(long)]
    pub resource: String,
}

/// Arguments for the `positions` subcommand.
#[derive(Args, Debug)]
pub struct PositionsArgs {
    /// Account to inspect.
    #[arg(long)]
    pub account: String,

    /// Gateway base URL. Defaults to the public gateway of the configured
    /// network.
    #[arg(long, env = "IGNITION_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}
