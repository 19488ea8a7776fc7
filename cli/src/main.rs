// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ignition CLI
//!
//! Entry point for the `ignition` binary. Parses CLI arguments, initializes
//! logging, loads the protocol configuration and runs one subcommand:
//!
//! - `venues`                  list venues, pools and lockup periods
//! - `manifest open|close|mint` print a transaction manifest to stdout
//! - `positions`               show an account's open positions
//! - `version`                 print build version information
//!
//! Manifests are printed, not signed: pipe them into a wallet or signer.

mod cli;
mod logging;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ignition_client::config::{gateway_url_for_network, network_name};
use ignition_client::manifest::{plan_close_position, plan_mint, plan_open_position};
use ignition_client::positions::fetch_positions;
use ignition_client::{
    BootstrapInformation, ConfigurationResolver, GatewayClient, OpenPositionIntent,
};

use cli::{Commands, IgnitionCli, ManifestCommand, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = IgnitionCli::parse();

    logging::init_logging(cli.verbose, cli.log_format);

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let resolver = load_resolver(&cli.config)?;

    match cli.command {
        Commands::Venues(args) => {
            match args.format {
                OutputFormat::Table => print!("{}", render::venues_table(&resolver)),
                OutputFormat::Json => print_json(&render::venues_json(&resolver))?,
            }
            Ok(())
        }
        Commands::Manifest(command) => print_manifest(&resolver, command),
        Commands::Positions(args) => show_positions(&resolver, args).await,
        Commands::Version => Ok(()),
    }
}

/// Reads and validates the configuration bundle.
fn load_resolver(path: &std::path::Path) -> Result<ConfigurationResolver> {
    let bootstrap = BootstrapInformation::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    let resolver = ConfigurationResolver::new(bootstrap).context("invalid configuration")?;

    tracing::info!(
        network = %network_name(resolver.network_id()),
        venues = resolver.venue_count(),
        "configuration loaded"
    );
    Ok(resolver)
}

fn print_manifest(resolver: &ConfigurationResolver, command: ManifestCommand) -> Result<()> {
    let manifest = match command {
        ManifestCommand::Open(args) => {
            let intent = OpenPositionIntent::new()
                .with_venue(args.venue)
                .with_resource(args.resource)
                .with_amount(args.amount)
                .with_lockup(args.lockup);
            plan_open_position(resolver, &args.account, &intent)
                .context("cannot open a position")?
        }
        ManifestCommand::Close(args) => {
            plan_close_position(resolver, &args.account, &args.receipt_resource, &args.id)
                .context("cannot close the position")?
        }
        ManifestCommand::Mint(args) => {
            plan_mint(resolver, &args.account, &args.resource).context("cannot mint")?
        }
    };

    tracing::debug!(instructions = manifest.len(), "manifest built");
    print!("{manifest}");
    Ok(())
}

async fn show_positions(resolver: &ConfigurationResolver, args: cli::PositionsArgs) -> Result<()> {
    let url = match args.gateway_url {
        Some(url) => url,
        None => match gateway_url_for_network(resolver.network_id()) {
            Some(url) => url.to_string(),
            None => bail!(
                "no public gateway for network {}; pass --gateway-url",
                network_name(resolver.network_id())
            ),
        },
    };

    let gateway = GatewayClient::new(url.as_str()).context("failed to build gateway client")?;
    let table = fetch_positions(&gateway, resolver, &args.account)
        .await
        .with_context(|| format!("failed to read positions from {url}"))?;

    tracing::info!(account = %args.account, positions = table.len(), "positions fetched");

    let now = chrono::Utc::now();
    match args.format {
        OutputFormat::Table => print!("{}", render::positions_table(resolver, &table, now)),
        OutputFormat::Json => print_json(&render::positions_json(resolver, &table, now))?,
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the binary version and build information.
fn print_version() {
    println!("ignition {}", env!("CARGO_PKG_VERSION"));
    println!("rustc    {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
