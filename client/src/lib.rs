// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ignition Client — Core Library
//!
//! Client-side core for Ignition, the Radix liquidity incentive protocol.
//! Users contribute a resource to a pool on a supported exchange venue,
//! Ignition matches it with the protocol resource for a chosen lockup, and
//! the user receives a receipt non-fungible that later redeems the
//! position.
//!
//! This crate does not hold keys and does not talk to the ledger directly.
//! It builds manifests for the wallet to sign, and reads positions back
//! through a Ledger Query Service.
//!
//! ## Architecture
//!
//! ```text
//! intent ─► ConfigurationResolver ─► manifest ─► WalletSubmissionGateway
//!                                                        │
//!                                                        ▼
//!  PositionTable ◄─ receipt decode ◄─ PositionAggregator ◄─ RefreshTrigger
//! ```
//!
//! - **config** — Protocol constants, the bootstrap bundle, venue resolution.
//! - **manifest** — Instruction rendering, the builder, open/close/mint
//!   manifests and intent validation.
//! - **receipt** — Decoding of receipt non-fungible data.
//! - **gateway** — The Ledger Query Service trait and its HTTP client.
//! - **positions** — The position table and its single writer.
//! - **wallet** — The wallet seam and the submission gateway.
//! - **trigger** — Refresh signalling after submissions.
//! - **account** — Connected-account state.
//! - **watcher** — The loop that keeps positions current.
//! - **session** — Open, close and mint as single calls.

pub mod account;
pub mod config;
pub mod gateway;
pub mod manifest;
pub mod positions;
pub mod receipt;
pub mod session;
pub mod trigger;
pub mod wallet;
pub mod watcher;

pub use account::{AccountConnection, ConnectedAccount};
pub use config::{BootstrapInformation, ConfigError, ConfigurationResolver};
pub use gateway::{GatewayClient, GatewayError, LedgerQueryService};
pub use manifest::{IntentError, Manifest, ManifestBuilder, OpenPositionIntent};
pub use positions::{PositionAggregator, PositionTable, RefreshOutcome};
pub use receipt::{DecodeError, LiquidityReceipt};
pub use session::{IgnitionSession, SessionError};
pub use trigger::{RefreshSignal, RefreshTrigger};
pub use wallet::{
    SubmissionError, TransactionHash, WalletInterface, WalletRejection, WalletSubmissionGateway,
};
pub use watcher::PositionWatcher;
