//! The three manifests the client submits: open a position, close a
//! position, and mint test resources.
//!
//! ```text
//! open:   MINT user resource -> TAKE -> bucket -> open_liquidity_position -> deposit
//! close:  withdraw receipt -> TAKE receipt -> bucket -> close_liquidity_position -> deposit
//! mint:   MINT_FUNGIBLE -> deposit
//! ```
//!
//! Every manifest ends by depositing the entire worktop into the user's
//! account, aborting on refusal, so no resource can be stranded.

use super::builder::ManifestBuilder;
use super::instruction::{Manifest, ManifestValue};
use crate::config::{
    BUCKET_NAME, CLOSE_LIQUIDITY_POSITION_METHOD, FAUCET_MINT_AMOUNT, OPEN_LIQUIDITY_POSITION_METHOD,
};

/// Addresses and values of one open-position request, after venue and
/// pool resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPosition<'a> {
    /// The Ignition component.
    pub ignition: &'a str,
    /// The user's account.
    pub account: &'a str,
    /// Pool on the chosen venue.
    pub pool: &'a str,
    /// Resource the user contributes.
    pub resource: &'a str,
    /// Decimal string, already normalized.
    pub amount: &'a str,
    /// Lockup length in seconds.
    pub lockup_seconds: u64,
}

/// Builds the open-position manifest.
///
/// The contributed amount is minted onto the worktop first; on the test
/// network the user resources have unrestricted minting.
pub fn build_open_position(open: &OpenPosition<'_>) -> Manifest {
    ManifestBuilder::new()
        .mint_fungible(open.resource, open.amount)
        .take_from_worktop(open.resource, open.amount, BUCKET_NAME)
        .call_method(
            open.ignition,
            OPEN_LIQUIDITY_POSITION_METHOD,
            vec![
                ManifestValue::Bucket(BUCKET_NAME.to_string()),
                ManifestValue::Address(open.pool.to_string()),
                ManifestValue::U64(open.lockup_seconds),
            ],
        )
        .deposit_entire_worktop_or_abort(open.account)
        .build()
}

/// Builds the close-position manifest for one receipt.
pub fn build_close_position(
    ignition: &str,
    account: &str,
    receipt_resource: &str,
    local_id: &str,
) -> Manifest {
    ManifestBuilder::new()
        .withdraw_non_fungibles(account, receipt_resource, &[local_id])
        .take_non_fungibles_from_worktop(receipt_resource, &[local_id], BUCKET_NAME)
        .call_method(
            ignition,
            CLOSE_LIQUIDITY_POSITION_METHOD,
            vec![ManifestValue::Bucket(BUCKET_NAME.to_string())],
        )
        .deposit_entire_worktop_or_abort(account)
        .build()
}

/// Builds the test-network faucet manifest: mint [`FAUCET_MINT_AMOUNT`] of
/// `resource` and deposit it. Only meaningful where minting is
/// unrestricted.
pub fn build_mint_utility(account: &str, resource: &str) -> Manifest {
    ManifestBuilder::new()
        .mint_fungible(resource, FAUCET_MINT_AMOUNT)
        .deposit_entire_worktop_or_abort(account)
        .build()
}
