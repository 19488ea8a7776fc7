//! Open-position intents and validated manifest planning.
//!
//! An [`OpenPositionIntent`] is filled in field by field as the user makes
//! choices. Only a complete intent can become a manifest, and planning
//! checks it against the configuration before anything is interpolated:
//! the venue must exist, the resource must have a pool on it, the lockup
//! must be offered and the amount must be a sane decimal.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instruction::Manifest;
use super::liquidity::{build_close_position, build_mint_utility, build_open_position, OpenPosition};
use crate::config::{ConfigError, ConfigurationResolver};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a request cannot be turned into a manifest.
#[derive(Debug, Error)]
pub enum IntentError {
    /// Required intent fields are unset.
    #[error("intent is incomplete, missing: {}", missing.join(", "))]
    Incomplete {
        /// Names of the unset fields.
        missing: Vec<&'static str>,
    },

    /// The amount is not a non-negative decimal.
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount {
        /// Amount as entered.
        amount: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The amount has more decimal places than the resource supports.
    #[error("amount {amount} exceeds the {divisibility} decimal places of {resource}")]
    ExcessPrecision {
        /// Normalized amount.
        amount: String,
        /// Resource being contributed.
        resource: String,
        /// Its divisibility.
        divisibility: u8,
    },

    /// No reward rate is configured for the lockup period.
    #[error("lockup period of {seconds}s is not offered")]
    UnsupportedLockup {
        /// Requested lockup in seconds.
        seconds: u64,
    },

    /// The venue has no pool for the resource.
    #[error("venue {venue} has no pool for {resource}")]
    UnsupportedResource {
        /// Logical venue name.
        venue: String,
        /// Resource address.
        resource: String,
    },

    /// The resource is not the receipt resource of any venue.
    #[error("{0} is not a liquidity receipt resource")]
    UnknownReceiptResource(String),

    /// The resource cannot be minted by the faucet.
    #[error("{0} is not a mintable test resource")]
    UnknownMintTarget(String),

    /// Venue resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// OpenPositionIntent
// ---------------------------------------------------------------------------

/// A partially specified request to open a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPositionIntent {
    pub venue: Option<String>,
    pub resource_address: Option<String>,
    /// Decimal string as entered.
    pub amount: Option<String>,
    pub lockup_period_seconds: Option<u64>,
}

/// An intent with every field set. Only produced by
/// [`OpenPositionIntent::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteIntent {
    pub venue: String,
    pub resource_address: String,
    pub amount: String,
    pub lockup_period_seconds: u64,
}

impl OpenPositionIntent {
    /// An intent with nothing selected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the logical venue, e.g. `"Caviarnine"`.
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Selects the resource to contribute.
    pub fn with_resource(mut self, resource_address: impl Into<String>) -> Self {
        self.resource_address = Some(resource_address.into());
        self
    }

    /// Sets the amount as typed; validated when the manifest is planned.
    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    /// Selects the lockup period in seconds.
    pub fn with_lockup(mut self, seconds: u64) -> Self {
        self.lockup_period_seconds = Some(seconds);
        self
    }

    /// Names of the fields still unset, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.venue.is_none() {
            missing.push("venue");
        }
        if self.resource_address.is_none() {
            missing.push("resource_address");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.lockup_period_seconds.is_none() {
            missing.push("lockup_period_seconds");
        }
        missing
    }

    /// `true` once all four fields are set.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Returns the complete form of the intent.
    ///
    /// # Errors
    ///
    /// [`IntentError::Incomplete`] listing every unset field.
    pub fn complete(&self) -> Result<CompleteIntent, IntentError> {
        match (
            &self.venue,
            &self.resource_address,
            &self.amount,
            self.lockup_period_seconds,
        ) {
            (Some(venue), Some(resource), Some(amount), Some(lockup)) => Ok(CompleteIntent {
                venue: venue.clone(),
                resource_address: resource.clone(),
                amount: amount.clone(),
                lockup_period_seconds: lockup,
            }),
            _ => Err(IntentError::Incomplete {
                missing: self.missing_fields(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Amount Normalization
// ---------------------------------------------------------------------------

/// Strips thousand separators and whitespace, then checks the rest is a
/// plain non-negative decimal: digits, optionally followed by `.` and more
/// digits. Signs, exponents and bare leading or trailing points are
/// refused because the ledger's `Decimal("...")` literal rejects them.
/// Returns the stripped text, not a reformatted number, so the ledger sees
/// the digits the user typed.
pub fn normalize_amount(raw: &str) -> Result<String, IntentError> {
    parse_amount(raw).map(|(text, _)| text)
}

fn parse_amount(raw: &str) -> Result<(String, Decimal), IntentError> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
        .collect();

    let invalid = |reason: &str| IntentError::InvalidAmount {
        amount: raw.to_string(),
        reason: reason.to_string(),
    };

    if stripped.is_empty() {
        return Err(invalid("empty"));
    }
    if stripped.starts_with('-') {
        return Err(invalid("negative"));
    }
    if !is_plain_decimal(&stripped) {
        return Err(invalid("expected digits with an optional fractional part"));
    }
    let value = Decimal::from_str(&stripped).map_err(|e| invalid(&e.to_string()))?;
    Ok((stripped, value))
}

fn is_plain_decimal(text: &str) -> bool {
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match text.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(text),
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Validates an intent and builds its open-position manifest.
pub fn plan_open_position(
    resolver: &ConfigurationResolver,
    account: &str,
    intent: &OpenPositionIntent,
) -> Result<Manifest, IntentError> {
    let intent = intent.complete()?;

    let venue = resolver.resolve(&intent.venue)?;
    let pool = venue
        .pool_for(&intent.resource_address)
        .ok_or_else(|| IntentError::UnsupportedResource {
            venue: intent.venue.clone(),
            resource: intent.resource_address.clone(),
        })?;

    if resolver
        .protocol()
        .reward_rate(intent.lockup_period_seconds)
        .is_none()
    {
        return Err(IntentError::UnsupportedLockup {
            seconds: intent.lockup_period_seconds,
        });
    }

    let (amount, value) = parse_amount(&intent.amount)?;
    if let Some(meta) = resolver.resource(&intent.resource_address) {
        if value.scale() > u32::from(meta.divisibility) {
            return Err(IntentError::ExcessPrecision {
                amount,
                resource: intent.resource_address,
                divisibility: meta.divisibility,
            });
        }
    }

    tracing::debug!(
        venue = %intent.venue,
        pool,
        resource = %intent.resource_address,
        %amount,
        lockup = intent.lockup_period_seconds,
        "planned open position"
    );

    Ok(build_open_position(&OpenPosition {
        ignition: resolver.ignition_address(),
        account,
        pool,
        resource: &intent.resource_address,
        amount: &amount,
        lockup_seconds: intent.lockup_period_seconds,
    }))
}

/// Checks the receipt resource belongs to a venue and builds the
/// close-position manifest.
pub fn plan_close_position(
    resolver: &ConfigurationResolver,
    account: &str,
    receipt_resource: &str,
    local_id: &str,
) -> Result<Manifest, IntentError> {
    let venue = resolver
        .venue_for_receipt(receipt_resource)
        .ok_or_else(|| IntentError::UnknownReceiptResource(receipt_resource.to_string()))?;

    tracing::debug!(venue, receipt_resource, local_id, "planned close position");

    Ok(build_close_position(
        resolver.ignition_address(),
        account,
        receipt_resource,
        local_id,
    ))
}

/// Checks the resource is a mint target and builds the faucet manifest.
pub fn plan_mint(
    resolver: &ConfigurationResolver,
    account: &str,
    resource: &str,
) -> Result<Manifest, IntentError> {
    if !resolver
        .mint_targets()
        .iter()
        .any(|(address, _)| address == resource)
    {
        return Err(IntentError::UnknownMintTarget(resource.to_string()));
    }
    Ok(build_mint_utility(account, resource))
}
