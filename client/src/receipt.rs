//! # Liquidity Receipts
//!
//! Every open position is represented on ledger by a receipt non-fungible.
//! Its data arrives from the Ledger Query Service as a named-field tuple in
//! the gateway's programmatic JSON encoding:
//!
//! ```text
//! Tuple {
//!     String    name
//!     String    description
//!     String    key_image_url
//!     String    lockup_period           ("6 Months", display only)
//!     String    redemption_url
//!     Reference pool_address
//!     Reference user_resource_address
//!     Decimal   user_contribution_amount
//!     Enum      user_resource_volatility_classification   (ignored)
//!     Decimal   protocol_contribution_amount
//!     I64       maturity_date           (unix seconds)
//! }
//! ```
//!
//! Decoding indexes the tuple by field name and then reads the ten fields
//! the client cares about. Field order is never relied upon. A missing
//! field is a [`DecodeError`], which the aggregator logs and skips.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::types::{NonFungibleDataItem, ProgrammaticValue};

// ---------------------------------------------------------------------------
// Field Names
// ---------------------------------------------------------------------------

// Names the ledger gives the receipt's tuple fields.

pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_KEY_IMAGE_URL: &str = "key_image_url";
pub const FIELD_LOCKUP_PERIOD: &str = "lockup_period";
pub const FIELD_REDEMPTION_URL: &str = "redemption_url";
pub const FIELD_POOL_ADDRESS: &str = "pool_address";
pub const FIELD_USER_RESOURCE_ADDRESS: &str = "user_resource_address";
pub const FIELD_USER_CONTRIBUTION_AMOUNT: &str = "user_contribution_amount";
pub const FIELD_PROTOCOL_CONTRIBUTION_AMOUNT: &str = "protocol_contribution_amount";
pub const FIELD_MATURITY_DATE: &str = "maturity_date";

/// The fields a receipt payload must carry, in the order they are checked.
pub const RECEIPT_FIELDS: [&str; 10] = [
    FIELD_NAME,
    FIELD_DESCRIPTION,
    FIELD_KEY_IMAGE_URL,
    FIELD_LOCKUP_PERIOD,
    FIELD_REDEMPTION_URL,
    FIELD_POOL_ADDRESS,
    FIELD_USER_RESOURCE_ADDRESS,
    FIELD_USER_CONTRIBUTION_AMOUNT,
    FIELD_PROTOCOL_CONTRIBUTION_AMOUNT,
    FIELD_MATURITY_DATE,
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a receipt payload could not be decoded.
///
/// All variants mean malformed ledger data, never user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The ledger returned no data for the non-fungible (burned, or the
    /// gateway omitted it).
    #[error("non-fungible {id} carries no data")]
    MissingData {
        /// Local id of the offending item.
        id: String,
    },

    /// The payload is not a tuple.
    #[error("non-fungible {id}: expected a Tuple payload, found {kind}")]
    NotATuple {
        /// Local id of the offending item.
        id: String,
        /// Kind that was found instead.
        kind: String,
    },

    /// A required field is absent.
    #[error("non-fungible {id}: missing field `{field}`")]
    MissingField {
        /// Local id of the offending item.
        id: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A required field is present but not a scalar.
    #[error("non-fungible {id}: field `{field}` is a {kind}, expected a scalar")]
    NonScalarField {
        /// Local id of the offending item.
        id: String,
        /// Name of the field.
        field: &'static str,
        /// Kind that was found.
        kind: String,
    },
}

// ---------------------------------------------------------------------------
// LiquidityReceipt
// ---------------------------------------------------------------------------

/// Typed view of a receipt's data. Read-only; rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub name: String,
    pub description: String,
    pub key_image_url: String,
    /// Display string of the lockup, e.g. `"6 Months"`.
    pub lockup_period: String,
    pub redemption_url: String,
    /// Pool the liquidity was contributed to.
    pub pool_address: String,
    /// Resource the user contributed.
    pub user_resource_address: String,
    /// Decimal string.
    pub user_contribution_amount: String,
    /// Decimal string.
    pub protocol_contribution_amount: String,
    /// Unix seconds after which the position can be closed.
    pub maturity_timestamp: String,
}

impl LiquidityReceipt {
    /// Maturity as a UTC timestamp, if the ledger value is a valid unix
    /// time.
    pub fn maturity(&self) -> Option<DateTime<Utc>> {
        let seconds: i64 = self.maturity_timestamp.parse().ok()?;
        Utc.timestamp_opt(seconds, 0).single()
    }

    /// Returns `true` once `now` is at or past maturity. Unparseable
    /// maturities are never considered matured.
    pub fn is_matured_at(&self, now: DateTime<Utc>) -> bool {
        self.maturity().is_some_and(|maturity| now >= maturity)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A tuple's fields indexed by name.
struct TupleFields<'a> {
    id: &'a str,
    by_name: HashMap<&'a str, &'a ProgrammaticValue>,
}

impl<'a> TupleFields<'a> {
    fn index(id: &'a str, payload: &'a ProgrammaticValue) -> Result<Self, DecodeError> {
        if !payload.is_tuple() {
            return Err(DecodeError::NotATuple {
                id: id.to_string(),
                kind: payload.kind.clone(),
            });
        }

        let mut by_name = HashMap::with_capacity(payload.fields.len());
        for field in &payload.fields {
            if let Some(name) = field.field_name.as_deref() {
                // First occurrence wins on duplicated names.
                by_name.entry(name).or_insert(field);
            }
        }

        Ok(Self { id, by_name })
    }

    fn text(&self, field: &'static str) -> Result<String, DecodeError> {
        let value = self
            .by_name
            .get(field)
            .ok_or_else(|| DecodeError::MissingField {
                id: self.id.to_string(),
                field,
            })?;

        value.scalar_text().ok_or_else(|| DecodeError::NonScalarField {
            id: self.id.to_string(),
            field,
            kind: value.kind.clone(),
        })
    }
}

/// Decodes a receipt payload.
///
/// Fields are checked in [`RECEIPT_FIELDS`] order, so a payload missing
/// several fields always reports the same one.
pub fn decode(non_fungible_id: &str, payload: &ProgrammaticValue) -> Result<LiquidityReceipt, DecodeError> {
    let fields = TupleFields::index(non_fungible_id, payload)?;

    Ok(LiquidityReceipt {
        name: fields.text(FIELD_NAME)?,
        description: fields.text(FIELD_DESCRIPTION)?,
        key_image_url: fields.text(FIELD_KEY_IMAGE_URL)?,
        lockup_period: fields.text(FIELD_LOCKUP_PERIOD)?,
        redemption_url: fields.text(FIELD_REDEMPTION_URL)?,
        pool_address: fields.text(FIELD_POOL_ADDRESS)?,
        user_resource_address: fields.text(FIELD_USER_RESOURCE_ADDRESS)?,
        user_contribution_amount: fields.text(FIELD_USER_CONTRIBUTION_AMOUNT)?,
        protocol_contribution_amount: fields.text(FIELD_PROTOCOL_CONTRIBUTION_AMOUNT)?,
        maturity_timestamp: fields.text(FIELD_MATURITY_DATE)?,
    })
}

/// Decodes a data item returned by the Ledger Query Service.
pub fn decode_item(item: &NonFungibleDataItem) -> Result<LiquidityReceipt, DecodeError> {
    let payload = item.data.as_ref().ok_or_else(|| DecodeError::MissingData {
        id: item.non_fungible_id.clone(),
    })?;
    decode(&item.non_fungible_id, payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
