//! Domain-side shapes of Ledger Query Service responses.
//!
//! These are what the rest of the crate consumes. The HTTP client maps the
//! gateway's wire format onto them; test doubles construct them directly.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Programmatic values
// ---------------------------------------------------------------------------

/// A node of the gateway's programmatic JSON encoding of ledger data.
///
/// Scalars (`String`, `Decimal`, `Reference`, `U64`, `I64`, ...) carry a
/// `value`; composites (`Tuple`, `Enum`) carry `fields`. Tuple fields of a
/// struct-like payload are additionally tagged with `field_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgrammaticValue {
    /// Value kind, e.g. `"Tuple"`, `"String"`, `"Decimal"`.
    pub kind: String,
    /// Schema type name, when the ledger knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Field name when this value is a named tuple field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    /// Scalar payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Children of a composite value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ProgrammaticValue>,
}

impl ProgrammaticValue {
    /// Kind tag of tuples.
    pub const TUPLE: &'static str = "Tuple";

    /// Builds a tuple from its fields.
    pub fn tuple(fields: Vec<ProgrammaticValue>) -> Self {
        Self {
            kind: Self::TUPLE.to_string(),
            type_name: None,
            field_name: None,
            value: None,
            fields,
        }
    }

    /// Builds a named scalar field.
    pub fn named(kind: &str, field_name: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            type_name: None,
            field_name: Some(field_name.to_string()),
            value: Some(serde_json::Value::String(value.to_string())),
            fields: Vec::new(),
        }
    }

    /// Returns `true` for tuple values.
    pub fn is_tuple(&self) -> bool {
        self.kind == Self::TUPLE
    }

    /// Renders a scalar payload as text.
    ///
    /// Strings are returned unquoted, numbers and booleans in their JSON
    /// spelling. Composites and nulls yield `None`.
    pub fn scalar_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

/// Non-fungibles of one resource held by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleHolding {
    /// The non-fungible resource.
    pub resource_address: String,
    /// Vaults of the account holding this resource.
    pub vaults: Vec<VaultHolding>,
}

/// One vault's share of a [`NonFungibleHolding`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultHolding {
    /// Address of the vault.
    pub vault_address: String,
    /// Local ids held in this vault.
    pub local_ids: Vec<String>,
}

impl NonFungibleHolding {
    /// Local ids across all vaults, in vault order, without duplicates.
    pub fn local_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.vaults
            .iter()
            .flat_map(|vault| vault.local_ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

/// Data attached to one non-fungible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonFungibleDataItem {
    /// Local id of the non-fungible.
    pub non_fungible_id: String,
    /// Whether the non-fungible has been burned.
    #[serde(default)]
    pub is_burned: bool,
    /// Programmatic payload, absent for burned items.
    #[serde(default)]
    pub data: Option<ProgrammaticValue>,
}
