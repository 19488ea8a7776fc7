//! Manifest instructions and the typed literals they carry.
//!
//! Rendering is the only thing these types do. Every literal is
//! interpolated verbatim, so callers must hand in values that are already
//! valid ledger syntax (addresses, decimal strings, local ids).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ManifestValue
// ---------------------------------------------------------------------------

/// A typed argument literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestValue {
    /// `Address("...")`
    Address(String),
    /// `Decimal("...")`
    Decimal(String),
    /// `<n>u64`
    U64(u64),
    /// `Bucket("...")`
    Bucket(String),
    /// `Expression("...")`
    Expression(String),
    /// `Array<NonFungibleLocalId>(NonFungibleLocalId("..."), ...)`
    NonFungibleLocalIds(Vec<String>),
    /// `None`
    None,
}

impl fmt::Display for ManifestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "Address(\"{}\")", a),
            Self::Decimal(d) => write!(f, "Decimal(\"{}\")", d),
            Self::U64(v) => write!(f, "{}u64", v),
            Self::Bucket(b) => write!(f, "Bucket(\"{}\")", b),
            Self::Expression(e) => write!(f, "Expression(\"{}\")", e),
            Self::NonFungibleLocalIds(ids) => {
                write!(f, "Array<NonFungibleLocalId>(")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "NonFungibleLocalId(\"{}\")", id)?;
                }
                write!(f, ")")
            }
            Self::None => write!(f, "None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// One ledger instruction. Execution is sequential and worktop-dependent,
/// so the position of an instruction in a manifest is part of its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Invoke a method on a component or account.
    CallMethod {
        address: String,
        method: String,
        args: Vec<ManifestValue>,
    },
    /// Mint fungible units onto the worktop.
    MintFungible { resource: String, amount: String },
    /// Move an amount of a fungible from the worktop into a named bucket.
    TakeFromWorktop {
        resource: String,
        amount: String,
        bucket: String,
    },
    /// Move named non-fungibles from the worktop into a named bucket.
    TakeNonFungiblesFromWorktop {
        resource: String,
        ids: Vec<String>,
        bucket: String,
    },
}

impl Instruction {
    /// The instruction keyword as it appears in manifest text.
    pub fn opcode(&self) -> &'static str {
        match self {
            Self::CallMethod { .. } => "CALL_METHOD",
            Self::MintFungible { .. } => "MINT_FUNGIBLE",
            Self::TakeFromWorktop { .. } => "TAKE_FROM_WORKTOP",
            Self::TakeNonFungiblesFromWorktop { .. } => "TAKE_NON_FUNGIBLES_FROM_WORKTOP",
        }
    }

    /// Rendered operands, one per line of manifest text.
    fn operands(&self) -> Vec<String> {
        match self {
            Self::CallMethod {
                address,
                method,
                args,
            } => {
                let mut out = Vec::with_capacity(args.len() + 2);
                out.push(ManifestValue::Address(address.clone()).to_string());
                out.push(format!("\"{}\"", method));
                out.extend(args.iter().map(ToString::to_string));
                out
            }
            Self::MintFungible { resource, amount } => vec![
                ManifestValue::Address(resource.clone()).to_string(),
                ManifestValue::Decimal(amount.clone()).to_string(),
            ],
            Self::TakeFromWorktop {
                resource,
                amount,
                bucket,
            } => vec![
                ManifestValue::Address(resource.clone()).to_string(),
                ManifestValue::Decimal(amount.clone()).to_string(),
                ManifestValue::Bucket(bucket.clone()).to_string(),
            ],
            Self::TakeNonFungiblesFromWorktop {
                resource,
                ids,
                bucket,
            } => vec![
                ManifestValue::Address(resource.clone()).to_string(),
                ManifestValue::NonFungibleLocalIds(ids.clone()).to_string(),
                ManifestValue::Bucket(bucket.clone()).to_string(),
            ],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.opcode())?;
        for operand in self.operands() {
            writeln!(f, "    {}", operand)?;
        }
        write!(f, ";")
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// An ordered list of instructions, submitted as one atomic transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    instructions: Vec<Instruction>,
}

impl Manifest {
    pub(crate) fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` for a manifest with no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Instructions separated by a blank line, with a trailing newline.
impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
