//! # Transaction Manifests
//!
//! Manifests are the text programs the wallet signs and submits. This
//! module renders them from typed instructions and never parses them back
//! (beyond the literal scanner used to check round trips).
//!
//! ```text
//! instruction.rs — ManifestValue, Instruction, Manifest (rendering)
//! builder.rs     — ManifestBuilder, fluent instruction assembly
//! liquidity.rs   — open / close / mint manifests
//! intent.rs      — OpenPositionIntent, validation, planning against config
//! literals.rs    — literal extraction from rendered text
//! ```

pub mod builder;
pub mod instruction;
pub mod intent;
pub mod liquidity;
pub mod literals;

pub use builder::ManifestBuilder;
pub use instruction::{Instruction, Manifest, ManifestValue};
pub use intent::{
    normalize_amount, plan_close_position, plan_mint, plan_open_position, CompleteIntent,
    IntentError, OpenPositionIntent,
};
pub use liquidity::{build_close_position, build_mint_utility, build_open_position, OpenPosition};
pub use literals::{extract_literals, Literal, LiteralKind};
