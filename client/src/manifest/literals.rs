//! Literal extraction from manifest text.
//!
//! Not a manifest parser: it only recognizes the literal shapes this crate
//! emits, which is enough to check that every value put into a manifest
//! comes back out unchanged.

use serde::Serialize;

/// Shape of an extracted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralKind {
    /// `Address("...")`
    Address,
    /// `Decimal("...")`
    Decimal,
    /// `Bucket("...")`
    Bucket,
    /// `Expression("...")`
    Expression,
    /// `NonFungibleLocalId("...")`, also inside arrays.
    NonFungibleLocalId,
    /// A bare quoted string (method names).
    String,
    /// An unsigned integer with the `u64` suffix.
    U64,
}

/// One literal and its inner text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Text between the quotes, or the digits of a `u64`.
    pub value: String,
}

const CONSTRUCTORS: [(&str, LiteralKind); 5] = [
    ("Address(\"", LiteralKind::Address),
    ("Decimal(\"", LiteralKind::Decimal),
    ("Bucket(\"", LiteralKind::Bucket),
    ("Expression(\"", LiteralKind::Expression),
    ("NonFungibleLocalId(\"", LiteralKind::NonFungibleLocalId),
];

/// Extracts literals in order of appearance.
///
/// An unterminated quote ends the scan.
pub fn extract_literals(manifest: &str) -> Vec<Literal> {
    let mut literals = Vec::new();
    let mut rest = manifest;

    while !rest.is_empty() {
        let constructor = CONSTRUCTORS
            .iter()
            .find_map(|(prefix, kind)| rest.strip_prefix(prefix).map(|after| (*kind, after)));
        let quoted = constructor.or_else(|| rest.strip_prefix('"').map(|after| (LiteralKind::String, after)));

        if let Some((kind, after)) = quoted {
            let Some(end) = after.find('"') else {
                break;
            };
            literals.push(Literal {
                kind,
                value: after[..end].to_string(),
            });
            rest = &after[end + 1..];
            continue;
        }

        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 {
            if rest[digits..].starts_with("u64") {
                literals.push(Literal {
                    kind: LiteralKind::U64,
                    value: rest[..digits].to_string(),
                });
                rest = &rest[digits + 3..];
            } else {
                rest = &rest[digits..];
            }
            continue;
        }

        let mut chars = rest.chars();
        chars.next();
        rest = chars.as_str();
    }

    literals
}
