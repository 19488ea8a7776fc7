//! Manifest construction via the builder pattern.
//!
//! [`ManifestBuilder`] appends instructions in call order and
//! [`ManifestBuilder::build`] freezes them into a [`Manifest`]. It knows
//! nothing about Ignition; the liquidity manifests in
//! [`super::liquidity`] are written on top of it.

use super::instruction::{Instruction, Manifest, ManifestValue};
use crate::config::{DEPOSIT_OR_ABORT_METHOD, ENTIRE_WORKTOP_EXPRESSION, WITHDRAW_NON_FUNGIBLES_METHOD};

/// Fluent builder for [`Manifest`]s.
///
/// # Usage
///
/// ```rust
/// use ignition_client::manifest::ManifestBuilder;
///
/// let manifest = ManifestBuilder::new()
///     .mint_fungible("resource_r1", "10")
///     .deposit_entire_worktop_or_abort("account_a")
///     .build();
/// assert_eq!(manifest.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    instructions: Vec<Instruction>,
}

impl ManifestBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// `CALL_METHOD address "method" args...`
    pub fn call_method(mut self, address: &str, method: &str, args: Vec<ManifestValue>) -> Self {
        self.instructions.push(Instruction::CallMethod {
            address: address.to_string(),
            method: method.to_string(),
            args,
        });
        self
    }

    /// `MINT_FUNGIBLE resource amount`
    pub fn mint_fungible(mut self, resource: &str, amount: &str) -> Self {
        self.instructions.push(Instruction::MintFungible {
            resource: resource.to_string(),
            amount: amount.to_string(),
        });
        self
    }

    /// `TAKE_FROM_WORKTOP resource amount Bucket(bucket)`
    pub fn take_from_worktop(mut self, resource: &str, amount: &str, bucket: &str) -> Self {
        self.instructions.push(Instruction::TakeFromWorktop {
            resource: resource.to_string(),
            amount: amount.to_string(),
            bucket: bucket.to_string(),
        });
        self
    }

    /// `TAKE_NON_FUNGIBLES_FROM_WORKTOP resource ids Bucket(bucket)`
    pub fn take_non_fungibles_from_worktop(
        mut self,
        resource: &str,
        ids: &[&str],
        bucket: &str,
    ) -> Self {
        self.instructions.push(Instruction::TakeNonFungiblesFromWorktop {
            resource: resource.to_string(),
            ids: ids.iter().map(|id| id.to_string()).collect(),
            bucket: bucket.to_string(),
        });
        self
    }

    /// Withdraws named non-fungibles from an account onto the worktop.
    pub fn withdraw_non_fungibles(self, account: &str, resource: &str, ids: &[&str]) -> Self {
        self.call_method(
            account,
            WITHDRAW_NON_FUNGIBLES_METHOD,
            vec![
                ManifestValue::Address(resource.to_string()),
                ManifestValue::NonFungibleLocalIds(ids.iter().map(|id| id.to_string()).collect()),
            ],
        )
    }

    /// Deposits the whole worktop into `account`; the transaction aborts if
    /// the account refuses any of it.
    pub fn deposit_entire_worktop_or_abort(self, account: &str) -> Self {
        self.call_method(
            account,
            DEPOSIT_OR_ABORT_METHOD,
            vec![
                ManifestValue::Expression(ENTIRE_WORKTOP_EXPRESSION.to_string()),
                ManifestValue::None,
            ],
        )
    }

    /// Consumes the builder.
    pub fn build(self) -> Manifest {
        Manifest::from_instructions(self.instructions)
    }
}
