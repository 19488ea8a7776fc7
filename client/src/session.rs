//! High-level user operations: plan a manifest against the configuration,
//! then hand it to the wallet.

use std::sync::Arc;

use thiserror::Error;

use crate::account::ConnectedAccount;
use crate::config::ConfigurationResolver;
use crate::manifest::{plan_close_position, plan_mint, plan_open_position, IntentError, OpenPositionIntent};
use crate::trigger::RefreshTrigger;
use crate::wallet::{SubmissionError, TransactionHash, WalletInterface, WalletSubmissionGateway};

/// Failures of a session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No account is connected, so there is nobody to deposit to.
    #[error("no account connected")]
    NotConnected,

    /// The request could not be turned into a manifest.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// The wallet did not submit the manifest.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Open, close and mint on behalf of the connected account.
#[derive(Debug, Clone)]
pub struct IgnitionSession {
    resolver: Arc<ConfigurationResolver>,
    submitter: WalletSubmissionGateway,
}

impl IgnitionSession {
    /// A session that submits through `wallet` and records on `trigger`.
    pub fn new(
        resolver: Arc<ConfigurationResolver>,
        wallet: Arc<dyn WalletInterface>,
        trigger: RefreshTrigger,
    ) -> Self {
        Self {
            resolver,
            submitter: WalletSubmissionGateway::new(wallet, trigger),
        }
    }

    /// The configuration manifests are planned against.
    pub fn resolver(&self) -> &ConfigurationResolver {
        &self.resolver
    }

    /// The trigger recorded on after each submission.
    pub fn trigger(&self) -> &RefreshTrigger {
        self.submitter.trigger()
    }

    /// Validates `intent`, builds the open manifest and submits it.
    pub async fn open_position(
        &self,
        account: &ConnectedAccount,
        intent: &OpenPositionIntent,
    ) -> Result<TransactionHash, SessionError> {
        let address = account.address().ok_or(SessionError::NotConnected)?;
        let manifest = plan_open_position(&self.resolver, address, intent)?;
        Ok(self.submitter.submit(&manifest).await?)
    }

    /// Builds the close manifest for one receipt and submits it.
    pub async fn close_position(
        &self,
        account: &ConnectedAccount,
        receipt_resource: &str,
        local_id: &str,
    ) -> Result<TransactionHash, SessionError> {
        let address = account.address().ok_or(SessionError::NotConnected)?;
        let manifest = plan_close_position(&self.resolver, address, receipt_resource, local_id)?;
        Ok(self.submitter.submit(&manifest).await?)
    }

    /// Mints test resources. Success updates the trigger like any other
    /// submission, since the balances shown alongside positions change too.
    pub async fn mint(
        &self,
        account: &ConnectedAccount,
        resource: &str,
    ) -> Result<TransactionHash, SessionError> {
        let address = account.address().ok_or(SessionError::NotConnected)?;
        let manifest = plan_mint(&self.resolver, address, resource)?;
        Ok(self.submitter.submit(&manifest).await?)
    }
}
