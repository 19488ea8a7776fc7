//! # Wallet Submission
//!
//! The wallet holds the user's keys, signs manifests and submits them. The
//! client only sees the [`WalletInterface`] trait: hand over manifest text,
//! get a transaction hash or a rejection back.
//!
//! [`WalletSubmissionGateway`] is the single place submissions go through.
//! On success it records the hash in the [`RefreshTrigger`], which is what
//! makes the position table refresh. Rejections are returned as-is and
//! never retried; whether to try again is the user's decision.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::manifest::Manifest;
use crate::trigger::RefreshTrigger;

// ---------------------------------------------------------------------------
// TransactionHash
// ---------------------------------------------------------------------------

/// Opaque identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(String);

impl TransactionHash {
    /// Wraps a wallet-issued transaction id.
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// The id as the wallet returned it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the wallet did not submit a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletRejection {
    /// The user declined in the wallet.
    #[error("transaction declined by the user")]
    UserDeclined,

    /// The wallet could not sign.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The wallet could not be reached.
    #[error("wallet unreachable: {0}")]
    Unreachable(String),

    /// The wallet or network rejected the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Failures of [`WalletSubmissionGateway::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The manifest has no instructions; nothing was sent.
    #[error("refusing to submit an empty manifest")]
    EmptyManifest,

    /// The wallet turned the submission down.
    #[error(transparent)]
    Wallet(#[from] WalletRejection),
}

// ---------------------------------------------------------------------------
// WalletInterface
// ---------------------------------------------------------------------------

/// Signs and submits manifests on the user's behalf.
#[async_trait]
pub trait WalletInterface: Send + Sync {
    async fn send_transaction(&self, manifest: &str) -> Result<TransactionHash, WalletRejection>;
}

// ---------------------------------------------------------------------------
// WalletSubmissionGateway
// ---------------------------------------------------------------------------

/// Submits manifests and records successes in the refresh trigger.
#[derive(Clone)]
pub struct WalletSubmissionGateway {
    wallet: Arc<dyn WalletInterface>,
    trigger: RefreshTrigger,
}

impl fmt::Debug for WalletSubmissionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSubmissionGateway")
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl WalletSubmissionGateway {
    /// Routes submissions through `wallet` and records them on `trigger`.
    pub fn new(wallet: Arc<dyn WalletInterface>, trigger: RefreshTrigger) -> Self {
        Self { wallet, trigger }
    }

    /// The trigger successful submissions are recorded on.
    pub fn trigger(&self) -> &RefreshTrigger {
        &self.trigger
    }

    /// Hands the manifest to the wallet.
    ///
    /// On success the hash is recorded in the trigger before returning. On
    /// rejection the trigger is left untouched.
    pub async fn submit(&self, manifest: &Manifest) -> Result<TransactionHash, SubmissionError> {
        if manifest.is_empty() {
            return Err(SubmissionError::EmptyManifest);
        }

        let text = manifest.to_string();
        match self.wallet.send_transaction(&text).await {
            Ok(hash) => {
                let version = self.trigger.record(hash.clone());
                info!(tx = %hash, version, instructions = manifest.len(), "transaction submitted");
                Ok(hash)
            }
            Err(rejection) => {
                warn!(error = %rejection, "transaction not submitted");
                Err(rejection.into())
            }
        }
    }
}
