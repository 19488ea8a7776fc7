//! Refresh signalling after successful submissions.
//!
//! The trigger is a `watch` channel holding the last transaction hash and
//! a version counter. The counter makes two submissions that happen to
//! produce the same hash still count as two changes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::wallet::TransactionHash;

/// Value carried by the trigger channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSignal {
    /// Bumped on every recorded submission; `0` before the first.
    pub version: u64,
    /// Hash of the last successful submission.
    pub last_transaction: Option<TransactionHash>,
}

/// Shared handle to the refresh signal. Clones share the channel.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    tx: Arc<watch::Sender<RefreshSignal>>,
}

impl Default for RefreshTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTrigger {
    /// A trigger at version zero with no transaction.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RefreshSignal::default());
        Self { tx: Arc::new(tx) }
    }

    /// A receiver woken by every recorded submission.
    pub fn subscribe(&self) -> watch::Receiver<RefreshSignal> {
        self.tx.subscribe()
    }

    /// Records a successful submission and wakes subscribers. Returns the
    /// new version.
    pub fn record(&self, hash: TransactionHash) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|signal| {
            signal.version += 1;
            signal.last_transaction = Some(hash);
            version = signal.version;
        });
        version
    }

    /// The latest signal.
    pub fn current(&self) -> RefreshSignal {
        self.tx.borrow().clone()
    }

    /// Hash of the most recent successful submission.
    pub fn last_transaction(&self) -> Option<TransactionHash> {
        self.tx.borrow().last_transaction.clone()
    }
}
