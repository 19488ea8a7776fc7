//! Connected account state, as published by the account connection
//! provider.
//!
//! The provider owns an [`AccountConnection`]; everything else holds a
//! `watch::Receiver<ConnectedAccount>` and reacts to changes.

use std::sync::Arc;

use tokio::sync::watch;

/// Connection state of the user's account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectedAccount {
    /// No wallet response yet.
    #[default]
    Pending,
    /// Connected to the account at this address.
    Connected(String),
    /// The wallet refused or failed to share an account.
    Error,
}

impl ConnectedAccount {
    /// Address of the connected account, if any.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Connected(address) => Some(address),
            Self::Pending | Self::Error => None,
        }
    }

    /// `true` while an account is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Publisher side of the connected-account channel.
#[derive(Debug, Clone)]
pub struct AccountConnection {
    tx: Arc<watch::Sender<ConnectedAccount>>,
}

impl Default for AccountConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountConnection {
    /// Starts out [`ConnectedAccount::Pending`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectedAccount::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// A receiver that sees every connection change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectedAccount> {
        self.tx.subscribe()
    }

    /// The connection state right now.
    pub fn current(&self) -> ConnectedAccount {
        self.tx.borrow().clone()
    }

    /// Publishes a connected account. Re-publishing the same address is a
    /// no-op and wakes no one.
    pub fn connect(&self, address: impl Into<String>) {
        let next = ConnectedAccount::Connected(address.into());
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Publishes a connection failure.
    pub fn fail(&self) {
        self.tx.send_replace(ConnectedAccount::Error);
    }

    /// Back to the pending state, e.g. after the wallet disconnects.
    pub fn disconnect(&self) {
        self.tx.send_replace(ConnectedAccount::Pending);
    }
}
