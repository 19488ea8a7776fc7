//! # Ledger Query Service
//!
//! The client reads ledger state through the [`LedgerQueryService`] trait.
//! Two calls are all the position table needs: what non-fungibles an
//! account holds (vault-aggregated), and what data a batch of them carries.
//!
//! ```text
//! types.rs — Domain shapes: holdings, data items, programmatic values
//! http.rs  — GatewayClient, a reqwest implementation over the Gateway API
//! ```
//!
//! The trait is the seam: the aggregator never sees HTTP, and tests plug in
//! in-memory doubles.

pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::GatewayClient;
pub use types::{NonFungibleDataItem, NonFungibleHolding, ProgrammaticValue, VaultHolding};

/// Failures talking to the Ledger Query Service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("gateway request failed: {0}")]
    Transport(String),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// The response body did not match the expected schema.
    #[error("unexpected gateway response: {0}")]
    Decode(String),

    /// The queried entity is not known to the ledger.
    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Read access to ledger state.
#[async_trait]
pub trait LedgerQueryService: Send + Sync {
    /// Non-fungible holdings of an account, grouped by resource and vault.
    async fn entity_details_vault_aggregated(
        &self,
        account_address: &str,
    ) -> Result<Vec<NonFungibleHolding>, GatewayError>;

    /// Data of the given non-fungibles of one resource.
    async fn non_fungible_data(
        &self,
        resource_address: &str,
        local_ids: &[String],
    ) -> Result<Vec<NonFungibleDataItem>, GatewayError>;
}
