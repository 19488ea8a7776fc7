//! [`GatewayClient`]: the Ledger Query Service over the Radix Gateway HTTP
//! API.
//!
//! Endpoints used:
//!
//! | Method | Path                                     | Purpose                                 |
//! |--------|------------------------------------------|-----------------------------------------|
//! | POST   | `/state/entity/details`                  | Vault-aggregated holdings of an account |
//! | POST   | `/state/entity/page/non-fungibles/`      | Further pages of held resources         |
//! | POST   | `/state/entity/page/non-fungible-vaults/`| Further pages of a resource's vaults    |
//! | POST   | `/state/entity/page/non-fungible-vault/ids` | Further pages of a vault's local ids |
//! | POST   | `/state/non-fungible/data`               | Programmatic data of non-fungibles      |
//!
//! Every `next_cursor` is followed until absent. Follow-up pages are pinned
//! to the ledger state of the first entity details response, so the
//! holdings describe one consistent ledger version.
//!
//! Wire types are private to this module and mapped onto [`super::types`].
//! No retries here: a failed call surfaces as a [`GatewayError`] and the
//! caller decides what to do.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{NonFungibleDataItem, NonFungibleHolding, ProgrammaticValue, VaultHolding};
use super::{GatewayError, LedgerQueryService};
use crate::config::{GATEWAY_REQUEST_TIMEOUT, NON_FUNGIBLE_DATA_BATCH_SIZE};

const ENTITY_DETAILS_PATH: &str = "/state/entity/details";
const NON_FUNGIBLES_PAGE_PATH: &str = "/state/entity/page/non-fungibles/";
const NON_FUNGIBLE_VAULTS_PAGE_PATH: &str = "/state/entity/page/non-fungible-vaults/";
const NON_FUNGIBLE_VAULT_IDS_PAGE_PATH: &str = "/state/entity/page/non-fungible-vault/ids";
const NON_FUNGIBLE_DATA_PATH: &str = "/state/non-fungible/data";

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EntityDetailsRequest<'a> {
    addresses: Vec<&'a str>,
    aggregation_level: &'static str,
    opt_ins: EntityDetailsOptIns,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct EntityDetailsOptIns {
    non_fungible_include_nfids: bool,
}

const INCLUDE_NFIDS: EntityDetailsOptIns = EntityDetailsOptIns {
    non_fungible_include_nfids: true,
};

#[derive(Debug, Deserialize)]
struct LedgerState {
    state_version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct AtLedgerState {
    state_version: u64,
}

#[derive(Debug, Deserialize)]
struct EntityDetailsResponse {
    #[serde(default)]
    ledger_state: Option<LedgerState>,
    items: Vec<EntityDetailsItem>,
}

#[derive(Debug, Deserialize)]
struct EntityDetailsItem {
    address: String,
    #[serde(default)]
    non_fungible_resources: Option<Page<NonFungibleResourceItem>>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl<T> Page<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NonFungibleResourceItem {
    resource_address: String,
    // Absent when the gateway aggregated globally instead of per vault.
    #[serde(default)]
    vaults: Option<Page<VaultItem>>,
}

#[derive(Debug, Deserialize)]
struct VaultItem {
    vault_address: String,
    #[serde(default)]
    items: Option<Vec<String>>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct NonFungiblesPageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    at_ledger_state: Option<AtLedgerState>,
    cursor: String,
    address: &'a str,
    aggregation_level: &'static str,
    opt_ins: EntityDetailsOptIns,
}

#[derive(Debug, Serialize)]
struct NonFungibleVaultsPageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    at_ledger_state: Option<AtLedgerState>,
    cursor: String,
    address: &'a str,
    resource_address: &'a str,
    opt_ins: EntityDetailsOptIns,
}

#[derive(Debug, Serialize)]
struct NonFungibleVaultIdsPageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    at_ledger_state: Option<AtLedgerState>,
    cursor: String,
    address: &'a str,
    resource_address: &'a str,
    vault_address: &'a str,
}

#[derive(Debug, Serialize)]
struct NonFungibleDataRequest<'a> {
    resource_address: &'a str,
    non_fungible_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct NonFungibleDataResponse {
    non_fungible_ids: Vec<NonFungibleDetailsItem>,
}

#[derive(Debug, Deserialize)]
struct NonFungibleDetailsItem {
    non_fungible_id: String,
    #[serde(default)]
    is_burned: bool,
    #[serde(default)]
    data: Option<SborData>,
}

#[derive(Debug, Deserialize)]
struct SborData {
    #[serde(default)]
    programmatic_json: Option<ProgrammaticValue>,
}

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

/// HTTP client for a Radix Gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

impl GatewayClient {
    /// Creates a client for the gateway at `base_url` (no trailing path).
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The gateway this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, GatewayError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%url, status = %status, body_len = text.len(), "gateway response");

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Returns the items of `first` plus every page reachable from its
    /// cursor. `next_request` builds the follow-up request for a cursor.
    async fn collect_pages<T, Req, F>(
        &self,
        path: &str,
        first: Page<T>,
        next_request: F,
    ) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
        Req: Serialize + Send + Sync,
        F: Fn(String) -> Req + Send + Sync,
    {
        let Page {
            mut items,
            mut next_cursor,
        } = first;

        while let Some(cursor) = next_cursor.take() {
            let request = next_request(cursor);
            let page: Page<T> = self.post(path, &request).await?;
            debug!(path, fetched = page.items.len(), "followed gateway cursor");
            items.extend(page.items);
            next_cursor = page.next_cursor;
        }

        Ok(items)
    }
}

#[async_trait]
impl LedgerQueryService for GatewayClient {
    async fn entity_details_vault_aggregated(
        &self,
        account_address: &str,
    ) -> Result<Vec<NonFungibleHolding>, GatewayError> {
        let request = EntityDetailsRequest {
            addresses: vec![account_address],
            aggregation_level: "Vault",
            opt_ins: INCLUDE_NFIDS,
        };
        let response: EntityDetailsResponse = self.post(ENTITY_DETAILS_PATH, &request).await?;
        let at_ledger_state = response.ledger_state.map(|state| AtLedgerState {
            state_version: state.state_version,
        });

        let item = response
            .items
            .into_iter()
            .find(|item| item.address == account_address)
            .ok_or_else(|| GatewayError::EntityNotFound(account_address.to_string()))?;

        let resources = self
            .collect_pages(
                NON_FUNGIBLES_PAGE_PATH,
                item.non_fungible_resources.unwrap_or_else(Page::empty),
                |cursor| NonFungiblesPageRequest {
                    at_ledger_state,
                    cursor,
                    address: account_address,
                    aggregation_level: "Vault",
                    opt_ins: INCLUDE_NFIDS,
                },
            )
            .await?;

        let mut holdings = Vec::with_capacity(resources.len());
        for resource in resources {
            let resource_address = resource.resource_address;
            let vaults = self
                .collect_pages(
                    NON_FUNGIBLE_VAULTS_PAGE_PATH,
                    resource.vaults.unwrap_or_else(Page::empty),
                    |cursor| NonFungibleVaultsPageRequest {
                        at_ledger_state,
                        cursor,
                        address: account_address,
                        resource_address: &resource_address,
                        opt_ins: INCLUDE_NFIDS,
                    },
                )
                .await?;

            let mut vault_holdings = Vec::with_capacity(vaults.len());
            for vault in vaults {
                let first = Page {
                    items: vault.items.unwrap_or_default(),
                    next_cursor: vault.next_cursor,
                };
                let local_ids = self
                    .collect_pages(NON_FUNGIBLE_VAULT_IDS_PAGE_PATH, first, |cursor| {
                        NonFungibleVaultIdsPageRequest {
                            at_ledger_state,
                            cursor,
                            address: account_address,
                            resource_address: &resource_address,
                            vault_address: &vault.vault_address,
                        }
                    })
                    .await?;
                vault_holdings.push(VaultHolding {
                    vault_address: vault.vault_address,
                    local_ids,
                });
            }

            holdings.push(NonFungibleHolding {
                resource_address,
                vaults: vault_holdings,
            });
        }

        Ok(holdings)
    }

    async fn non_fungible_data(
        &self,
        resource_address: &str,
        local_ids: &[String],
    ) -> Result<Vec<NonFungibleDataItem>, GatewayError> {
        let mut items = Vec::with_capacity(local_ids.len());

        for chunk in local_ids.chunks(NON_FUNGIBLE_DATA_BATCH_SIZE) {
            let request = NonFungibleDataRequest {
                resource_address,
                non_fungible_ids: chunk,
            };
            let response: NonFungibleDataResponse =
                self.post(NON_FUNGIBLE_DATA_PATH, &request).await?;

            items.extend(response.non_fungible_ids.into_iter().map(|item| {
                NonFungibleDataItem {
                    non_fungible_id: item.non_fungible_id,
                    is_burned: item.is_burned,
                    data: item.data.and_then(|d| d.programmatic_json),
                }
            }));
        }

        Ok(items)
    }
}
