//! # Position Aggregation
//!
//! Builds the table of the connected account's open positions from ledger
//! state:
//!
//! ```text
//! entity_details_vault_aggregated(account)
//!         │
//!         ▼
//! keep configured receipt resources ──► pool local ids across vaults
//!                                               │
//!                                               ▼
//!                              non_fungible_data(resource, ids)
//!                                               │
//!                                               ▼
//!                         decode each item (skip + warn on failure)
//!                                               │
//!                                               ▼
//!                          PositionTable { resource → { id → receipt } }
//! ```
//!
//! ## Supersession
//!
//! Refreshes can overlap: a new transaction lands, or the account changes,
//! while an older fetch is still in flight. Every refresh takes a ticket
//! from a monotonically increasing counter. A finished refresh is applied
//! only if its ticket is still the newest one issued; otherwise its result
//! is dropped. The ticket check and the table write happen under the same
//! lock, so a stale result can never overwrite a newer one.
//!
//! A failed refresh leaves the previous table in place.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ConfigurationResolver;
use crate::gateway::{GatewayError, LedgerQueryService};
use crate::receipt::{decode_item, LiquidityReceipt};

// ---------------------------------------------------------------------------
// PositionTable
// ---------------------------------------------------------------------------

/// Receipts of one resource, keyed by local id.
pub type ReceiptsById = BTreeMap<String, LiquidityReceipt>;

/// Open positions: receipt resource → local id → receipt.
///
/// Only configured receipt resources appear, and only with at least one
/// decoded receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PositionTable {
    entries: BTreeMap<String, ReceiptsById>,
}

impl PositionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of positions across all resources.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// `true` when no configured receipt resource has a position.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Receipt resources with at least one position, sorted.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Receipts of one resource.
    pub fn receipts(&self, resource: &str) -> Option<&ReceiptsById> {
        self.entries.get(resource)
    }

    /// One receipt by resource and local id.
    pub fn get(&self, resource: &str, local_id: &str) -> Option<&LiquidityReceipt> {
        self.entries.get(resource)?.get(local_id)
    }

    /// Every position as `(resource, local id, receipt)`, sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &LiquidityReceipt)> {
        self.entries.iter().flat_map(|(resource, receipts)| {
            receipts
                .iter()
                .map(move |(id, receipt)| (resource.as_str(), id.as_str(), receipt))
        })
    }

    fn insert_resource(&mut self, resource: String, receipts: ReceiptsById) {
        if !receipts.is_empty() {
            self.entries.insert(resource, receipts);
        }
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Fetches and decodes the positions of `account` in one pass.
///
/// Gateway failures abort the whole fetch. Decode failures only drop the
/// affected item.
pub async fn fetch_positions(
    ledger: &dyn LedgerQueryService,
    resolver: &ConfigurationResolver,
    account: &str,
) -> Result<PositionTable, GatewayError> {
    let holdings = ledger.entity_details_vault_aggregated(account).await?;
    let mut table = PositionTable::new();

    for holding in holdings {
        if !resolver.is_receipt_resource(&holding.resource_address) {
            debug!(resource = %holding.resource_address, "ignoring unconfigured resource");
            continue;
        }

        let ids = holding.local_ids();
        if ids.is_empty() {
            continue;
        }

        let items = ledger
            .non_fungible_data(&holding.resource_address, &ids)
            .await?;

        let mut receipts = ReceiptsById::new();
        for item in items {
            if item.is_burned {
                debug!(resource = %holding.resource_address, id = %item.non_fungible_id, "skipping burned receipt");
                continue;
            }
            match decode_item(&item) {
                Ok(receipt) => {
                    receipts.insert(item.non_fungible_id, receipt);
                }
                Err(e) => {
                    warn!(resource = %holding.resource_address, error = %e, "skipping undecodable receipt");
                }
            }
        }

        table.insert_resource(holding.resource_address, receipts);
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// PositionAggregator
// ---------------------------------------------------------------------------

/// An applied table, with the account and ticket it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub account: String,
    pub ticket: u64,
    pub table: PositionTable,
}

/// Result of a refresh that reached the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The table was replaced.
    Applied(Arc<PositionSnapshot>),
    /// A newer refresh was issued meanwhile; the result was dropped.
    Superseded {
        /// Ticket of this refresh.
        ticket: u64,
        /// Newest ticket at completion.
        latest: u64,
    },
}

/// Single writer of the position table.
pub struct PositionAggregator {
    ledger: Arc<dyn LedgerQueryService>,
    resolver: Arc<ConfigurationResolver>,
    issued: AtomicU64,
    current: RwLock<Option<Arc<PositionSnapshot>>>,
}

impl std::fmt::Debug for PositionAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionAggregator")
            .field("issued", &self.issued.load(Ordering::SeqCst))
            .field("current", &self.current.read())
            .finish_non_exhaustive()
    }
}

impl PositionAggregator {
    /// An aggregator with an empty table and ticket zero.
    pub fn new(ledger: Arc<dyn LedgerQueryService>, resolver: Arc<ConfigurationResolver>) -> Self {
        Self {
            ledger,
            resolver,
            issued: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    /// The last applied table, if any.
    pub fn snapshot(&self) -> Option<Arc<PositionSnapshot>> {
        self.current.read().clone()
    }

    /// The last applied table if it belongs to `account`.
    pub fn table_for(&self, account: &str) -> Option<PositionTable> {
        self.current
            .read()
            .as_ref()
            .filter(|snapshot| snapshot.account == account)
            .map(|snapshot| snapshot.table.clone())
    }

    /// Newest ticket issued so far.
    pub fn latest_ticket(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Drops the current table and supersedes every refresh in flight.
    /// Used when the account goes away.
    pub fn invalidate(&self) {
        let mut current = self.current.write();
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        *current = None;
        debug!(ticket, "position table invalidated");
    }

    /// Re-reads the positions of `account`.
    ///
    /// # Errors
    ///
    /// Gateway failures are returned and the previous table is kept.
    pub async fn refresh(&self, account: &str) -> Result<RefreshOutcome, GatewayError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(ticket, account, "refreshing positions");

        let table = match fetch_positions(self.ledger.as_ref(), &self.resolver, account).await {
            Ok(table) => table,
            Err(e) => {
                warn!(ticket, account, error = %e, "position refresh failed, keeping previous table");
                return Err(e);
            }
        };

        let mut current = self.current.write();
        let latest = self.issued.load(Ordering::SeqCst);
        if ticket != latest {
            debug!(ticket, latest, "discarding superseded refresh");
            return Ok(RefreshOutcome::Superseded { ticket, latest });
        }

        let snapshot = Arc::new(PositionSnapshot {
            account: account.to_string(),
            ticket,
            table,
        });
        *current = Some(Arc::clone(&snapshot));
        drop(current);

        info!(
            ticket,
            account,
            positions = snapshot.table.len(),
            "position table refreshed"
        );
        Ok(RefreshOutcome::Applied(snapshot))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::sample_resolver;
    use crate::gateway::{NonFungibleDataItem, NonFungibleHolding, VaultHolding};
    use crate::receipt::tests::receipt_payload;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// In-memory ledger. Holdings are served per call from `holdings`
    /// (last entry repeats); data items by resource.
    #[derive(Default)]
    pub(crate) struct MockLedger {
        pub(crate) holdings: Mutex<Vec<Vec<NonFungibleHolding>>>,
        pub(crate) data: Mutex<HashMap<String, Vec<NonFungibleDataItem>>>,
        pub(crate) fail: Mutex<bool>,
        pub(crate) detail_calls: AtomicUsize,
        pub(crate) data_requests: Mutex<Vec<(String, Vec<String>)>>,
        /// When set, the first entity-details call parks until released.
        pub(crate) gate: Option<Gate>,
    }

    pub(crate) struct Gate {
        pub(crate) entered: Notify,
        pub(crate) release: Notify,
    }

    pub(crate) fn holding(resource: &str, vaults: &[&[&str]]) -> NonFungibleHolding {
        NonFungibleHolding {
            resource_address: resource.to_string(),
            vaults: vaults
                .iter()
                .enumerate()
                .map(|(i, ids)| VaultHolding {
                    vault_address: format!("internal_vault_{i}"),
                    local_ids: ids.iter().map(|id| id.to_string()).collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn item(id: &str, pool: &str, amount: &str) -> NonFungibleDataItem {
        NonFungibleDataItem {
            non_fungible_id: id.to_string(),
            is_burned: false,
            data: Some(receipt_payload(pool, amount)),
        }
    }

    impl MockLedger {
        pub(crate) fn with(
            holdings: Vec<NonFungibleHolding>,
            data: Vec<(&str, Vec<NonFungibleDataItem>)>,
        ) -> Self {
            let ledger = Self::default();
            *ledger.holdings.lock() = vec![holdings];
            *ledger.data.lock() = data
                .into_iter()
                .map(|(resource, items)| (resource.to_string(), items))
                .collect();
            ledger
        }

        pub(crate) fn gated(mut self) -> Self {
            self.gate = Some(Gate {
                entered: Notify::new(),
                release: Notify::new(),
            });
            self
        }
    }

    #[async_trait]
    impl LedgerQueryService for MockLedger {
        async fn entity_details_vault_aggregated(
            &self,
            _account: &str,
        ) -> Result<Vec<NonFungibleHolding>, GatewayError> {
            let call = self.detail_calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                if let Some(gate) = &self.gate {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
            }
            if *self.fail.lock() {
                return Err(GatewayError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            let holdings = self.holdings.lock();
            let index = call.min(holdings.len().saturating_sub(1));
            Ok(holdings.get(index).cloned().unwrap_or_default())
        }

        async fn non_fungible_data(
            &self,
            resource: &str,
            ids: &[String],
        ) -> Result<Vec<NonFungibleDataItem>, GatewayError> {
            self.data_requests
                .lock()
                .push((resource.to_string(), ids.to_vec()));
            let data = self.data.lock();
            Ok(data
                .get(resource)
                .map(|items| {
                    items
                        .iter()
                        .filter(|item| ids.contains(&item.non_fungible_id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn aggregator(ledger: Arc<MockLedger>) -> PositionAggregator {
        PositionAggregator::new(ledger, Arc::new(sample_resolver()))
    }

    // -----------------------------------------------------------------------
    // 1. Filtering and decoding
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_account_gives_empty_table() {
        let ledger = MockLedger::with(vec![], vec![]);
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();
        assert!(table.is_empty());
        assert!(ledger.data_requests.lock().is_empty());
    }

    #[tokio::test]
    async fn single_receipt_is_tabled() {
        let ledger = MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "500")])],
        );
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();

        assert_eq!(table.len(), 1);
        let receipt = table.get("resource_rr", "#1#").unwrap();
        assert_eq!(receipt.pool_address, "pool_p1");
        assert_eq!(receipt.user_contribution_amount, "500");
    }

    #[tokio::test]
    async fn unconfigured_resources_are_never_stored() {
        let ledger = MockLedger::with(
            vec![
                holding("resource_stranger", &[&["#1#"]]),
                holding("resource_rr", &[&["#1#"]]),
            ],
            vec![
                ("resource_stranger", vec![item("#1#", "pool_x", "1")]),
                ("resource_rr", vec![item("#1#", "pool_p1", "500")]),
            ],
        );
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();

        assert_eq!(table.resources().collect::<Vec<_>>(), ["resource_rr"]);
        let requested: Vec<_> = ledger
            .data_requests
            .lock()
            .iter()
            .map(|(resource, _)| resource.clone())
            .collect();
        assert_eq!(requested, ["resource_rr"]);
    }

    #[tokio::test]
    async fn ids_are_pooled_across_vaults() {
        let ledger = MockLedger::with(
            vec![holding("resource_rr", &[&["#1#", "#2#"], &["#3#"]])],
            vec![(
                "resource_rr",
                vec![
                    item("#1#", "pool_p1", "1"),
                    item("#2#", "pool_p1", "2"),
                    item("#3#", "pool_p1", "3"),
                ],
            )],
        );
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();

        assert_eq!(table.len(), 3);
        let requests = ledger.data_requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, ["#1#", "#2#", "#3#"]);
    }

    #[tokio::test]
    async fn undecodable_receipt_is_skipped() {
        let mut broken = item("#2#", "pool_p1", "2");
        if let Some(payload) = broken.data.as_mut() {
            payload
                .fields
                .retain(|f| f.field_name.as_deref() != Some("pool_address"));
        }
        let ledger = MockLedger::with(
            vec![holding("resource_rr", &[&["#1#", "#2#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "1"), broken])],
        );
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.get("resource_rr", "#1#").is_some());
        assert!(table.get("resource_rr", "#2#").is_none());
    }

    #[tokio::test]
    async fn burned_receipt_is_skipped() {
        let mut burned = item("#1#", "pool_p1", "1");
        burned.is_burned = true;
        let ledger = MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![burned])],
        );
        let table = fetch_positions(&ledger, &sample_resolver(), "account_a")
            .await
            .unwrap();
        assert!(table.is_empty());
    }

    // -----------------------------------------------------------------------
    // 2. Aggregator state
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn refresh_applies_and_snapshots() {
        let ledger = Arc::new(MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "500")])],
        ));
        let aggregator = aggregator(ledger);

        let outcome = aggregator.refresh("account_a").await.unwrap();
        let RefreshOutcome::Applied(snapshot) = outcome else {
            panic!("expected applied refresh");
        };
        assert_eq!(snapshot.ticket, 1);
        assert_eq!(aggregator.snapshot(), Some(snapshot));
        assert!(aggregator.table_for("account_a").is_some());
        assert!(aggregator.table_for("account_b").is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_table() {
        let ledger = Arc::new(MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "500")])],
        ));
        let aggregator = aggregator(ledger.clone());
        aggregator.refresh("account_a").await.unwrap();
        let before = aggregator.snapshot();

        *ledger.fail.lock() = true;
        let err = aggregator.refresh("account_a").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status { status: 503, .. }));
        assert_eq!(aggregator.snapshot(), before);
    }

    #[tokio::test]
    async fn invalidate_clears_table() {
        let ledger = Arc::new(MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "500")])],
        ));
        let aggregator = aggregator(ledger);
        aggregator.refresh("account_a").await.unwrap();

        aggregator.invalidate();
        assert!(aggregator.snapshot().is_none());
        assert_eq!(aggregator.latest_ticket(), 2);
    }

    // -----------------------------------------------------------------------
    // 3. Supersession
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stale_refresh_never_overwrites_newer() {
        let ledger = MockLedger::with(
            vec![],
            vec![(
                "resource_rr",
                vec![item("#1#", "pool_p1", "1"), item("#2#", "pool_p1", "2")],
            )],
        )
        .gated();
        // The first (slow) call sees #1#, later calls see #2#.
        *ledger.holdings.lock() = vec![
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![holding("resource_rr", &[&["#2#"]])],
        ];
        let ledger = Arc::new(ledger);
        let aggregator = Arc::new(aggregator(ledger.clone()));

        let slow = tokio::spawn({
            let aggregator = Arc::clone(&aggregator);
            async move { aggregator.refresh("account_a").await }
        });
        let gate = ledger.gate.as_ref().unwrap();
        gate.entered.notified().await;

        let fresh = aggregator.refresh("account_a").await.unwrap();
        assert!(matches!(fresh, RefreshOutcome::Applied(ref s) if s.ticket == 2));

        gate.release.notify_one();
        let stale = slow.await.unwrap().unwrap();
        assert_eq!(stale, RefreshOutcome::Superseded { ticket: 1, latest: 2 });

        let table = aggregator.table_for("account_a").unwrap();
        assert!(table.get("resource_rr", "#2#").is_some());
        assert!(table.get("resource_rr", "#1#").is_none());
    }
}
