//! End-to-end position lifecycle tests.
//!
//! A fake chain backs both the wallet double and the ledger double: the
//! wallet "executes" open and close manifests against it by reading their
//! literals, and the ledger serves its state back as holdings and receipt
//! data. Everything in between is the real crate: configuration loading,
//! planning, submission, the refresh trigger, the watcher, the aggregator
//! and the receipt decoder.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use ignition_client::account::AccountConnection;
use ignition_client::config::{BootstrapInformation, ConfigurationResolver};
use ignition_client::gateway::{
    GatewayError, LedgerQueryService, NonFungibleDataItem, NonFungibleHolding, ProgrammaticValue,
    VaultHolding,
};
use ignition_client::manifest::{extract_literals, LiteralKind, OpenPositionIntent};
use ignition_client::positions::PositionAggregator;
use ignition_client::session::{IgnitionSession, SessionError};
use ignition_client::trigger::RefreshTrigger;
use ignition_client::wallet::{TransactionHash, WalletInterface, WalletRejection};
use ignition_client::watcher::PositionWatcher;
use ignition_client::ConnectedAccount;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"{
    "network_id": 2,
    "resources": {
        "resource_btc": { "divisibility": 8, "name": "Bitcoin", "symbol": "BTC", "icon_url": "" },
        "resource_eth": { "divisibility": 18, "name": "Ether", "symbol": "ETH", "icon_url": "" }
    },
    "protocol": {
        "ignition_package_address": "package_ignition",
        "ignition": "component_ignition",
        "protocol_resource": "resource_xrd",
        "oracle_package_address": "package_oracle",
        "oracle": "component_oracle",
        "dapp_definition": "account_dapp",
        "reward_rates": { "3600": "0.1", "15778800": "0.25" }
    },
    "caviarnine": {
        "package": "package_c9",
        "pools": { "resource_btc": "pool_c9_btc", "resource_eth": "pool_c9_eth" },
        "adapter_package": "package_c9_adapter",
        "adapter": "component_c9_adapter",
        "receipt_resource": "resource_receipt_c9"
    },
    "ociswap": {
        "package": "package_oci",
        "pools": { "resource_btc": "pool_oci_btc" },
        "adapter_package": "package_oci_adapter",
        "adapter": "component_oci_adapter",
        "receipt_resource": "resource_receipt_oci"
    }
}"#;

const ACCOUNT: &str = "account_tdx_2_user";

/// Ledger state shared by the doubles: receipt resource → id → (pool,
/// amount).
#[derive(Default)]
struct FakeChain {
    receipts: Mutex<BTreeMap<String, BTreeMap<String, (String, String)>>>,
    next_id: Mutex<u64>,
    pool_receipts: BTreeMap<String, String>,
}

impl FakeChain {
    fn new(resolver: &ConfigurationResolver) -> Arc<Self> {
        let pool_receipts = resolver
            .venues()
            .flat_map(|(_, venue)| {
                venue
                    .pools
                    .values()
                    .map(move |pool| (pool.clone(), venue.receipt_resource.clone()))
            })
            .collect();
        Arc::new(Self {
            pool_receipts,
            ..Self::default()
        })
    }

    fn execute(&self, manifest: &str) -> Result<(), String> {
        let literals = extract_literals(manifest);
        let method = |name: &str| {
            literals
                .iter()
                .position(|l| l.kind == LiteralKind::String && l.value == name)
        };

        if let Some(at) = method("open_liquidity_position") {
            let pool = literals[at..]
                .iter()
                .find(|l| l.kind == LiteralKind::Address)
                .ok_or("no pool")?
                .value
                .clone();
            let amount = literals
                .iter()
                .find(|l| l.kind == LiteralKind::Decimal)
                .ok_or("no amount")?
                .value
                .clone();
            let receipt = self.pool_receipts.get(&pool).ok_or("unknown pool")?.clone();

            let mut next = self.next_id.lock();
            *next += 1;
            self.receipts
                .lock()
                .entry(receipt)
                .or_default()
                .insert(format!("#{}#", *next), (pool, amount));
            return Ok(());
        }

        if method("close_liquidity_position").is_some() {
            let at = literals
                .iter()
                .position(|l| l.kind == LiteralKind::NonFungibleLocalId)
                .ok_or("no local id")?;
            let id = literals[at].value.clone();
            let resource = literals[at - 1].value.clone();
            let mut receipts = self.receipts.lock();
            let removed = receipts.get_mut(&resource).and_then(|ids| ids.remove(&id));
            return removed.map(|_| ()).ok_or_else(|| format!("{id} not held"));
        }

        Ok(())
    }
}

struct FakeWallet {
    chain: Arc<FakeChain>,
    decline: Mutex<bool>,
    submitted: Mutex<u64>,
}

#[async_trait]
impl WalletInterface for FakeWallet {
    async fn send_transaction(&self, manifest: &str) -> Result<TransactionHash, WalletRejection> {
        if *self.decline.lock() {
            return Err(WalletRejection::UserDeclined);
        }
        self.chain.execute(manifest).map_err(WalletRejection::Rejected)?;
        let mut submitted = self.submitted.lock();
        *submitted += 1;
        Ok(TransactionHash::new(format!("txid_{}", *submitted)))
    }
}

struct FakeLedger {
    chain: Arc<FakeChain>,
}

fn receipt_payload(pool: &str, amount: &str) -> ProgrammaticValue {
    ProgrammaticValue::tuple(vec![
        ProgrammaticValue::named("I64", "maturity_date", "1700003600"),
        ProgrammaticValue::named("Decimal", "protocol_contribution_amount", "1000"),
        ProgrammaticValue::named("Decimal", "user_contribution_amount", amount),
        ProgrammaticValue::named("Reference", "user_resource_address", "resource_btc"),
        ProgrammaticValue::named("Reference", "pool_address", pool),
        ProgrammaticValue::named("String", "redemption_url", "https://example.com/r"),
        ProgrammaticValue::named("String", "lockup_period", "1 Hour"),
        ProgrammaticValue::named("String", "key_image_url", "https://example.com/k.png"),
        ProgrammaticValue::named("String", "description", "receipt"),
        ProgrammaticValue::named("String", "name", "Liquidity Participation Receipt"),
    ])
}

#[async_trait]
impl LedgerQueryService for FakeLedger {
    async fn entity_details_vault_aggregated(
        &self,
        _account: &str,
    ) -> Result<Vec<NonFungibleHolding>, GatewayError> {
        Ok(self
            .chain
            .receipts
            .lock()
            .iter()
            .map(|(resource, ids)| NonFungibleHolding {
                resource_address: resource.clone(),
                vaults: vec![VaultHolding {
                    vault_address: format!("internal_vault_{resource}"),
                    local_ids: ids.keys().cloned().collect(),
                }],
            })
            .collect())
    }

    async fn non_fungible_data(
        &self,
        resource: &str,
        ids: &[String],
    ) -> Result<Vec<NonFungibleDataItem>, GatewayError> {
        let receipts = self.chain.receipts.lock();
        let Some(held) = receipts.get(resource) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                held.get(id).map(|(pool, amount)| NonFungibleDataItem {
                    non_fungible_id: id.clone(),
                    is_burned: false,
                    data: Some(receipt_payload(pool, amount)),
                })
            })
            .collect())
    }
}

/// The whole client wired together, with a running watcher.
struct Client {
    session: IgnitionSession,
    aggregator: Arc<PositionAggregator>,
    connection: AccountConnection,
    wallet: Arc<FakeWallet>,
    shutdown: watch::Sender<bool>,
    watcher: tokio::task::JoinHandle<()>,
    _config: tempfile::NamedTempFile,
}

fn start_client() -> Client {
    let mut config = tempfile::NamedTempFile::new().expect("temp config");
    config.write_all(CONFIG.as_bytes()).unwrap();

    let bootstrap = BootstrapInformation::load(config.path()).unwrap();
    let resolver = Arc::new(ConfigurationResolver::new(bootstrap).unwrap());
    let chain = FakeChain::new(&resolver);

    let wallet = Arc::new(FakeWallet {
        chain: Arc::clone(&chain),
        decline: Mutex::new(false),
        submitted: Mutex::new(0),
    });
    let ledger = Arc::new(FakeLedger { chain });

    let trigger = RefreshTrigger::new();
    let connection = AccountConnection::new();
    let aggregator = Arc::new(PositionAggregator::new(ledger, Arc::clone(&resolver)));
    let session = IgnitionSession::new(resolver, wallet.clone(), trigger.clone());

    let (shutdown, shutdown_rx) = watch::channel(false);
    let watcher = tokio::spawn(
        PositionWatcher::new(
            Arc::clone(&aggregator),
            connection.subscribe(),
            trigger.subscribe(),
        )
        .run(shutdown_rx),
    );

    Client {
        session,
        aggregator,
        connection,
        wallet,
        shutdown,
        watcher,
        _config: config,
    }
}

impl Client {
    /// Waits until the table for the test account has `count` positions.
    async fn wait_for_positions(&self, count: usize) {
        for _ in 0..200 {
            if self
                .aggregator
                .table_for(ACCOUNT)
                .is_some_and(|table| table.len() == count)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("table never reached {count} positions");
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        self.watcher.await.unwrap();
    }
}

fn account() -> ConnectedAccount {
    ConnectedAccount::Connected(ACCOUNT.to_string())
}

fn btc_intent(venue: &str) -> OpenPositionIntent {
    OpenPositionIntent::new()
        .with_venue(venue)
        .with_resource("resource_btc")
        .with_amount("0.5")
        .with_lockup(3600)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_then_close_round_trip() {
    let client = start_client();
    client.connection.connect(ACCOUNT);
    client.wait_for_positions(0).await;

    client
        .session
        .open_position(&account(), &btc_intent("Caviarnine"))
        .await
        .unwrap();
    client.wait_for_positions(1).await;

    let table = client.aggregator.table_for(ACCOUNT).unwrap();
    let (resource, id, receipt) = table.iter().next().unwrap();
    assert_eq!(resource, "resource_receipt_c9");
    assert_eq!(receipt.pool_address, "pool_c9_btc");
    assert_eq!(receipt.user_contribution_amount, "0.5");
    let id = id.to_string();

    client
        .session
        .close_position(&account(), "resource_receipt_c9", &id)
        .await
        .unwrap();
    client.wait_for_positions(0).await;

    client.stop().await;
}

#[tokio::test]
async fn positions_group_by_venue_receipt() {
    let client = start_client();
    client.connection.connect(ACCOUNT);

    client
        .session
        .open_position(&account(), &btc_intent("Caviarnine"))
        .await
        .unwrap();
    client
        .session
        .open_position(&account(), &btc_intent("Ociswap"))
        .await
        .unwrap();
    client.wait_for_positions(2).await;

    let table = client.aggregator.table_for(ACCOUNT).unwrap();
    let resources: Vec<_> = table.resources().collect();
    assert_eq!(resources, ["resource_receipt_c9", "resource_receipt_oci"]);
    let resolver = client.session.resolver();
    let venues: Vec<_> = resources
        .iter()
        .map(|r| resolver.venue_for_receipt(r).unwrap())
        .collect();
    assert_eq!(venues, ["Caviarnine", "Ociswap"]);

    client.stop().await;
}

#[tokio::test]
async fn declined_submission_changes_nothing() {
    let client = start_client();
    client.connection.connect(ACCOUNT);
    client.wait_for_positions(0).await;
    let before = client.aggregator.snapshot().unwrap();

    *client.wallet.decline.lock() = true;
    let err = client
        .session
        .open_position(&account(), &btc_intent("Caviarnine"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Submission(_)));
    assert!(client.session.trigger().last_transaction().is_none());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(client.aggregator.snapshot().unwrap().ticket, before.ticket);

    client.stop().await;
}

#[tokio::test]
async fn unpooled_resource_is_refused_before_the_wallet() {
    let client = start_client();

    let intent = OpenPositionIntent::new()
        .with_venue("Ociswap")
        .with_resource("resource_eth")
        .with_amount("1")
        .with_lockup(3600);
    let err = client
        .session
        .open_position(&account(), &intent)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Intent(_)));
    assert_eq!(*client.wallet.submitted.lock(), 0);

    client.stop().await;
}

#[tokio::test]
async fn switching_accounts_replaces_table() {
    let client = start_client();
    client.connection.connect(ACCOUNT);
    client
        .session
        .open_position(&account(), &btc_intent("Caviarnine"))
        .await
        .unwrap();
    client.wait_for_positions(1).await;

    client.connection.connect("account_tdx_2_other");
    for _ in 0..200 {
        if client.aggregator.table_for("account_tdx_2_other").is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(client.aggregator.table_for(ACCOUNT).is_none());
    assert!(client.aggregator.table_for("account_tdx_2_other").is_some());

    client.stop().await;
}
