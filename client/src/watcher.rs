//! Keeps the position table in step with the account and with submissions.
//!
//! [`PositionWatcher::run`] waits on three channels: the connected account,
//! the refresh trigger and shutdown. Any change of the first two starts a
//! new refresh and drops the one in flight. Dropping is only a courtesy to
//! the gateway: the aggregator's tickets already keep a late result from
//! being applied.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::account::ConnectedAccount;
use crate::positions::{PositionAggregator, RefreshOutcome};
use crate::trigger::RefreshSignal;

/// Drives [`PositionAggregator::refresh`] from account and trigger changes.
pub struct PositionWatcher {
    aggregator: Arc<PositionAggregator>,
    accounts: watch::Receiver<ConnectedAccount>,
    refreshes: watch::Receiver<RefreshSignal>,
}

impl PositionWatcher {
    /// Wires the watcher to the account and refresh channels.
    pub fn new(
        aggregator: Arc<PositionAggregator>,
        accounts: watch::Receiver<ConnectedAccount>,
        refreshes: watch::Receiver<RefreshSignal>,
    ) -> Self {
        Self {
            aggregator,
            accounts,
            refreshes,
        }
    }

    /// Runs until `shutdown` flips or either input channel closes.
    ///
    /// Refreshes once at start for whatever account is current.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("position watcher starting");
        let mut in_flight = self.start_refresh();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = self.accounts.changed() => {
                    if changed.is_err() {
                        debug!("account channel closed");
                        break;
                    }
                    in_flight = self.start_refresh();
                }
                changed = self.refreshes.changed() => {
                    if changed.is_err() {
                        debug!("refresh trigger closed");
                        break;
                    }
                    in_flight = self.start_refresh();
                }
                _ = settle(&mut in_flight) => {
                    in_flight = None;
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        info!("position watcher stopped");
    }

    /// Marks both inputs seen and returns a refresh for the current
    /// account, or clears the table if there is none.
    fn start_refresh(&mut self) -> Option<BoxFuture<'static, ()>> {
        let account = self.accounts.borrow_and_update().clone();
        let version = self.refreshes.borrow_and_update().version;

        let Some(address) = account.address().map(str::to_string) else {
            debug!(?account, "no connected account, clearing positions");
            self.aggregator.invalidate();
            return None;
        };

        debug!(account = %address, version, "starting position refresh");
        let aggregator = Arc::clone(&self.aggregator);
        Some(Box::pin(async move {
            match aggregator.refresh(&address).await {
                Ok(RefreshOutcome::Applied(snapshot)) => {
                    debug!(ticket = snapshot.ticket, "refresh applied");
                }
                Ok(RefreshOutcome::Superseded { ticket, latest }) => {
                    debug!(ticket, latest, "refresh superseded");
                }
                Err(e) => {
                    warn!(account = %address, error = %e, "refresh failed");
                }
            }
        }))
    }
}

/// Completes when the in-flight refresh does; pends forever if there is
/// none.
async fn settle(in_flight: &mut Option<BoxFuture<'static, ()>>) {
    match in_flight.as_mut() {
        Some(refresh) => refresh.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountConnection;
    use crate::config::tests::sample_resolver;
    use crate::positions::tests::{holding, item, MockLedger};
    use crate::trigger::RefreshTrigger;
    use crate::wallet::TransactionHash;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        ledger: Arc<MockLedger>,
        aggregator: Arc<PositionAggregator>,
        connection: AccountConnection,
        trigger: RefreshTrigger,
        shutdown: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_watcher(ledger: MockLedger) -> Harness {
        let ledger = Arc::new(ledger);
        let aggregator = Arc::new(PositionAggregator::new(
            ledger.clone(),
            Arc::new(sample_resolver()),
        ));
        let connection = AccountConnection::new();
        let trigger = RefreshTrigger::new();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let watcher = PositionWatcher::new(
            Arc::clone(&aggregator),
            connection.subscribe(),
            trigger.subscribe(),
        );
        let handle = tokio::spawn(watcher.run(shutdown_rx));

        Harness {
            ledger,
            aggregator,
            connection,
            trigger,
            shutdown,
            handle,
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    fn one_position() -> MockLedger {
        MockLedger::with(
            vec![holding("resource_rr", &[&["#1#"]])],
            vec![("resource_rr", vec![item("#1#", "pool_p1", "500")])],
        )
    }

    #[tokio::test]
    async fn pending_account_does_not_query() {
        let h = spawn_watcher(one_position());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(h.ledger.detail_calls.load(Ordering::SeqCst), 0);
        assert!(h.aggregator.snapshot().is_none());

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test]
    async fn connecting_refreshes() {
        let h = spawn_watcher(one_position());
        h.connection.connect("account_a");

        let aggregator = Arc::clone(&h.aggregator);
        wait_for(move || aggregator.table_for("account_a").is_some()).await;
        assert_eq!(h.aggregator.table_for("account_a").unwrap().len(), 1);

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test]
    async fn submission_triggers_refresh() {
        let h = spawn_watcher(one_position());
        h.connection.connect("account_a");
        let ledger = Arc::clone(&h.ledger);
        wait_for(move || ledger.detail_calls.load(Ordering::SeqCst) == 1).await;

        h.trigger.record(TransactionHash::new("txid_1"));
        let ledger = Arc::clone(&h.ledger);
        wait_for(move || ledger.detail_calls.load(Ordering::SeqCst) == 2).await;

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_clears_table() {
        let h = spawn_watcher(one_position());
        h.connection.connect("account_a");
        let aggregator = Arc::clone(&h.aggregator);
        wait_for(move || aggregator.snapshot().is_some()).await;

        h.connection.disconnect();
        let aggregator = Arc::clone(&h.aggregator);
        wait_for(move || aggregator.snapshot().is_none()).await;

        h.shutdown.send(true).unwrap();
        h.handle.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_watcher() {
        let h = spawn_watcher(one_position());
        h.shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), h.handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
