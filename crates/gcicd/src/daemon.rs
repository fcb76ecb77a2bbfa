//! Tier scheduling for the collector daemon
//!
//! Four independent loops, one per tier. A tick fans its collectors out in
//! parallel and waits for all of them before scheduling the next tick, so a
//! tier never overlaps itself; an overrunning tick just pushes the next one
//! back. Across tiers there is no ordering at all.

use gcic_collect::collectors::{registry, run_tier, Collector, CollectorContext, Tier};
use gcic_collect::CollectorOutcome;
use gcic_core::constants::{self, SHUTDOWN_GRACE};
use gcic_core::Result;
use gcic_db::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn};

/// Retention enforcement cadence for a long-lived daemon
const PRUNE_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Background data collector with tiered refresh
pub struct Daemon {
    ctx: Arc<CollectorContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
    /// Open the store and prepare the collector context
    pub async fn new() -> Result<Self> {
        let db = Database::open(&constants::db_path()).await?;
        db.set_control(constants::control_keys::DAEMON_STATE, "ok")
            .await?;
        db.set_control(constants::control_keys::NMAP_ACTIVE, "0")
            .await?;

        let (shutdown_tx, _) = broadcast::channel(4);
        Ok(Self {
            ctx: Arc::new(CollectorContext::new(db)),
            shutdown_tx,
        })
    }

    /// Handle for signal tasks to request shutdown
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until shutdown: four tier loops plus periodic pruning. On
    /// shutdown the tiers wind down cooperatively; in-flight collectors get
    /// a bounded grace period before the store is closed.
    pub async fn run(self) -> Result<()> {
        info!(
            "Collector daemon starting (fast={}s, medium={}s, slow={}s, glacial={}s)",
            constants::TIER_FAST.as_secs(),
            constants::TIER_MEDIUM.as_secs(),
            constants::TIER_SLOW.as_secs(),
            constants::TIER_GLACIAL.as_secs(),
        );

        let all = registry();
        let mut handles = Vec::with_capacity(Tier::ALL.len());
        for tier in Tier::ALL {
            let collectors: Vec<Arc<dyn Collector>> = all
                .iter()
                .filter(|c| c.tier() == tier)
                .cloned()
                .collect();
            let ctx = Arc::clone(&self.ctx);
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(tier_loop(tier, collectors, ctx, shutdown_rx)));
        }

        // Maintenance loop doubles as the shutdown wait. The first tick
        // fires immediately, covering the prune-on-startup contract.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut prune_ticker = interval(PRUNE_INTERVAL);
        prune_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = prune_ticker.tick() => {
                    match self.ctx.db.prune(constants::now_epoch()).await {
                        Ok(removed) => info!("Pruned {} expired rows", removed),
                        Err(e) => warn!("Prune failed: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        info!("Shutting down, draining in-flight collectors...");
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(
                "Collectors still in flight after {:?}, forcing exit",
                SHUTDOWN_GRACE
            );
        }

        // Let active writes finish before the WAL file is closed.
        self.ctx.db.close().await;
        info!("Collector daemon stopped");
        Ok(())
    }
}

async fn tier_loop(
    tier: Tier,
    collectors: Vec<Arc<dyn Collector>>,
    ctx: Arc<CollectorContext>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(tier.interval());
    // Never run a tick concurrently with itself: an overrun delays the
    // next tick rather than stacking it.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => break,
        }

        let results = run_tier(&ctx, &collectors).await;
        let collected: Vec<&str> = results
            .iter()
            .filter(|(_, outcome)| *outcome == CollectorOutcome::Ok)
            .map(|(name, _)| *name)
            .collect();
        if !collected.is_empty() {
            info!("[{}] collected: {}", tier.as_str(), collected.join(", "));
        }
    }
}
