//! Auto-release watcher - polls for delivered work past the grace window
//!
//! The engine keeps no internal scheduling state; time-based liveness comes
//! from an external caller invoking `auto_release` once the client grace
//! window elapses. This watcher is that caller: a polling collaborator that
//! periodically sweeps the engine for due engagements.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::EscrowEngine;

/// Configuration for the auto-release watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Sweep interval in seconds
    pub poll_interval_secs: u64,
    /// Identity the watcher presents when invoking `auto_release`
    pub actor_pubkey: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            actor_pubkey: "auto-release-watcher".to_string(),
        }
    }
}

/// Polling watcher that triggers auto release on due engagements
pub struct AutoReleaseWatcher {
    config: WatcherConfig,
    engine: Arc<EscrowEngine>,
}

impl AutoReleaseWatcher {
    pub fn new(config: WatcherConfig, engine: Arc<EscrowEngine>) -> Self {
        Self { config, engine }
    }

    /// Run one sweep, returning how many engagements were released
    ///
    /// A dispute may land between the due scan and the release call; the
    /// engine re-checks state under the engagement lock, so a lost race
    /// surfaces here as a rejected release, not a double disbursement.
    pub async fn sweep_once(&self) -> usize {
        let due = self.engine.due_for_auto_release().await;
        let mut released = 0;

        for engagement_id in due {
            match self
                .engine
                .auto_release(&self.config.actor_pubkey, engagement_id)
                .await
            {
                Ok(_) => released += 1,
                Err(err) => {
                    warn!("Auto release of engagement {} failed: {}", engagement_id, err);
                }
            }
        }

        released
    }

    /// Spawn the watcher as a background task sweeping on its interval
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
            loop {
                interval.tick().await;
                let released = self.sweep_once().await;
                if released > 0 {
                    info!("Auto-release sweep released {} engagements", released);
                }
            }
        })
    }
}
