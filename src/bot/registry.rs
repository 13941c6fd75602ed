//! Process-wide bot registry.
//!
//! The single piece of cross-bot shared state: a concurrent name-to-bot
//! map with atomic insert-if-absent, the anchor for "all bots" commands
//! and graceful shutdown, plus the global connect throttle.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::time::sleep;
use tracing::info;

use crate::error::Result;

use super::Bot;

/// Minimum spacing between connection attempts across the whole process.
pub const CONNECT_THROTTLE: Duration = Duration::from_secs(10);

/// Creates (but does not start) a bot from its on-disk configuration;
/// installed by the application bootstrap so the `!start` command can bring
/// up bots that were not running at process start.
pub trait BotFactory: Send + Sync {
    fn create(&self, name: &str) -> Result<Arc<Bot>>;
}

#[derive(Default)]
pub struct BotRegistry {
    bots: RwLock<HashMap<String, Arc<Bot>>>,
    factory: RwLock<Option<Arc<dyn BotFactory>>>,
    connect_throttle: tokio::sync::Mutex<()>,
}

impl BotRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install_factory(&self, factory: Arc<dyn BotFactory>) {
        *self.factory.write() = Some(factory);
    }

    #[must_use]
    pub fn factory(&self) -> Option<Arc<dyn BotFactory>> {
        self.factory.read().clone()
    }

    /// Registers a bot unless the name is taken. Returns whether this call
    /// registered it.
    pub fn insert_if_absent(&self, bot: Arc<Bot>) -> bool {
        match self.bots.write().entry(bot.name().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(bot);
                true
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Bot>> {
        self.bots.write().remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Bot>> {
        self.bots.read().get(name).cloned()
    }

    /// Current bots in name order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Bot>> {
        let mut bots: Vec<Arc<Bot>> = self.bots.read().values().cloned().collect();
        bots.sort_by(|a, b| a.name().cmp(b.name()));
        bots
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.bots.read().len()
    }

    /// Shuts down every registered bot concurrently and waits for all.
    pub async fn shutdown_all(&self) {
        let bots = self.snapshot();
        if bots.is_empty() {
            return;
        }
        info!(count = bots.len(), "shutting down all bots");
        join_all(bots.iter().map(|bot| bot.shutdown())).await;
    }

    /// Rate-limits connection attempts process-wide.
    pub async fn throttle_connect(&self) {
        let _gate = self.connect_throttle.lock().await;
        sleep(CONNECT_THROTTLE).await;
    }
}
