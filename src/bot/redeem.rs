//! Redeem-result correlation.
//!
//! A redeem with a reply flips the bot to indirect answering, arms a
//! one-shot sink and waits for the next purchase-response callback to fill
//! it. Correlations on one bot are serialized; a fresh channel per call
//! means no listener can accumulate across invocations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::warn;

use crate::domain::CdKey;
use crate::platform::PurchaseResult;

use super::Bot;

/// How long a redeem reply waits for the purchase response.
pub const REDEEM_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-bot redeem correlation state.
pub(crate) struct RedeemCoordinator {
    answer_directly: AtomicBool,
    pending: parking_lot::Mutex<Option<oneshot::Sender<String>>>,
    serial: tokio::sync::Mutex<()>,
}

impl RedeemCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            answer_directly: AtomicBool::new(true),
            pending: parking_lot::Mutex::new(None),
            serial: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether purchase responses go straight to master chat.
    pub(crate) fn answers_directly(&self) -> bool {
        self.answer_directly.load(Ordering::SeqCst)
    }

    /// Fulfils the pending correlation, if one is armed.
    pub(crate) fn complete(&self, summary: String) -> bool {
        if let Some(sender) = self.pending.lock().take() {
            sender.send(summary).is_ok()
        } else {
            false
        }
    }
}

/// Renders a purchase response for chat.
#[must_use]
pub fn summarize(result: &PurchaseResult, items: &[String]) -> String {
    if items.is_empty() {
        format!("Status: {result}")
    } else {
        format!("Status: {result} | Items: {}", items.join(", "))
    }
}

/// Redeems `key` on `bot` and returns the summary of the purchase response
/// the platform answers with.
pub async fn redeem_with_reply(bot: &Arc<Bot>, key: &CdKey) -> String {
    if !bot.is_running() {
        return "Bot is inactive and can't activate keys".to_string();
    }

    let coordinator = bot.redeem();
    let _serial = coordinator.serial.lock().await;

    coordinator.answer_directly.store(false, Ordering::SeqCst);
    let (sender, receiver) = oneshot::channel();
    *coordinator.pending.lock() = Some(sender);

    let outcome = match bot.client().redeem_key(key).await {
        Err(e) => {
            warn!(bot = %bot.name(), error = %e, "redeem request failed");
            format!("Status: Failed ({e})")
        }
        Ok(()) => match timeout(REDEEM_REPLY_TIMEOUT, receiver).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(_)) | Err(_) => {
                warn!(bot = %bot.name(), "no purchase response within timeout");
                "Status: Timeout".to_string()
            }
        },
    };

    *coordinator.pending.lock() = None;
    coordinator.answer_directly.store(true, Ordering::SeqCst);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_with_items() {
        assert_eq!(
            summarize(&PurchaseResult::Ok, &["Pack".to_string()]),
            "Status: OK | Items: Pack"
        );
    }

    #[test]
    fn summarize_without_items() {
        assert_eq!(summarize(&PurchaseResult::InvalidKey, &[]), "Status: InvalidKey");
    }

    #[test]
    fn coordinator_completes_once() {
        let coordinator = RedeemCoordinator::new();
        assert!(coordinator.answers_directly());
        assert!(!coordinator.complete("nothing pending".into()));

        let (sender, mut receiver) = oneshot::channel();
        *coordinator.pending.lock() = Some(sender);
        assert!(coordinator.complete("Status: OK".into()));
        assert_eq!(receiver.try_recv().unwrap(), "Status: OK");
        assert!(!coordinator.complete("again".into()));
    }
}
