//! Canned-page [`WebClient`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::domain::{AppId, SteamId};
use crate::error::Result;
use crate::web::WebClient;

/// Web double serving preloaded HTML.
///
/// Badge pages are keyed by page number. Per-game pages are queues: each
/// fetch pops the next response until one remains, which then repeats.
/// Convenient for scripting "cards left, cards left, done" sequences.
#[derive(Default)]
pub struct FakeWebClient {
    badge_pages: parking_lot::Mutex<HashMap<u32, String>>,
    game_pages: parking_lot::Mutex<HashMap<u32, VecDeque<String>>>,
    init_count: AtomicU32,
    last_pin: parking_lot::Mutex<Option<String>>,
    badge_fetches: AtomicU32,
    game_fetches: AtomicU32,
}

impl FakeWebClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_badge_page(&self, page: u32, html: impl Into<String>) {
        self.badge_pages.lock().insert(page, html.into());
    }

    /// Queues one per-game page response for `app_id`.
    pub fn push_game_page(&self, app_id: AppId, html: impl Into<String>) {
        self.game_pages
            .lock()
            .entry(app_id.value())
            .or_default()
            .push_back(html.into());
    }

    #[must_use]
    pub fn init_count(&self) -> u32 {
        self.init_count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_pin(&self) -> Option<String> {
        self.last_pin.lock().clone()
    }

    #[must_use]
    pub fn badge_fetches(&self) -> u32 {
        self.badge_fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn game_fetches(&self) -> u32 {
        self.game_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebClient for FakeWebClient {
    async fn init_session(&self, _steam_id: SteamId, parental_pin: &str) -> Result<()> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        *self.last_pin.lock() = Some(parental_pin.to_string());
        Ok(())
    }

    async fn badge_page(&self, page: u32) -> Result<Option<String>> {
        self.badge_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.badge_pages.lock().get(&page).cloned())
    }

    async fn game_cards_page(&self, app_id: AppId) -> Result<Option<String>> {
        self.game_fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.game_pages.lock();
        let Some(queue) = pages.get_mut(&app_id.value()) else {
            return Ok(None);
        };
        let html = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(html)
    }
}
