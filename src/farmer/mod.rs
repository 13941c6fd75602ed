//! The per-bot farming scheduler and play-loop state machine.
//!
//! A farming round scans the badge pages into the farm queue, then drives
//! the platform's play operations until every queued title has dropped its
//! remaining cards. Restricted accounts go through the two-phase algorithm:
//! multiplexed playtime accrual up to the bump threshold, then per-title
//! solo play to drain drops.

pub mod pages;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::bot::Bot;
use crate::domain::{AppId, FarmQueue, Game};

use self::pages::BadgeRow;

/// Wait window between card-drop resamples while playing.
pub const FARMING_DELAY: Duration = Duration::from_secs(15 * 60);

/// Upper bound on continuously farming a single title in one pass.
pub const MAX_FARMING_TIME: Duration = Duration::from_secs(10 * 60 * 60);

/// Play-hours a restricted account needs per title before drops happen.
pub const HOURS_TO_BUMP: f32 = 2.0;

/// Platform cap on simultaneously played titles.
pub const MAX_GAMES_PLAYED_CONCURRENTLY: usize = 32;

/// App ids excluded from farming regardless of per-bot configuration.
pub const GLOBAL_BLACKLIST: [AppId; 3] = [
    AppId::new(303_700),
    AppId::new(335_590),
    AppId::new(368_020),
];

/// Free-to-play ids whose badge rows are known to misreport zero remaining
/// drops; these get a per-game re-check instead of being skipped outright.
pub const UNTRUSTED_APP_IDS: [AppId; 3] = [AppId::new(440), AppId::new(570), AppId::new(730)];

/// Remaining-time estimate per pending card, in hours.
const HOURS_PER_CARD_ESTIMATE: f32 = 0.5;

const STOP_POLL_INTERVAL: Duration = Duration::from_secs(1);
const STOP_POLL_ATTEMPTS: u32 = 5;

/// Snapshot of farming state for status rendering.
#[derive(Debug, Clone)]
pub struct FarmerStatus {
    pub now_farming: bool,
    pub paused: bool,
    pub games_left: usize,
    pub cards_left: u32,
    pub currently_farming: Vec<String>,
}

impl FarmerStatus {
    /// Remaining-time estimate in hours for the queued cards.
    #[must_use]
    pub fn estimated_hours(&self) -> f32 {
        self.cards_left as f32 * HOURS_PER_CARD_ESTIMATE
    }
}

/// The farming scheduler of one bot.
pub struct CardsFarmer {
    bot: Weak<Bot>,
    games_to_farm: RwLock<FarmQueue>,
    currently_farming: RwLock<Vec<Game>>,
    now_farming: AtomicBool,
    keep_farming: AtomicBool,
    paused: AtomicBool,
    sticky_pause: AtomicBool,
    /// Signalled by new-items notifications and by `stop_farming` to
    /// shorten the current play window. A permit stored while the loop is
    /// between waits is not lost.
    farm_reset: Notify,
    /// Serializes the start/stop phases of a round.
    farming_semaphore: Mutex<()>,
}

impl CardsFarmer {
    pub(crate) fn new(bot: Weak<Bot>) -> Self {
        Self {
            bot,
            games_to_farm: RwLock::new(FarmQueue::new()),
            currently_farming: RwLock::new(Vec::new()),
            now_farming: AtomicBool::new(false),
            keep_farming: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            sticky_pause: AtomicBool::new(false),
            farm_reset: Notify::new(),
            farming_semaphore: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn now_farming(&self) -> bool {
        self.now_farming.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Snapshot for status rendering.
    #[must_use]
    pub fn status(&self) -> FarmerStatus {
        let queue = self.games_to_farm.read();
        FarmerStatus {
            now_farming: self.now_farming(),
            paused: self.paused(),
            games_left: queue.len(),
            cards_left: queue.cards_remaining(),
            currently_farming: self
                .currently_farming
                .read()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Runs a full farming round to completion.
    ///
    /// Re-entrant calls while a round is active are no-ops, as are calls
    /// while paused or while the session cannot play. Fires
    /// `Bot::on_farming_finished` exactly once when the queue drains.
    pub async fn start_farming(&self) {
        let Some(bot) = self.bot.upgrade() else { return };
        if self.now_farming() || self.paused() || !bot.is_farmable() {
            return;
        }

        let scanned_anything = {
            let _slot = self.farming_semaphore.lock().await;
            if self.now_farming() || self.paused() || !bot.is_farmable() {
                return;
            }
            if self.is_anything_to_farm(&bot).await {
                let (games, cards) = {
                    let queue = self.games_to_farm.read();
                    (queue.len(), queue.cards_remaining())
                };
                info!(
                    bot = %bot.name(),
                    games,
                    cards,
                    estimated_hours = cards as f32 * HOURS_PER_CARD_ESTIMATE,
                    "farming started"
                );
                self.keep_farming.store(true, Ordering::SeqCst);
                self.now_farming.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        };

        if !scanned_anything {
            info!(bot = %bot.name(), "no card drops left to farm");
            bot.on_farming_finished(true).await;
            return;
        }

        loop {
            let finished_cleanly = if bot.config().card_drops_restricted {
                self.farm_restricted(&bot).await
            } else {
                self.farm_simple(&bot).await
            };
            if !finished_cleanly {
                self.currently_farming.write().clear();
                self.now_farming.store(false, Ordering::SeqCst);
                info!(bot = %bot.name(), "farming stopped");
                return;
            }
            if !self.is_anything_to_farm(&bot).await {
                break;
            }
        }

        self.currently_farming.write().clear();
        self.now_farming.store(false, Ordering::SeqCst);
        info!(bot = %bot.name(), "farming finished");
        bot.on_farming_finished(true).await;
    }

    /// Cooperatively ends the active round and waits for the loop to
    /// observe the signal. A loop that fails to react within the poll
    /// budget has its sentinel flag forced clear.
    pub async fn stop_farming(&self) {
        let _slot = self.farming_semaphore.lock().await;
        if !self.now_farming() {
            return;
        }
        self.keep_farming.store(false, Ordering::SeqCst);
        self.farm_reset.notify_one();

        for _ in 0..STOP_POLL_ATTEMPTS {
            if !self.now_farming() {
                return;
            }
            sleep(STOP_POLL_INTERVAL).await;
        }
        if self.now_farming.swap(false, Ordering::SeqCst) {
            warn!("farming loop did not observe stop in time, forcing idle state");
        }
    }

    /// Pauses farming. A sticky pause survives non-user resume attempts.
    pub async fn pause(&self, sticky: bool) {
        if sticky {
            self.sticky_pause.store(true, Ordering::SeqCst);
        }
        self.paused.store(true, Ordering::SeqCst);
        if self.now_farming() {
            self.stop_farming().await;
        }
    }

    /// Clears the pause and starts a round if none is active. Only an
    /// explicit user action clears a sticky pause.
    pub async fn resume(&self, user_action: bool) {
        if self.sticky_pause.load(Ordering::SeqCst) && !user_action {
            debug!("not resuming, sticky pause in effect");
            return;
        }
        if user_action {
            self.sticky_pause.store(false, Ordering::SeqCst);
        }
        self.paused.store(false, Ordering::SeqCst);
        if !self.now_farming() {
            self.start_farming().await;
        }
    }

    /// Reacts to a new title landing on the account: start a round if idle,
    /// or re-plan an active restricted round that still has games below the
    /// bump threshold.
    pub async fn on_new_game_added(&self) {
        if !self.now_farming() {
            self.start_farming().await;
            return;
        }
        let Some(bot) = self.bot.upgrade() else { return };
        if !bot.config().card_drops_restricted {
            return;
        }
        let needs_replan = self
            .games_to_farm
            .read()
            .iter()
            .any(|g| g.hours_played() < HOURS_TO_BUMP);
        if needs_replan {
            info!(bot = %bot.name(), "replanning restricted farming round");
            self.stop_farming().await;
            self.start_farming().await;
        }
    }

    /// New inventory items arrived: shorten the current play window so the
    /// loop resamples drops immediately.
    pub fn on_new_items_notification(&self) {
        if self.now_farming() {
            self.farm_reset.notify_one();
        } else {
            debug!("new items while idle");
        }
    }

    /// Fire-and-forget stop on connection loss.
    pub fn on_disconnected(&self) {
        if let Some(bot) = self.bot.upgrade() {
            tokio::spawn(async move { bot.farmer().stop_farming().await });
        }
    }

    async fn farm_simple(&self, bot: &Arc<Bot>) -> bool {
        loop {
            let game = self.games_to_farm.read().first().cloned();
            let Some(game) = game else { return true };
            if !self.farm_solo(bot, game).await {
                return false;
            }
        }
    }

    async fn farm_restricted(&self, bot: &Arc<Bot>) -> bool {
        loop {
            let solo = {
                let queue = self.games_to_farm.read();
                if queue.is_empty() {
                    return true;
                }
                if queue.len() == 1 {
                    queue.to_vec()
                } else {
                    queue.with_hours_at_least(HOURS_TO_BUMP)
                }
            };

            if solo.is_empty() {
                let picked = self
                    .games_to_farm
                    .read()
                    .top_by_hours(MAX_GAMES_PLAYED_CONCURRENTLY);
                if !self.farm_multiple(bot, picked).await {
                    return false;
                }
            } else {
                for game in solo {
                    if !self.farm_solo(bot, game).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Plays one title until its drops drain, the per-title time budget
    /// runs out, or the round is stopped. Returns whether the round may
    /// continue.
    async fn farm_solo(&self, bot: &Arc<Bot>, mut game: Game) -> bool {
        info!(bot = %bot.name(), game = %game, hours = game.hours_played(), "now farming");
        if let Err(e) = bot.client().play_game(game.app_id()).await {
            warn!(bot = %bot.name(), game = %game, error = %e, "failed to start playing");
        }
        *self.currently_farming.write() = vec![game.clone()];

        let deadline = Instant::now() + MAX_FARMING_TIME;
        while self.keep_farming.load(Ordering::SeqCst) && Instant::now() < deadline {
            let window = Instant::now();
            let signalled = timeout(FARMING_DELAY, self.farm_reset.notified())
                .await
                .is_ok();
            let hours = window.elapsed().as_secs_f32() / 3600.0;
            game.add_hours(hours);
            if let Some(entry) = self.games_to_farm.write().get_mut(game.app_id()) {
                entry.add_hours(hours);
            }
            if signalled {
                debug!(bot = %bot.name(), game = %game, "play window shortened");
            }
            if !self.keep_farming.load(Ordering::SeqCst) {
                break;
            }

            if self.should_farm(bot, &game).await == Some(false) {
                self.games_to_farm.write().remove(game.app_id());
                self.currently_farming.write().clear();
                info!(bot = %bot.name(), game = %game, "done farming");
                return self.keep_farming.load(Ordering::SeqCst);
            }
        }

        self.currently_farming.write().clear();
        self.keep_farming.load(Ordering::SeqCst)
    }

    /// Plays a set of titles multiplexed until the best of them crosses the
    /// bump threshold. Returns whether the round may continue.
    async fn farm_multiple(&self, bot: &Arc<Bot>, games: Vec<Game>) -> bool {
        if games.is_empty() {
            return true;
        }
        let ids: Vec<AppId> = games.iter().map(Game::app_id).collect();
        info!(bot = %bot.name(), count = games.len(), "farming playtime across multiple titles");
        if let Err(e) = bot.client().play_games(&ids).await {
            warn!(bot = %bot.name(), error = %e, "failed to start playing");
        }
        *self.currently_farming.write() = games.clone();

        let mut games = games;
        while self.keep_farming.load(Ordering::SeqCst)
            && games
                .iter()
                .map(Game::hours_played)
                .fold(0.0_f32, f32::max)
                < HOURS_TO_BUMP
        {
            let window = Instant::now();
            let _ = timeout(FARMING_DELAY, self.farm_reset.notified()).await;
            let hours = window.elapsed().as_secs_f32() / 3600.0;
            let mut queue = self.games_to_farm.write();
            for game in &mut games {
                game.add_hours(hours);
                if let Some(entry) = queue.get_mut(game.app_id()) {
                    entry.add_hours(hours);
                }
            }
        }

        self.currently_farming.write().clear();
        self.keep_farming.load(Ordering::SeqCst)
    }

    /// Rebuilds the farm queue from the badge pages. Page 1 establishes the
    /// pagination bound; the remaining pages are scanned concurrently.
    async fn is_anything_to_farm(&self, bot: &Arc<Bot>) -> bool {
        self.games_to_farm.write().clear();

        let first = match bot.web().badge_page(1).await {
            Ok(Some(html)) => html,
            Ok(None) => {
                warn!(bot = %bot.name(), "badges page unavailable");
                return false;
            }
            Err(e) => {
                warn!(bot = %bot.name(), error = %e, "badges page fetch failed");
                return false;
            }
        };

        let page = pages::parse_badge_page(&first);
        self.check_rows(bot, page.rows).await;

        if page.last_page > 1 {
            let scans = (2..=page.last_page).map(|number| self.check_page(bot, number));
            join_all(scans).await;
        }

        let mut queue = self.games_to_farm.write();
        queue.sort(bot.config().farming_order);
        !queue.is_empty()
    }

    async fn check_page(&self, bot: &Arc<Bot>, page_number: u32) {
        let html = match bot.web().badge_page(page_number).await {
            Ok(Some(html)) => html,
            Ok(None) => {
                warn!(bot = %bot.name(), page = page_number, "badge page unavailable");
                return;
            }
            Err(e) => {
                warn!(bot = %bot.name(), page = page_number, error = %e, "badge page fetch failed");
                return;
            }
        };
        let page = pages::parse_badge_page(&html);
        self.check_rows(bot, page.rows).await;
    }

    async fn check_rows(&self, bot: &Arc<Bot>, rows: Vec<BadgeRow>) {
        let mut deferred = Vec::new();
        for row in rows {
            if self.is_blacklisted(bot, row.app_id) {
                debug!(bot = %bot.name(), app_id = %row.app_id, "skipping blacklisted app");
                continue;
            }
            if row.cards_remaining > 0 {
                self.games_to_farm.write().push(Game::new(
                    row.app_id,
                    row.name,
                    row.hours_played,
                    row.cards_remaining,
                ));
                continue;
            }
            if !UNTRUSTED_APP_IDS.contains(&row.app_id) {
                continue;
            }
            deferred.push(self.check_game(bot, row.app_id, row.name, row.hours_played));
        }
        join_all(deferred).await;
    }

    /// Re-queries one untrusted title whose badge row reported zero
    /// remaining drops. The per-game page decides: an earned count above
    /// zero confirms the badge row, otherwise a positive remaining count
    /// puts the game on the queue after all.
    async fn check_game(&self, bot: &Arc<Bot>, app_id: AppId, name: String, hours: f32) {
        let html = match bot.web().game_cards_page(app_id).await {
            Ok(Some(html)) => html,
            Ok(None) | Err(_) => {
                warn!(bot = %bot.name(), app_id = %app_id, "game cards page unavailable");
                return;
            }
        };
        if pages::parse_cards_earned(&html).unwrap_or(0) > 0 {
            return;
        }
        let Some(remaining) = pages::parse_cards_remaining(&html) else {
            return;
        };
        if remaining == 0 {
            return;
        }
        if self
            .games_to_farm
            .write()
            .push(Game::new(app_id, name, hours, remaining))
        {
            debug!(bot = %bot.name(), app_id = %app_id, remaining, "re-check added untrusted app");
        }
    }

    /// Resamples the per-game page. `Some(true)` keeps farming, `Some(false)`
    /// means drops drained, `None` is a transient fetch failure and the
    /// caller keeps playing.
    async fn should_farm(&self, bot: &Arc<Bot>, game: &Game) -> Option<bool> {
        let html = match bot.web().game_cards_page(game.app_id()).await {
            Ok(Some(html)) => html,
            Ok(None) => {
                warn!(bot = %bot.name(), game = %game, "cards page unavailable");
                return None;
            }
            Err(e) => {
                warn!(bot = %bot.name(), game = %game, error = %e, "cards page fetch failed");
                return None;
            }
        };
        let remaining = pages::parse_cards_remaining(&html)?;
        if let Some(entry) = self.games_to_farm.write().get_mut(game.app_id()) {
            entry.set_cards_remaining(remaining);
        }
        debug!(bot = %bot.name(), game = %game, remaining, "resampled card drops");
        Some(remaining > 0)
    }

    fn is_blacklisted(&self, bot: &Arc<Bot>, app_id: AppId) -> bool {
        GLOBAL_BLACKLIST.contains(&app_id) || bot.config().blacklist.contains(&app_id)
    }
}
