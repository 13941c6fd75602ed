//! Per-account session supervisor.
//!
//! A bot wires one platform connection, one web client and one farming
//! scheduler together, hosts the callback pump that drives all per-session
//! handlers in order, and recovers the session across disconnects. No
//! handler lets an error escape; they log and return.

pub mod commands;
pub mod redeem;
pub mod registry;

use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::app::config::BotConfig;
use crate::domain::SteamId;
use crate::error::Result;
use crate::farmer::CardsFarmer;
use crate::platform::{
    Callback, ConnectResult, CredentialPrompt, CredentialsPrompter, FriendEntry,
    FriendRelationship, LogOnDetails, LogonResult, MachineAuthChunk, MachineAuthResponse,
    NotificationKind, PlatformClient, PurchaseResult,
};
use crate::web::WebClient;

pub use registry::{BotFactory, BotRegistry};

/// Poll interval of the callback pump.
pub const CALLBACK_TICK: Duration = Duration::from_millis(500);

/// Back-off after the platform rejects the password outright.
pub const INVALID_PASSWORD_BACKOFF: Duration = Duration::from_secs(25 * 60);

/// Group chat joined after logon when statistics participation is enabled.
pub const STATISTICS_GROUP_ID: SteamId = SteamId::new(103_582_791_440_160_998);

/// One account session: supervisor over platform client, web client and
/// farming scheduler.
pub struct Bot {
    name: String,
    /// Self-handle for spawning tasks that outlive the current call.
    weak: std::sync::Weak<Bot>,
    config: BotConfig,
    client: Arc<dyn PlatformClient>,
    web: Arc<dyn WebClient>,
    prompter: Arc<dyn CredentialsPrompter>,
    registry: Arc<BotRegistry>,
    farmer: CardsFarmer,
    running: AtomicBool,
    logged_on: AtomicBool,
    steam_id: parking_lot::Mutex<SteamId>,
    /// Email Steam-Guard code captured for the next logon attempt.
    auth_code: parking_lot::Mutex<Option<String>>,
    /// TOTP code captured for the next logon attempt.
    two_factor_code: parking_lot::Mutex<Option<String>>,
    cached_login: parking_lot::Mutex<Option<String>>,
    cached_password: parking_lot::Mutex<Option<String>>,
    cached_pin: parking_lot::Mutex<Option<String>>,
    sentry_path: PathBuf,
    redeem: redeem::RedeemCoordinator,
    pump_cancel: parking_lot::Mutex<Option<watch::Sender<bool>>>,
    started_at: parking_lot::Mutex<Option<DateTime<Utc>>>,
}

impl Bot {
    /// Builds a bot around its capabilities. The sentry blob lives next to
    /// the configuration as `<name>.bin` under `data_dir`.
    pub fn new(
        config: BotConfig,
        client: Arc<dyn PlatformClient>,
        web: Arc<dyn WebClient>,
        prompter: Arc<dyn CredentialsPrompter>,
        registry: Arc<BotRegistry>,
        data_dir: PathBuf,
    ) -> Arc<Self> {
        let name = config.name.clone();
        let sentry_path = data_dir.join(format!("{name}.bin"));
        Arc::new_cyclic(|weak| Self {
            name,
            weak: weak.clone(),
            config,
            client,
            web,
            prompter,
            registry,
            farmer: CardsFarmer::new(weak.clone()),
            running: AtomicBool::new(false),
            logged_on: AtomicBool::new(false),
            steam_id: parking_lot::Mutex::new(SteamId::NONE),
            auth_code: parking_lot::Mutex::new(None),
            two_factor_code: parking_lot::Mutex::new(None),
            cached_login: parking_lot::Mutex::new(None),
            cached_password: parking_lot::Mutex::new(None),
            cached_pin: parking_lot::Mutex::new(None),
            sentry_path,
            redeem: redeem::RedeemCoordinator::new(),
            pump_cancel: parking_lot::Mutex::new(None),
            started_at: parking_lot::Mutex::new(None),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }

    #[must_use]
    pub fn web(&self) -> &Arc<dyn WebClient> {
        &self.web
    }

    #[must_use]
    pub fn farmer(&self) -> &CardsFarmer {
        &self.farmer
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the session can issue play operations right now.
    #[must_use]
    pub fn is_farmable(&self) -> bool {
        self.is_running() && self.logged_on.load(Ordering::SeqCst)
    }

    pub(crate) fn redeem(&self) -> &redeem::RedeemCoordinator {
        &self.redeem
    }

    /// Starts the session: spawns the callback pump and initiates the
    /// platform connection under the process-wide throttle. Idempotent.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(bot = %self.name, "starting");
        *self.started_at.lock() = Some(Utc::now());
        self.spawn_pump();
        self.registry.throttle_connect().await;
        if let Err(e) = self.client.connect().await {
            warn!(bot = %self.name, error = %e, "connect failed");
        }
    }

    /// Stops the session: ends farming, disconnects and retires the pump.
    /// Safe to call when already stopped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(bot = %self.name, "stopping");
        *self.started_at.lock() = None;
        self.farmer.stop_farming().await;
        self.logged_on.store(false, Ordering::SeqCst);
        self.client.disconnect().await;
        if let Some(cancel) = self.pump_cancel.lock().take() {
            let _ = cancel.send(true);
        }
    }

    /// Stops and deregisters.
    pub async fn shutdown(&self) {
        self.stop().await;
        self.registry.remove(&self.name);
        info!(bot = %self.name, "shut down");
    }

    /// Called by the farmer when a round drains the queue.
    pub async fn on_farming_finished(&self, farmed_something: bool) {
        debug!(bot = %self.name, farmed_something, "farming finished");
        if self.config.shutdown_on_farming_finished {
            self.shutdown().await;
        }
    }

    /// Sends a chat line to the configured master, if one is set.
    pub async fn reply_to_master(&self, message: &str) {
        if !self.config.master_id.is_set() {
            return;
        }
        if let Err(e) = self
            .client
            .send_chat_message(self.config.master_id, message)
            .await
        {
            warn!(bot = %self.name, error = %e, "failed to send chat reply");
        }
    }

    /// One-line farming summary for `!status`.
    #[must_use]
    pub fn status_summary(&self) -> String {
        if !self.is_running() {
            return format!("Bot {} is inactive.", self.name);
        }
        let status = self.farmer.status();
        if status.paused {
            return format!("Bot {} is paused.", self.name);
        }
        if status.now_farming {
            format!(
                "Bot {} is farming {} ({} games with {} cards left, ~{:.1} h remaining).{}",
                self.name,
                status.currently_farming.join(", "),
                status.games_left,
                status.cards_left,
                status.estimated_hours(),
                self.uptime_suffix()
            )
        } else if self.logged_on.load(Ordering::SeqCst) {
            format!("Bot {} is logged on and idle.{}", self.name, self.uptime_suffix())
        } else {
            format!("Bot {} is connecting.{}", self.name, self.uptime_suffix())
        }
    }

    fn uptime_suffix(&self) -> String {
        match *self.started_at.lock() {
            Some(started) => {
                let minutes = (Utc::now() - started).num_minutes();
                format!(" Up {}h {:02}m.", minutes / 60, minutes % 60)
            }
            None => String::new(),
        }
    }

    fn spawn_pump(&self) {
        let Some(bot) = self.weak.upgrade() else { return };
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.changed() => break,
                    callback = bot.client.next_callback(CALLBACK_TICK) => {
                        if let Some(callback) = callback {
                            bot.dispatch(callback).await;
                        }
                    }
                }
            }
            debug!(bot = %bot.name, "callback pump stopped");
        });
        if let Some(previous) = self.pump_cancel.lock().replace(cancel_tx) {
            let _ = previous.send(true);
        }
    }

    async fn dispatch(&self, callback: Callback) {
        match callback {
            Callback::Connected { result } => self.handle_connected(result).await,
            Callback::Disconnected => self.handle_disconnected().await,
            Callback::LoggedOn { result, steam_id } => {
                self.handle_logged_on(result, steam_id).await;
            }
            Callback::LoggedOff { reason } => {
                info!(bot = %self.name, reason = %reason, "logged off");
            }
            Callback::FriendsList { friends } => self.handle_friends_list(friends).await,
            Callback::ChatMessage { from, message } => self.handle_chat_message(from, message),
            Callback::MachineAuth { chunk } => self.handle_machine_auth(chunk).await,
            Callback::Notification { kind } => self.handle_notification(kind),
            Callback::PurchaseResponse { result, items } => {
                self.handle_purchase_response(result, items).await;
            }
        }
    }

    async fn handle_connected(&self, result: ConnectResult) {
        if let ConnectResult::Failed(reason) = result {
            warn!(bot = %self.name, reason = %reason, "connection failed");
            return;
        }
        info!(bot = %self.name, "connected to platform");

        let Some(username) = self.resolve_credential(CredentialPrompt::Login).await else {
            error!(bot = %self.name, "no login available, stopping");
            self.stop().await;
            return;
        };
        let Some(password) = self.resolve_credential(CredentialPrompt::Password).await else {
            error!(bot = %self.name, "no password available, stopping");
            self.stop().await;
            return;
        };

        let auth_code = self.auth_code.lock().take();
        let two_factor_code = self.two_factor_code.lock().take();
        let sentry_hash = self.sentry_hash().await;
        let details = LogOnDetails {
            username,
            password,
            auth_code,
            two_factor_code,
            sentry_hash,
        };
        if let Err(e) = self.client.log_on(details).await {
            warn!(bot = %self.name, error = %e, "logon request failed");
        }
    }

    async fn handle_disconnected(&self) {
        self.logged_on.store(false, Ordering::SeqCst);
        self.farmer.on_disconnected();
        if !self.is_running() {
            info!(bot = %self.name, "disconnected");
            return;
        }
        warn!(bot = %self.name, "disconnected, reconnecting");
        self.registry.throttle_connect().await;
        if let Err(e) = self.client.connect().await {
            warn!(bot = %self.name, error = %e, "reconnect failed");
        }
    }

    async fn handle_logged_on(&self, result: LogonResult, steam_id: SteamId) {
        match result {
            LogonResult::Ok => {
                info!(bot = %self.name, steam_id = %steam_id, "logged on");
                *self.steam_id.lock() = steam_id;
                self.logged_on.store(true, Ordering::SeqCst);

                if let Some(nickname) = &self.config.steam_nickname {
                    if let Err(e) = self.client.set_persona_name(nickname).await {
                        warn!(bot = %self.name, error = %e, "failed to set persona name");
                    }
                }

                let pin = self.resolve_parental_pin().await;
                if let Err(e) = self.web.init_session(steam_id, &pin).await {
                    warn!(bot = %self.name, error = %e, "web session init failed");
                }

                if self.config.master_clan_id.is_set() {
                    if let Err(e) = self.client.join_clan_chat(self.config.master_clan_id).await {
                        warn!(bot = %self.name, error = %e, "failed to join master clan chat");
                    }
                }
                if self.config.statistics {
                    if let Err(e) = self.client.join_clan_chat(STATISTICS_GROUP_ID).await {
                        debug!(bot = %self.name, error = %e, "failed to join statistics group");
                    }
                }

                if let Some(bot) = self.weak.upgrade() {
                    tokio::spawn(async move { bot.farmer.start_farming().await });
                }
            }
            LogonResult::AccountLogonDenied => {
                info!(bot = %self.name, "email auth code required");
                if let Some(code) = self
                    .prompter
                    .prompt(&self.name, CredentialPrompt::SteamGuardCode)
                    .await
                {
                    *self.auth_code.lock() = Some(code);
                }
            }
            LogonResult::AccountLoginDeniedNeedTwoFactor => {
                info!(bot = %self.name, "two-factor code required");
                if let Some(code) = self
                    .prompter
                    .prompt(&self.name, CredentialPrompt::TwoFactorCode)
                    .await
                {
                    *self.two_factor_code.lock() = Some(code);
                }
            }
            LogonResult::InvalidPassword => {
                warn!(bot = %self.name, "invalid password, backing off");
                if let Some(bot) = self.weak.upgrade() {
                    tokio::spawn(async move {
                        bot.stop().await;
                        sleep(INVALID_PASSWORD_BACKOFF).await;
                        bot.start().await;
                    });
                }
            }
            LogonResult::ServiceUnavailable | LogonResult::Timeout | LogonResult::TryAnotherCm => {
                warn!(bot = %self.name, result = ?result, "transient logon failure, restarting session");
                if let Some(bot) = self.weak.upgrade() {
                    tokio::spawn(async move {
                        bot.stop().await;
                        bot.start().await;
                    });
                }
            }
            LogonResult::Other(reason) => {
                error!(bot = %self.name, reason = %reason, "unhandled logon failure, shutting down");
                self.shutdown().await;
            }
        }
    }

    async fn handle_friends_list(&self, friends: Vec<FriendEntry>) {
        for friend in friends {
            if friend.relationship != FriendRelationship::RequestRecipient {
                continue;
            }
            if friend.is_clan {
                debug!(bot = %self.name, id = %friend.id, "declining clan invite");
                if let Err(e) = self.client.decline_clan_invite(friend.id).await {
                    warn!(bot = %self.name, error = %e, "failed to decline clan invite");
                }
            } else if friend.id == self.config.master_id {
                info!(bot = %self.name, "accepting friend request from master");
                if let Err(e) = self.client.accept_friend(friend.id).await {
                    warn!(bot = %self.name, error = %e, "failed to accept friend");
                }
            } else {
                debug!(bot = %self.name, id = %friend.id, "removing unsolicited friend request");
                if let Err(e) = self.client.remove_friend(friend.id).await {
                    warn!(bot = %self.name, error = %e, "failed to remove friend");
                }
            }
        }
    }

    /// Commands run off-pump: a redeem reply has to await a future callback
    /// the pump itself must stay free to deliver.
    fn handle_chat_message(&self, from: SteamId, message: String) {
        if !self.config.master_id.is_set() || from != self.config.master_id {
            debug!(bot = %self.name, from = %from, "ignoring chat from non-master");
            return;
        }
        let Some(bot) = self.weak.upgrade() else { return };
        tokio::spawn(async move {
            if let Some(reply) = commands::dispatch(&bot, &message).await {
                bot.reply_to_master(&reply).await;
            }
        });
    }

    async fn handle_machine_auth(&self, chunk: MachineAuthChunk) {
        debug!(
            bot = %self.name,
            offset = chunk.offset,
            bytes = chunk.data.len(),
            "sentry update"
        );
        match self.write_sentry_chunk(&chunk).await {
            Ok((file_size, sha_hash)) => {
                let response = MachineAuthResponse {
                    job_id: chunk.job_id,
                    file_name: chunk.file_name,
                    bytes_written: chunk.data.len() as u32,
                    file_size,
                    offset: chunk.offset,
                    ok: true,
                    sha_hash,
                };
                if let Err(e) = self.client.respond_machine_auth(response).await {
                    warn!(bot = %self.name, error = %e, "machine auth response failed");
                }
            }
            Err(e) => warn!(bot = %self.name, error = %e, "sentry write failed"),
        }
    }

    fn handle_notification(&self, kind: NotificationKind) {
        match kind {
            NotificationKind::Items => self.farmer.on_new_items_notification(),
            NotificationKind::Trading => {
                debug!(bot = %self.name, "trade offers pending");
            }
        }
    }

    async fn handle_purchase_response(&self, result: PurchaseResult, items: Vec<String>) {
        let summary = redeem::summarize(&result, &items);
        info!(bot = %self.name, result = %result, "purchase response");

        if self.redeem.answers_directly() {
            self.reply_to_master(&summary).await;
        } else if !self.redeem.complete(summary) {
            warn!(bot = %self.name, "purchase response arrived with no pending redeem");
        }

        if result == PurchaseResult::Ok {
            if let Some(bot) = self.weak.upgrade() {
                tokio::spawn(async move { bot.farmer.on_new_game_added().await });
            }
        }
    }

    /// Resolves login or password: configuration first, then the cached
    /// prompt answer, then a fresh prompt.
    async fn resolve_credential(&self, kind: CredentialPrompt) -> Option<String> {
        let (configured, cache) = match kind {
            CredentialPrompt::Login => (self.config.steam_login.clone(), &self.cached_login),
            CredentialPrompt::Password => {
                (self.config.steam_password.clone(), &self.cached_password)
            }
            _ => (None, &self.cached_login),
        };
        if let Some(value) = configured {
            return Some(value);
        }
        if let Some(cached) = cache.lock().clone() {
            return Some(cached);
        }
        let value = self.prompter.prompt(&self.name, kind).await?;
        *cache.lock() = Some(value.clone());
        Some(value)
    }

    async fn resolve_parental_pin(&self) -> String {
        if let Some(pin) = self.config.steam_parental_pin.clone() {
            return pin;
        }
        if let Some(cached) = self.cached_pin.lock().clone() {
            return cached;
        }
        match self
            .prompter
            .prompt(&self.name, CredentialPrompt::ParentalPin)
            .await
        {
            Some(pin) => {
                *self.cached_pin.lock() = Some(pin.clone());
                pin
            }
            None => "0".to_string(),
        }
    }

    async fn sentry_hash(&self) -> Option<Vec<u8>> {
        match tokio::fs::read(&self.sentry_path).await {
            Ok(data) if !data.is_empty() => Some(sha1_hash(&data)),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(bot = %self.name, error = %e, "sentry read failed");
                None
            }
        }
    }

    /// Writes one chunk at its offset and re-hashes the whole blob.
    async fn write_sentry_chunk(&self, chunk: &MachineAuthChunk) -> Result<(u64, Vec<u8>)> {
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.sentry_path)
            .await?;
        file.seek(SeekFrom::Start(chunk.offset)).await?;
        file.write_all(&chunk.data).await?;
        file.flush().await?;
        drop(file);

        let data = tokio::fs::read(&self.sentry_path).await?;
        Ok((data.len() as u64, sha1_hash(&data)))
    }
}

fn sha1_hash(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).to_vec()
}
