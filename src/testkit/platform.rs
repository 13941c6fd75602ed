//! Scripted [`PlatformClient`] for tests.
//!
//! The client records every imperative operation and serves callbacks fed
//! through an external [`PlatformHandle`], with no real network I/O. Tests
//! drive the session by sending the exact callback sequence a transport
//! would produce.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use crate::domain::{AppId, CdKey, SteamId};
use crate::error::Result;
use crate::platform::{Callback, LogOnDetails, MachineAuthResponse, PlatformClient};

/// One recorded imperative operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformOp {
    Connect,
    Disconnect,
    LogOn {
        username: String,
        auth_code: Option<String>,
        two_factor_code: Option<String>,
        has_sentry_hash: bool,
    },
    PlayGame(AppId),
    PlayGames(Vec<AppId>),
    RedeemKey(String),
    Chat { to: SteamId, message: String },
    SetPersona(String),
    JoinClanChat(SteamId),
    AcceptFriend(SteamId),
    RemoveFriend(SteamId),
    DeclineClanInvite(SteamId),
    MachineAuthResponse { offset: u64, bytes_written: u32 },
}

/// Platform double recording operations and replaying scripted callbacks.
pub struct ScriptedPlatformClient {
    callbacks: tokio::sync::Mutex<mpsc::UnboundedReceiver<Callback>>,
    ops: Arc<parking_lot::Mutex<Vec<PlatformOp>>>,
    connect_count: Arc<AtomicU32>,
}

/// Control handle for a [`ScriptedPlatformClient`].
pub struct PlatformHandle {
    callback_tx: mpsc::UnboundedSender<Callback>,
    ops: Arc<parking_lot::Mutex<Vec<PlatformOp>>>,
    connect_count: Arc<AtomicU32>,
}

/// Creates a scripted client and its control handle.
#[must_use]
pub fn scripted_platform() -> (Arc<ScriptedPlatformClient>, PlatformHandle) {
    let (callback_tx, callback_rx) = mpsc::unbounded_channel();
    let ops = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let connect_count = Arc::new(AtomicU32::new(0));
    (
        Arc::new(ScriptedPlatformClient {
            callbacks: tokio::sync::Mutex::new(callback_rx),
            ops: Arc::clone(&ops),
            connect_count: Arc::clone(&connect_count),
        }),
        PlatformHandle {
            callback_tx,
            ops,
            connect_count,
        },
    )
}

impl PlatformHandle {
    /// Delivers one callback to the pump.
    pub fn send(&self, callback: Callback) {
        let _ = self.callback_tx.send(callback);
    }

    /// All operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> Vec<PlatformOp> {
        self.ops.lock().clone()
    }

    /// How many times `connect()` was called.
    #[must_use]
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// App ids handed to `play_game` / `play_games`, in order.
    #[must_use]
    pub fn played(&self) -> Vec<Vec<AppId>> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                PlatformOp::PlayGame(id) => Some(vec![*id]),
                PlatformOp::PlayGames(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    /// Keys handed to `redeem_key`, in order.
    #[must_use]
    pub fn redeemed_keys(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                PlatformOp::RedeemKey(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Chat lines sent, in order.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<(SteamId, String)> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                PlatformOp::Chat { to, message } => Some((*to, message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl ScriptedPlatformClient {
    fn record(&self, op: PlatformOp) {
        self.ops.lock().push(op);
    }
}

#[async_trait]
impl PlatformClient for ScriptedPlatformClient {
    async fn connect(&self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.record(PlatformOp::Connect);
        Ok(())
    }

    async fn disconnect(&self) {
        self.record(PlatformOp::Disconnect);
    }

    async fn log_on(&self, details: LogOnDetails) -> Result<()> {
        self.record(PlatformOp::LogOn {
            username: details.username,
            auth_code: details.auth_code,
            two_factor_code: details.two_factor_code,
            has_sentry_hash: details.sentry_hash.is_some(),
        });
        Ok(())
    }

    async fn play_game(&self, app_id: AppId) -> Result<()> {
        self.record(PlatformOp::PlayGame(app_id));
        Ok(())
    }

    async fn play_games(&self, app_ids: &[AppId]) -> Result<()> {
        self.record(PlatformOp::PlayGames(app_ids.to_vec()));
        Ok(())
    }

    async fn redeem_key(&self, key: &CdKey) -> Result<()> {
        self.record(PlatformOp::RedeemKey(key.as_str().to_string()));
        Ok(())
    }

    async fn send_chat_message(&self, to: SteamId, message: &str) -> Result<()> {
        self.record(PlatformOp::Chat {
            to,
            message: message.to_string(),
        });
        Ok(())
    }

    async fn set_persona_name(&self, name: &str) -> Result<()> {
        self.record(PlatformOp::SetPersona(name.to_string()));
        Ok(())
    }

    async fn join_clan_chat(&self, clan_id: SteamId) -> Result<()> {
        self.record(PlatformOp::JoinClanChat(clan_id));
        Ok(())
    }

    async fn accept_friend(&self, id: SteamId) -> Result<()> {
        self.record(PlatformOp::AcceptFriend(id));
        Ok(())
    }

    async fn remove_friend(&self, id: SteamId) -> Result<()> {
        self.record(PlatformOp::RemoveFriend(id));
        Ok(())
    }

    async fn decline_clan_invite(&self, id: SteamId) -> Result<()> {
        self.record(PlatformOp::DeclineClanInvite(id));
        Ok(())
    }

    async fn respond_machine_auth(&self, response: MachineAuthResponse) -> Result<()> {
        self.record(PlatformOp::MachineAuthResponse {
            offset: response.offset,
            bytes_written: response.bytes_written,
        });
        Ok(())
    }

    async fn next_callback(&self, wait: Duration) -> Option<Callback> {
        let mut callbacks = self.callbacks.lock().await;
        match timeout(wait, callbacks.recv()).await {
            Ok(Some(callback)) => Some(callback),
            Ok(None) => {
                // Handle dropped: behave like an idle tick.
                drop(callbacks);
                sleep(wait).await;
                None
            }
            Err(_) => None,
        }
    }
}
