//! Platform connection trait definitions.
//!
//! These traits define the interface any concrete wire transport must
//! provide. The farming core only ever sees this surface.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AppId, CdKey, SteamId};
use crate::error::Result;

use super::callback::{Callback, MachineAuthResponse};

/// Credentials handed to a logon attempt.
#[derive(Debug, Clone, Default)]
pub struct LogOnDetails {
    pub username: String,
    pub password: String,
    /// Email Steam-Guard code captured after `AccountLogonDenied`.
    pub auth_code: Option<String>,
    /// TOTP code captured after `AccountLoginDeniedNeedTwoFactor`.
    pub two_factor_code: Option<String>,
    /// SHA-1 over the local sentry blob, when one exists.
    pub sentry_hash: Option<Vec<u8>>,
}

/// A persistent client session against the game platform.
///
/// Imperative operations may be issued from any task; the callback stream
/// is consumed by exactly one pump via [`next_callback`](Self::next_callback).
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self);

    async fn log_on(&self, details: LogOnDetails) -> Result<()>;

    /// Starts playing a single title.
    async fn play_game(&self, app_id: AppId) -> Result<()>;

    /// Starts playing several titles multiplexed.
    async fn play_games(&self, app_ids: &[AppId]) -> Result<()>;

    async fn redeem_key(&self, key: &CdKey) -> Result<()>;

    async fn send_chat_message(&self, to: SteamId, message: &str) -> Result<()>;

    async fn set_persona_name(&self, name: &str) -> Result<()>;

    async fn join_clan_chat(&self, clan_id: SteamId) -> Result<()>;

    async fn accept_friend(&self, id: SteamId) -> Result<()>;

    async fn remove_friend(&self, id: SteamId) -> Result<()>;

    async fn decline_clan_invite(&self, id: SteamId) -> Result<()>;

    async fn respond_machine_auth(&self, response: MachineAuthResponse) -> Result<()>;

    /// Waits up to `wait` for the next callback. `None` means the tick
    /// elapsed without one; the pump simply polls again.
    async fn next_callback(&self, wait: Duration) -> Option<Callback>;
}
