//! Typed callback stream emitted by a platform connection.
//!
//! The session supervisor pumps these in order; per bot, handlers never
//! interleave.

use std::fmt;

use crate::domain::SteamId;

/// Outcome of a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectResult {
    Ok,
    Failed(String),
}

/// Outcome of a logon attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogonResult {
    Ok,
    /// An email Steam-Guard code is required.
    AccountLogonDenied,
    /// A TOTP second factor is required.
    AccountLoginDeniedNeedTwoFactor,
    InvalidPassword,
    ServiceUnavailable,
    Timeout,
    TryAnotherCm,
    Other(String),
}

/// A friends-list relationship as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRelationship {
    /// The other party requested friendship and awaits our answer.
    RequestRecipient,
    Friend,
    None,
}

/// One entry of a friends-list callback.
#[derive(Debug, Clone)]
pub struct FriendEntry {
    pub id: SteamId,
    /// Clan entries are group/clan invites rather than personal requests.
    pub is_clan: bool,
    pub relationship: FriendRelationship,
}

/// A sentry-file chunk pushed by the platform during machine authentication.
#[derive(Debug, Clone)]
pub struct MachineAuthChunk {
    pub job_id: u64,
    pub file_name: String,
    pub offset: u64,
    pub data: Vec<u8>,
}

/// Reply to a [`MachineAuthChunk`], acknowledging the written bytes and
/// carrying the SHA-1 over the full sentry blob.
#[derive(Debug, Clone)]
pub struct MachineAuthResponse {
    pub job_id: u64,
    pub file_name: String,
    pub bytes_written: u32,
    pub file_size: u64,
    pub offset: u64,
    pub ok: bool,
    pub sha_hash: Vec<u8>,
}

/// User-notification categories relevant to farming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// New inventory items landed; shortens the current play window.
    Items,
    /// Pending trade offers; handled by the trading surface, not here.
    Trading,
}

/// Outcome of a key redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseResult {
    Ok,
    AlreadyPossessed,
    InvalidKey,
    OnCooldown,
    Other(String),
}

impl fmt::Display for PurchaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::AlreadyPossessed => write!(f, "AlreadyPossessed"),
            Self::InvalidKey => write!(f, "InvalidKey"),
            Self::OnCooldown => write!(f, "OnCooldown"),
            Self::Other(detail) => write!(f, "{detail}"),
        }
    }
}

/// The tagged-union callback stream of a platform connection.
#[derive(Debug, Clone)]
pub enum Callback {
    Connected {
        result: ConnectResult,
    },
    Disconnected,
    LoggedOn {
        result: LogonResult,
        steam_id: SteamId,
    },
    LoggedOff {
        reason: String,
    },
    FriendsList {
        friends: Vec<FriendEntry>,
    },
    ChatMessage {
        from: SteamId,
        message: String,
    },
    MachineAuth {
        chunk: MachineAuthChunk,
    },
    Notification {
        kind: NotificationKind,
    },
    PurchaseResponse {
        result: PurchaseResult,
        items: Vec<String>,
    },
}
