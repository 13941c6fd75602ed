//! Domain identifier types.
//!
//! Strongly-typed identifiers for platform entities. Using newtypes instead
//! of raw integers prevents accidental mixing of app ids with account ids
//! and documents what each function expects.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a single title on the platform.
///
/// # Examples
///
/// ```
/// use droplord::domain::AppId;
///
/// let app = AppId::new(440);
/// assert_eq!(app.value(), 440);
/// assert_eq!(format!("{}", app), "440");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(u32);

impl AppId {
    /// Creates a new app identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AppId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// 64-bit account identifier, also used for clans and groups.
///
/// The zero value means "not configured" in bot configuration.
///
/// # Examples
///
/// ```
/// use droplord::domain::SteamId;
///
/// let master = SteamId::new(76561198000000000);
/// assert!(master.is_set());
/// assert!(!SteamId::NONE.is_set());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SteamId(u64);

impl SteamId {
    /// The unset identifier.
    pub const NONE: Self = Self(0);

    /// Creates a new account identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this identifier holds a real account.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SteamId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
