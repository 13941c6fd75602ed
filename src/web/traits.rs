//! Web endpoint trait definition.

use async_trait::async_trait;

use crate::domain::{AppId, SteamId};
use crate::error::Result;

/// HTTP-level access to the community badge pages of one account.
///
/// Fetches return `Ok(None)` when the endpoint answered but produced no
/// usable page (e.g. a redirect to a login wall); callers treat that the
/// same as a transient failure.
#[async_trait]
pub trait WebClient: Send + Sync {
    /// Binds the session to a logged-on account, unlocking parental
    /// restrictions where needed. Must be called after each logon.
    async fn init_session(&self, steam_id: SteamId, parental_pin: &str) -> Result<()>;

    /// Fetches one page of the account's badges listing.
    async fn badge_page(&self, page: u32) -> Result<Option<String>>;

    /// Fetches the per-game card-drops page for one title.
    async fn game_cards_page(&self, app_id: AppId) -> Result<Option<String>>;
}
