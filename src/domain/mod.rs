//! Platform-agnostic domain types: identifiers, farmable games, product keys.

pub mod game;
pub mod id;
pub mod key;

pub use game::{FarmQueue, FarmingOrder, Game};
pub use id::{AppId, SteamId};
pub use key::{is_valid_cd_key, CdKey};
